//! Trainable classifier capability and the reference models shipped with the crate.
//!
//! The orchestrator and the backtest engine only ever see `dyn TrainableModel`;
//! every concrete model owns its own scaler and fitted state.

pub mod logistic;
pub mod naive_bayes;
pub mod scaler;
pub mod tree;

use crate::domain::error::MltraderError;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use logistic::LogisticModel;
pub use naive_bayes::GaussianNbModel;
pub use scaler::StandardScaler;
pub use tree::DecisionTreeModel;

/// Serializable fitted state of a model, as written by a model store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSnapshot {
    pub model: String,
    pub scaler: Option<StandardScaler>,
    pub state: serde_json::Value,
}

/// A binary classifier that can be fitted, queried and persisted.
pub trait TrainableModel: Send + fmt::Debug {
    /// Stable identifier; keys training and backtest results.
    fn name(&self) -> &str;

    fn is_fitted(&self) -> bool;

    fn fit(&mut self, x: &Array2<f64>, y: &[u8]) -> Result<(), MltraderError>;

    /// Fails with `InvalidState` until `fit` has succeeded.
    fn predict(&self, x: &Array2<f64>) -> Result<Vec<u8>, MltraderError>;

    /// Class probabilities, shape (rows, 2). Models without a native
    /// probability output expand their hard predictions to `[1 - p, p]`.
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>, MltraderError> {
        let predictions = self.predict(x)?;
        let mut proba = Array2::zeros((predictions.len(), 2));
        for (i, p) in predictions.iter().enumerate() {
            let p = f64::from(*p);
            proba[[i, 0]] = 1.0 - p;
            proba[[i, 1]] = p;
        }
        Ok(proba)
    }

    fn snapshot(&self) -> Result<ModelSnapshot, MltraderError>;

    /// Replaces the model's state with a snapshot taken from a model of the same name.
    fn restore(&mut self, snapshot: ModelSnapshot) -> Result<(), MltraderError>;
}

/// The default roster: one linear, one tree and one probabilistic model.
pub fn default_roster(seed: u64) -> Vec<Box<dyn TrainableModel>> {
    vec![
        Box::new(LogisticModel::new(seed)),
        Box::new(DecisionTreeModel::new(seed)),
        Box::new(GaussianNbModel::new()),
    ]
}

/// Shape and label checks shared by every `fit` implementation.
pub(crate) fn check_training_input(
    model: &str,
    x: &Array2<f64>,
    y: &[u8],
) -> Result<(), MltraderError> {
    let fail = |reason: String| MltraderError::ModelTraining {
        model: model.to_string(),
        reason,
    };
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(fail("empty training matrix".to_string()));
    }
    if x.nrows() != y.len() {
        return Err(fail(format!(
            "{} feature rows but {} labels",
            x.nrows(),
            y.len()
        )));
    }
    if let Some(bad) = y.iter().find(|&&label| label > 1) {
        return Err(fail(format!("label {} is not binary", bad)));
    }
    Ok(())
}

/// Feature-count check shared by every `predict` implementation.
pub(crate) fn check_width(model: &str, x: &Array2<f64>, expected: usize) -> Result<(), MltraderError> {
    if x.ncols() != expected {
        return Err(MltraderError::DataAlignment {
            reason: format!(
                "{} was fitted on {} features but got {}",
                model,
                expected,
                x.ncols()
            ),
        });
    }
    Ok(())
}

pub(crate) fn snapshot_state<T: Serialize>(
    model: &str,
    scaler: Option<&StandardScaler>,
    state: &T,
) -> Result<ModelSnapshot, MltraderError> {
    let state = serde_json::to_value(state).map_err(|e| MltraderError::ModelStore {
        reason: format!("cannot serialize {}: {}", model, e),
    })?;
    Ok(ModelSnapshot {
        model: model.to_string(),
        scaler: scaler.cloned(),
        state,
    })
}

pub(crate) fn restore_state<T: serde::de::DeserializeOwned>(
    model: &str,
    snapshot: ModelSnapshot,
) -> Result<(Option<StandardScaler>, T), MltraderError> {
    if snapshot.model != model {
        return Err(MltraderError::ModelStore {
            reason: format!(
                "snapshot for {} cannot be restored into {}",
                snapshot.model, model
            ),
        });
    }
    let state = serde_json::from_value(snapshot.state).map_err(|e| MltraderError::ModelStore {
        reason: format!("corrupt snapshot for {}: {}", model, e),
    })?;
    Ok((snapshot.scaler, state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[derive(Debug)]
    struct Constant(u8);

    impl TrainableModel for Constant {
        fn name(&self) -> &str {
            "constant"
        }

        fn is_fitted(&self) -> bool {
            true
        }

        fn fit(&mut self, _x: &Array2<f64>, _y: &[u8]) -> Result<(), MltraderError> {
            Ok(())
        }

        fn predict(&self, x: &Array2<f64>) -> Result<Vec<u8>, MltraderError> {
            Ok(vec![self.0; x.nrows()])
        }

        fn snapshot(&self) -> Result<ModelSnapshot, MltraderError> {
            snapshot_state("constant", None, &self.0)
        }

        fn restore(&mut self, snapshot: ModelSnapshot) -> Result<(), MltraderError> {
            let (_, value) = restore_state("constant", snapshot)?;
            self.0 = value;
            Ok(())
        }
    }

    #[test]
    fn default_predict_proba_is_one_hot() {
        let model = Constant(1);
        let proba = model.predict_proba(&array![[0.0], [1.0]]).unwrap();
        assert_eq!(proba, array![[0.0, 1.0], [0.0, 1.0]]);

        let model = Constant(0);
        let proba = model.predict_proba(&array![[0.0]]).unwrap();
        assert_eq!(proba, array![[1.0, 0.0]]);
    }

    #[test]
    fn default_roster_has_distinct_names() {
        let roster = default_roster(7);
        let names: Vec<&str> = roster.iter().map(|m| m.name()).collect();
        assert_eq!(names, vec!["logistic", "decision_tree", "gaussian_nb"]);
        assert!(roster.iter().all(|m| !m.is_fitted()));
    }

    #[test]
    fn training_input_rejects_mismatched_labels() {
        let x = array![[1.0], [2.0]];
        let err = check_training_input("m", &x, &[1]).unwrap_err();
        assert!(matches!(err, MltraderError::ModelTraining { .. }));
    }

    #[test]
    fn training_input_rejects_non_binary_labels() {
        let x = array![[1.0], [2.0]];
        assert!(check_training_input("m", &x, &[0, 3]).is_err());
    }

    #[test]
    fn restore_rejects_foreign_snapshot() {
        let snapshot = Constant(1).snapshot().unwrap();
        let err = restore_state::<u8>("other", snapshot).unwrap_err();
        assert!(matches!(err, MltraderError::ModelStore { .. }));
    }

    #[test]
    fn snapshot_round_trip_restores_state() {
        let snapshot = Constant(1).snapshot().unwrap();
        let mut restored = Constant(0);
        restored.restore(snapshot).unwrap();
        assert_eq!(restored.predict(&array![[0.0]]).unwrap(), vec![1]);
    }
}
