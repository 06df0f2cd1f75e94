//! Logistic regression trained by mini-batch gradient descent.
//!
//! Features are standardized with a scaler fitted on the training matrix.
//! Mini-batch order comes from a seeded RNG, so two fits with the same seed
//! and data produce identical weights.

use super::{
    check_training_input, check_width, restore_state, snapshot_state, ModelSnapshot,
    StandardScaler, TrainableModel,
};
use crate::domain::error::MltraderError;
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const NAME: &str = "logistic";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticConfig {
    pub learning_rate: f64,
    pub epochs: usize,
    pub batch_size: usize,
    /// L2 penalty on the weights (not the bias).
    pub l2: f64,
    pub seed: u64,
}

impl Default for LogisticConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.05,
            epochs: 100,
            batch_size: 64,
            l2: 1e-4,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Weights {
    coefficients: Vec<f64>,
    intercept: f64,
}

#[derive(Debug, Clone)]
pub struct LogisticModel {
    config: LogisticConfig,
    scaler: Option<StandardScaler>,
    weights: Option<Weights>,
}

impl LogisticModel {
    pub fn new(seed: u64) -> Self {
        Self::with_config(LogisticConfig {
            seed,
            ..Default::default()
        })
    }

    pub fn with_config(config: LogisticConfig) -> Self {
        Self {
            config,
            scaler: None,
            weights: None,
        }
    }

    pub fn coefficients(&self) -> Option<&[f64]> {
        self.weights.as_ref().map(|w| w.coefficients.as_slice())
    }

    fn sigmoid(z: f64) -> f64 {
        if z >= 0.0 {
            1.0 / (1.0 + (-z).exp())
        } else {
            let exp_z = z.exp();
            exp_z / (1.0 + exp_z)
        }
    }

    /// Probability of the up class for each row.
    fn positive_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>, MltraderError> {
        let (scaler, weights) = match (&self.scaler, &self.weights) {
            (Some(s), Some(w)) => (s, w),
            _ => {
                return Err(MltraderError::InvalidState {
                    model: NAME.to_string(),
                })
            }
        };
        check_width(NAME, x, weights.coefficients.len())?;
        let z = scaler.transform(x);
        let w = Array1::from(weights.coefficients.clone());
        Ok((z.dot(&w) + weights.intercept).mapv(Self::sigmoid))
    }
}

impl TrainableModel for LogisticModel {
    fn name(&self) -> &str {
        NAME
    }

    fn is_fitted(&self) -> bool {
        self.weights.is_some()
    }

    fn fit(&mut self, x: &Array2<f64>, y: &[u8]) -> Result<(), MltraderError> {
        check_training_input(NAME, x, y)?;
        if self.config.batch_size == 0 {
            return Err(MltraderError::ModelTraining {
                model: NAME.to_string(),
                reason: "batch_size must be positive".to_string(),
            });
        }

        let scaler = StandardScaler::fit(x);
        let z = scaler.transform(x);
        let targets = Array1::from_iter(y.iter().map(|&label| f64::from(label)));

        let mut weights = Array1::<f64>::zeros(z.ncols());
        let mut bias = 0.0;
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut order: Vec<usize> = (0..z.nrows()).collect();

        for epoch in 0..self.config.epochs {
            order.shuffle(&mut rng);
            for batch in order.chunks(self.config.batch_size) {
                let xb = z.select(Axis(0), batch);
                let yb = targets.select(Axis(0), batch);
                let m = batch.len() as f64;

                let predictions = (xb.dot(&weights) + bias).mapv(Self::sigmoid);
                let errors = &predictions - &yb;
                let dw = xb.t().dot(&errors) / m + &weights * self.config.l2;
                let db = errors.sum() / m;

                weights = &weights - &(dw * self.config.learning_rate);
                bias -= self.config.learning_rate * db;
            }
            if epoch + 1 == self.config.epochs {
                debug!(model = NAME, epochs = self.config.epochs, "gradient descent finished");
            }
        }

        if !bias.is_finite() || weights.iter().any(|w| !w.is_finite()) {
            return Err(MltraderError::ModelTraining {
                model: NAME.to_string(),
                reason: "weights diverged to a non-finite value".to_string(),
            });
        }

        self.scaler = Some(scaler);
        self.weights = Some(Weights {
            coefficients: weights.to_vec(),
            intercept: bias,
        });
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Vec<u8>, MltraderError> {
        let proba = self.positive_proba(x)?;
        Ok(proba.iter().map(|&p| u8::from(p >= 0.5)).collect())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>, MltraderError> {
        let proba = self.positive_proba(x)?;
        let mut out = Array2::zeros((proba.len(), 2));
        for (i, p) in proba.iter().enumerate() {
            out[[i, 0]] = 1.0 - p;
            out[[i, 1]] = *p;
        }
        Ok(out)
    }

    fn snapshot(&self) -> Result<ModelSnapshot, MltraderError> {
        let weights = self.weights.as_ref().ok_or_else(|| MltraderError::InvalidState {
            model: NAME.to_string(),
        })?;
        snapshot_state(NAME, self.scaler.as_ref(), weights)
    }

    fn restore(&mut self, snapshot: ModelSnapshot) -> Result<(), MltraderError> {
        let (scaler, weights): (_, Weights) = restore_state(NAME, snapshot)?;
        let scaler = scaler.ok_or_else(|| MltraderError::ModelStore {
            reason: format!("{} snapshot has no scaler", NAME),
        })?;
        if scaler.n_features() != weights.coefficients.len() {
            return Err(MltraderError::ModelStore {
                reason: format!("{} snapshot scaler and weights disagree in width", NAME),
            });
        }
        self.scaler = Some(scaler);
        self.weights = Some(weights);
        Ok(())
    }
}
