//! Gaussian naive Bayes with native class probabilities.

use super::{
    check_training_input, check_width, restore_state, snapshot_state, ModelSnapshot,
    TrainableModel,
};
use crate::domain::error::MltraderError;
use ndarray::{Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

pub const NAME: &str = "gaussian_nb";

/// Fraction of the largest feature variance added to every variance.
const VAR_SMOOTHING: f64 = 1e-9;
const MIN_VARIANCE: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ClassStats {
    count: usize,
    prior: f64,
    mean: Vec<f64>,
    var: Vec<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct GaussianNbModel {
    /// Index 0 is the down class, index 1 the up class.
    classes: Option<[ClassStats; 2]>,
}

impl GaussianNbModel {
    pub fn new() -> Self {
        Self::default()
    }

    fn log_joint(stats: &ClassStats, row: ArrayView1<f64>) -> f64 {
        if stats.count == 0 {
            return f64::NEG_INFINITY;
        }
        let mut ll = stats.prior.ln();
        for (j, x) in row.iter().enumerate() {
            let var = stats.var[j];
            ll -= 0.5 * (2.0 * std::f64::consts::PI * var).ln();
            ll -= (x - stats.mean[j]).powi(2) / (2.0 * var);
        }
        ll
    }

    fn classes(&self, x: &Array2<f64>) -> Result<&[ClassStats; 2], MltraderError> {
        let classes = self.classes.as_ref().ok_or_else(|| MltraderError::InvalidState {
            model: NAME.to_string(),
        })?;
        check_width(NAME, x, classes[0].mean.len())?;
        Ok(classes)
    }
}

fn class_stats(x: &Array2<f64>, y: &[u8], class: u8, epsilon: f64) -> ClassStats {
    let rows: Vec<usize> = (0..y.len()).filter(|&i| y[i] == class).collect();
    let n = rows.len();
    let width = x.ncols();
    if n == 0 {
        return ClassStats {
            count: 0,
            prior: 0.0,
            mean: vec![0.0; width],
            var: vec![1.0; width],
        };
    }
    let subset = x.select(Axis(0), &rows);
    let mut mean = Vec::with_capacity(width);
    let mut var = Vec::with_capacity(width);
    for column in subset.axis_iter(Axis(1)) {
        let m = column.sum() / n as f64;
        let v = column.iter().map(|c| (c - m).powi(2)).sum::<f64>() / n as f64;
        mean.push(m);
        var.push(v + epsilon);
    }
    ClassStats {
        count: n,
        prior: n as f64 / y.len() as f64,
        mean,
        var,
    }
}

impl TrainableModel for GaussianNbModel {
    fn name(&self) -> &str {
        NAME
    }

    fn is_fitted(&self) -> bool {
        self.classes.is_some()
    }

    fn fit(&mut self, x: &Array2<f64>, y: &[u8]) -> Result<(), MltraderError> {
        check_training_input(NAME, x, y)?;

        let n = x.nrows() as f64;
        let max_var = x
            .axis_iter(Axis(1))
            .map(|column| {
                let m = column.sum() / n;
                column.iter().map(|c| (c - m).powi(2)).sum::<f64>() / n
            })
            .fold(0.0_f64, f64::max);
        // keeps every variance strictly positive, even for constant features
        let epsilon = (VAR_SMOOTHING * max_var).max(MIN_VARIANCE);

        self.classes = Some([
            class_stats(x, y, 0, epsilon),
            class_stats(x, y, 1, epsilon),
        ]);
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Vec<u8>, MltraderError> {
        let proba = self.predict_proba(x)?;
        Ok(proba
            .axis_iter(Axis(0))
            .map(|row| u8::from(row[1] > row[0]))
            .collect())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>, MltraderError> {
        let classes = self.classes(x)?;
        let mut out = Array2::zeros((x.nrows(), 2));
        for (i, row) in x.axis_iter(Axis(0)).enumerate() {
            let down = Self::log_joint(&classes[0], row);
            let up = Self::log_joint(&classes[1], row);
            let top = down.max(up);
            let (ed, eu) = ((down - top).exp(), (up - top).exp());
            out[[i, 0]] = ed / (ed + eu);
            out[[i, 1]] = eu / (ed + eu);
        }
        Ok(out)
    }

    fn snapshot(&self) -> Result<ModelSnapshot, MltraderError> {
        let classes = self.classes.as_ref().ok_or_else(|| MltraderError::InvalidState {
            model: NAME.to_string(),
        })?;
        snapshot_state(NAME, None, classes)
    }

    fn restore(&mut self, snapshot: ModelSnapshot) -> Result<(), MltraderError> {
        let (_, classes): (_, [ClassStats; 2]) = restore_state(NAME, snapshot)?;
        self.classes = Some(classes);
        Ok(())
    }
}
