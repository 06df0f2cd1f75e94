//! Column standardization fitted on the training split.

use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    /// Population mean and standard deviation per column. Zero-variance
    /// columns keep a unit scale so they are only centred.
    pub fn fit(x: &Array2<f64>) -> Self {
        let n = x.nrows().max(1) as f64;
        let mut mean = Vec::with_capacity(x.ncols());
        let mut scale = Vec::with_capacity(x.ncols());
        for column in x.axis_iter(Axis(1)) {
            let m = column.sum() / n;
            let var = column.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n;
            let sd = var.sqrt();
            mean.push(m);
            scale.push(if sd > 0.0 && sd.is_finite() { sd } else { 1.0 });
        }
        StandardScaler { mean, scale }
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn transform(&self, x: &Array2<f64>) -> Array2<f64> {
        let mut out = x.clone();
        for (j, mut column) in out.axis_iter_mut(Axis(1)).enumerate() {
            let (m, s) = (self.mean[j], self.scale[j]);
            column.mapv_inplace(|v| (v - m) / s);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn transformed_columns_are_standardized() {
        let x = array![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0], [4.0, 40.0]];
        let scaler = StandardScaler::fit(&x);
        let z = scaler.transform(&x);
        for column in z.axis_iter(Axis(1)) {
            let mean = column.sum() / 4.0;
            let var = column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / 4.0;
            assert_relative_eq!(mean, 0.0, epsilon = 1e-12);
            assert_relative_eq!(var, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn constant_column_is_only_centred() {
        let x = array![[5.0], [5.0], [5.0]];
        let scaler = StandardScaler::fit(&x);
        assert_relative_eq!(scaler.scale[0], 1.0);
        let z = scaler.transform(&array![[7.0]]);
        assert_relative_eq!(z[[0, 0]], 2.0);
    }
}
