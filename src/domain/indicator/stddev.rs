//! Rolling sample standard deviation.
//!
//! STDDEV(n)[i] = sqrt(sum((x[j] - SMA(n)[i])^2 for j in window) / (n - 1))
//! Sample (n-1) normalisation; undefined for n < 2.
//! Warmup: first (n-1) values are undefined.

use super::window::rolling;
use super::Column;

pub fn calculate_stddev(values: &[Option<f64>], period: usize) -> Column {
    if period < 2 {
        return vec![None; values.len()];
    }

    rolling(values, period, |w| {
        let n = w.len() as f64;
        let mean = w.iter().sum::<f64>() / n;
        let variance = w
            .iter()
            .map(|x| {
                let diff = x - mean;
                diff * diff
            })
            .sum::<f64>()
            / (n - 1.0);
        variance.sqrt()
    })
}
