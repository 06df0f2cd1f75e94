//! Simple Moving Average.
//!
//! SMA(n)[i] = sum(x[i-n+1..=i]) / n
//! Warmup: first (n-1) values are undefined.

use super::window::rolling;
use super::Column;

pub fn calculate_sma(values: &[Option<f64>], period: usize) -> Column {
    rolling(values, period, |w| w.iter().sum::<f64>() / w.len() as f64)
}
