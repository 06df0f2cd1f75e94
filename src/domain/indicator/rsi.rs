//! RSI (Relative Strength Index) indicator.
//!
//! Uses a trailing simple mean of gains and losses (not Wilder's recursive
//! smoothing):
//! - gain[i] = max(close[i] - close[i-1], 0), loss[i] = max(close[i-1] - close[i], 0)
//! - the first bar has no change and contributes a zero gain and zero loss
//!
//! Formula: RSI = 100 - (100 / (1 + mean(gain, n) / mean(loss, n)))
//! If the mean loss is 0 and the mean gain is positive, RSI = 100.
//! If both means are 0 the value is undefined.
//!
//! Warmup: first (n-1) bars are undefined.

use super::sma::calculate_sma;
use super::window::diff;
use super::{defined, Column};

pub fn calculate_rsi(closes: &[Option<f64>], period: usize) -> Column {
    let delta = diff(closes);

    let gains: Column = delta
        .iter()
        .map(|d| Some(d.filter(|x| *x > 0.0).unwrap_or(0.0)))
        .collect();
    let losses: Column = delta
        .iter()
        .map(|d| Some(d.filter(|x| *x < 0.0).map(|x| -x).unwrap_or(0.0)))
        .collect();

    let avg_gain = calculate_sma(&gains, period);
    let avg_loss = calculate_sma(&losses, period);

    avg_gain
        .iter()
        .zip(&avg_loss)
        .map(|(g, l)| match (g, l) {
            (Some(g), Some(l)) => {
                let rs = g / l;
                defined(100.0 - (100.0 / (1.0 + rs)))
            }
            _ => None,
        })
        .collect()
}
