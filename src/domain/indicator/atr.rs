//! ATR (Average True Range).
//!
//! TR[0] = high - low (no previous close)
//! TR[i] = max(high - low, |high - close[i-1]|, |low - close[i-1]|)
//! ATR(n) = trailing mean of TR over n bars (not Wilder's smoothing).
//! Warmup: first (n-1) bars are undefined.

use super::sma::calculate_sma;
use super::{column_of, Column};
use crate::domain::ohlcv::Bar;

pub fn true_ranges(bars: &[Bar]) -> Vec<f64> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            if i == 0 {
                bar.high - bar.low
            } else {
                bar.true_range(bars[i - 1].close)
            }
        })
        .collect()
}

pub fn calculate_atr(bars: &[Bar], period: usize) -> Column {
    calculate_sma(&column_of(true_ranges(bars)), period)
}
