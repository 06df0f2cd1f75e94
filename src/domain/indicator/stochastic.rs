//! Stochastic oscillator.
//!
//! %K = 100 × (close - lowest low(k)) / (highest high(k) - lowest low(k))
//! %D = trailing mean of %K over d periods
//!
//! Warmup: %K undefined for the first (k-1) bars, %D for the first (k+d-2).

use super::sma::calculate_sma;
use super::window::{rolling_max, rolling_min};
use super::{column_of, defined, Column};
use crate::domain::ohlcv::Bar;

#[derive(Debug, Clone, PartialEq)]
pub struct StochasticLines {
    pub k: Column,
    pub d: Column,
}

pub fn calculate_stochastic(bars: &[Bar], k_period: usize, d_period: usize) -> StochasticLines {
    let lows = column_of(bars.iter().map(|b| b.low));
    let highs = column_of(bars.iter().map(|b| b.high));

    let lowest = rolling_min(&lows, k_period);
    let highest = rolling_max(&highs, k_period);

    let k: Column = bars
        .iter()
        .zip(lowest.iter().zip(&highest))
        .map(|(bar, range)| match range {
            (Some(lo), Some(hi)) => defined(100.0 * (bar.close - lo) / (hi - lo)),
            _ => None,
        })
        .collect();
    let d = calculate_sma(&k, d_period);

    StochasticLines { k, d }
}
