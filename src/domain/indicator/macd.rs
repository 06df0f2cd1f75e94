//! MACD (Moving Average Convergence Divergence) indicator.
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of MACD Line
//! Histogram = MACD Line - Signal Line
//!
//! Default parameters: fast=12, slow=26, signal=9
//! All EMAs are seeded from their first value, so there is no warmup.

use super::ema::calculate_ema;
use super::{zip_with, Column};

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

#[derive(Debug, Clone, PartialEq)]
pub struct MacdLines {
    pub line: Column,
    pub signal: Column,
    pub histogram: Column,
}

pub fn calculate_macd(
    closes: &[Option<f64>],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> MacdLines {
    let ema_fast = calculate_ema(closes, fast);
    let ema_slow = calculate_ema(closes, slow);

    let line = zip_with(&ema_fast, &ema_slow, |f, s| f - s);
    let signal = calculate_ema(&line, signal_period);
    let histogram = zip_with(&line, &signal, |l, s| l - s);

    MacdLines {
        line,
        signal,
        histogram,
    }
}
