//! Bollinger Bands indicator.
//!
//! Bollinger Bands consist of:
//! - Middle: Simple Moving Average (SMA) over n periods
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//! - Width: Upper - Lower
//! - Position: (Close - Lower) / Width
//!
//! StdDev is the sample standard deviation (divides by N-1).
//! Position is infinite when the width is 0 and the close is off the band,
//! and undefined when both are 0.
//!
//! Default parameters: period=20, multiplier=2.0
//! Warmup: first (period-1) bars are undefined.

use super::sma::calculate_sma;
use super::stddev::calculate_stddev;
use super::{zip_with, Column};

#[derive(Debug, Clone, PartialEq)]
pub struct BollingerBands {
    pub upper: Column,
    pub middle: Column,
    pub lower: Column,
    pub width: Column,
    pub position: Column,
}

pub fn calculate_bollinger(closes: &[Option<f64>], period: usize, mult: f64) -> BollingerBands {
    let middle = calculate_sma(closes, period);
    let stddev = calculate_stddev(closes, period);

    let upper = zip_with(&middle, &stddev, |m, s| m + s * mult);
    let lower = zip_with(&middle, &stddev, |m, s| m - s * mult);
    let width = zip_with(&upper, &lower, |u, l| u - l);
    let offset = zip_with(closes, &lower, |c, l| c - l);
    let position = zip_with(&offset, &width, |o, w| o / w);

    BollingerBands {
        upper,
        middle,
        lower,
        width,
        position,
    }
}
