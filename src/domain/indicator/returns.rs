//! Period-over-period returns.
//!
//! pct_change[i] = (x[i] - x[i-1]) / x[i-1]
//! log_return[i] = ln(x[i] / x[i-1])
//! Position 0 is undefined for both.

use super::window::shift;
use super::{zip_with, Column};

pub fn pct_change(values: &[Option<f64>]) -> Column {
    let prev = shift(values, 1);
    zip_with(values, &prev, |cur, prev| (cur - prev) / prev)
}

pub fn log_returns(values: &[Option<f64>]) -> Column {
    let prev = shift(values, 1);
    zip_with(values, &prev, |cur, prev| (cur / prev).ln())
}
