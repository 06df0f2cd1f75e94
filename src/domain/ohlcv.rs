//! OHLCV bar representation.

use crate::domain::error::MltraderError;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }
}

/// Checks that timestamps are strictly increasing (no duplicates, no reordering).
pub fn validate_ordering(bars: &[Bar]) -> Result<(), MltraderError> {
    for (i, pair) in bars.windows(2).enumerate() {
        if pair[1].timestamp <= pair[0].timestamp {
            return Err(MltraderError::InvalidData {
                reason: format!(
                    "bar {} at {} does not follow {}",
                    i + 1,
                    pair[1].timestamp,
                    pair[0].timestamp
                ),
            });
        }
    }
    Ok(())
}

/// Splits bars into a leading training slice and a trailing test slice.
///
/// The split point is `floor(len * train_fraction)`; order is preserved.
pub fn split_chronological(
    bars: &[Bar],
    train_fraction: f64,
) -> Result<(&[Bar], &[Bar]), MltraderError> {
    if !(train_fraction > 0.0 && train_fraction < 1.0) {
        return Err(MltraderError::invalid(
            "data",
            "train_fraction",
            "train_fraction must be between 0 and 1 (exclusive)",
        ));
    }
    let split = (bars.len() as f64 * train_fraction).floor() as usize;
    Ok(bars.split_at(split))
}
