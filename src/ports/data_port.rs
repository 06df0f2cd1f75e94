//! Bar source port trait.

use crate::domain::error::MltraderError;
use crate::domain::ohlcv::Bar;

pub trait DataPort {
    /// Every available bar, ordered by strictly increasing timestamp.
    fn fetch_bars(&self) -> Result<Vec<Bar>, MltraderError>;
}
