//! Technical indicator implementations.
//!
//! Indicators operate on whole columns so that every value sees the full
//! input history. A column is a `Vec<Option<f64>>` aligned with the bars:
//! - `None` marks an undefined value (warm-up, boundary shift, 0/0)
//! - `Some(x)` may still be infinite (e.g. a division by a zero band width)
//!
//! All windows are trailing; no value depends on a later bar.

pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod obv;
pub mod returns;
pub mod rsi;
pub mod sma;
pub mod stddev;
pub mod stochastic;
pub mod window;

use crate::domain::error::MltraderError;
use std::fmt;

pub use atr::calculate_atr;
pub use bollinger::{calculate_bollinger, BollingerBands};
pub use ema::calculate_ema;
pub use macd::{calculate_macd, MacdLines};
pub use obv::calculate_obv;
pub use returns::{log_returns, pct_change};
pub use rsi::calculate_rsi;
pub use sma::calculate_sma;
pub use stddev::calculate_stddev;
pub use stochastic::{calculate_stochastic, StochasticLines};

pub type Column = Vec<Option<f64>>;

/// Maps NaN to `None`; infinities pass through.
pub fn defined(x: f64) -> Option<f64> {
    if x.is_nan() { None } else { Some(x) }
}

/// Lifts a plain series into a fully defined column.
pub fn column_of(values: impl IntoIterator<Item = f64>) -> Column {
    values.into_iter().map(defined).collect()
}

/// Element-wise binary operation; undefined if either side is undefined
/// or the result is NaN.
pub fn zip_with(a: &[Option<f64>], b: &[Option<f64>], f: impl Fn(f64, f64) -> f64) -> Column {
    a.iter()
        .zip(b)
        .map(|(x, y)| match (x, y) {
            (Some(x), Some(y)) => defined(f(*x, *y)),
            _ => None,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    Ema(usize),
    Rsi(usize),
    Atr(usize),
    Obv,
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    Stochastic {
        k_period: usize,
        d_period: usize,
    },
    Bollinger {
        period: usize,
        stddev_mult_x100: u32,
    },
    VolumeSma(usize),
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Atr(period) => write!(f, "ATR({})", period),
            IndicatorType::Obv => write!(f, "OBV"),
            IndicatorType::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
            IndicatorType::Stochastic { k_period, d_period } => {
                write!(f, "STOCHASTIC({},{})", k_period, d_period)
            }
            IndicatorType::Bollinger {
                period,
                stddev_mult_x100,
            } => {
                let mult = *stddev_mult_x100 as f64 / 100.0;
                write!(f, "BOLLINGER({},{})", period, mult)
            }
            IndicatorType::VolumeSma(period) => write!(f, "VOLUME_SMA({})", period),
        }
    }
}

/// Window parameters of the feature pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorParams {
    pub ma_windows: Vec<usize>,
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub bollinger_period: usize,
    pub bollinger_mult: f64,
    pub stoch_k: usize,
    pub stoch_d: usize,
    pub atr_period: usize,
    pub volume_window: usize,
    pub lags: Vec<usize>,
    pub horizon: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            ma_windows: vec![7, 14, 21, 50, 200],
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            bollinger_period: 20,
            bollinger_mult: 2.0,
            stoch_k: 14,
            stoch_d: 3,
            atr_period: 14,
            volume_window: 20,
            lags: vec![1, 2, 3, 5, 7],
            horizon: 1,
        }
    }
}

impl IndicatorParams {
    /// Rejects malformed parameters before any computation begins.
    pub fn validate(&self) -> Result<(), MltraderError> {
        if self.ma_windows.is_empty() {
            return Err(MltraderError::invalid(
                "features",
                "ma_windows",
                "at least one moving-average window is required",
            ));
        }
        if self.ma_windows.contains(&0) {
            return Err(MltraderError::invalid(
                "features",
                "ma_windows",
                "windows must be positive",
            ));
        }
        if self.lags.contains(&0) {
            return Err(MltraderError::invalid(
                "features",
                "lags",
                "lags must be positive",
            ));
        }

        let windows = [
            ("rsi_period", self.rsi_period),
            ("macd_fast", self.macd_fast),
            ("macd_slow", self.macd_slow),
            ("macd_signal", self.macd_signal),
            ("bollinger_period", self.bollinger_period),
            ("stoch_k", self.stoch_k),
            ("stoch_d", self.stoch_d),
            ("atr_period", self.atr_period),
            ("volume_window", self.volume_window),
            ("horizon", self.horizon),
        ];
        for (key, value) in windows {
            if value == 0 {
                return Err(MltraderError::invalid(
                    "features",
                    key,
                    format!("{} must be positive", key),
                ));
            }
        }

        if self.bollinger_period < 2 {
            return Err(MltraderError::invalid(
                "features",
                "bollinger_period",
                "bollinger_period must be at least 2 for a sample standard deviation",
            ));
        }
        if self.macd_fast >= self.macd_slow {
            return Err(MltraderError::invalid(
                "features",
                "macd_fast",
                "macd_fast must be shorter than macd_slow",
            ));
        }
        if !(self.bollinger_mult > 0.0 && self.bollinger_mult.is_finite()) {
            return Err(MltraderError::invalid(
                "features",
                "bollinger_mult",
                "bollinger_mult must be a positive number",
            ));
        }
        Ok(())
    }

    /// The longest trailing window any indicator needs. Every column is
    /// defined from row `longest_lookback() - 1` onwards.
    pub fn longest_lookback(&self) -> usize {
        let ma = self.ma_windows.iter().copied().max().unwrap_or(0);
        [
            ma,
            self.rsi_period,
            self.macd_slow,
            self.bollinger_period,
            self.stoch_k + self.stoch_d,
            self.atr_period,
            self.volume_window,
            // lagged returns start one bar after the lag itself
            self.lags.iter().copied().max().unwrap_or(0) + 2,
        ]
        .into_iter()
        .max()
        .unwrap_or(1)
    }

    /// Shortest input that leaves at least one row once warm-up and the
    /// forward-looking target rows are trimmed.
    pub fn minimum_bars(&self) -> usize {
        self.longest_lookback() + self.horizon
    }
}
