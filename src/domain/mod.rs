//! Core domain types and logic.

pub mod ohlcv;
pub mod indicator;
pub mod features;
pub mod model;
pub mod training;
pub mod backtest;
pub mod metrics;
pub mod config_validation;
pub mod error;
