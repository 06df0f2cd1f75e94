//! Configuration validation.
//!
//! Reads every section into typed settings and rejects bad values before
//! any bars are loaded or features computed.

use crate::domain::backtest::BacktestConfig;
use crate::domain::error::MltraderError;
use crate::domain::indicator::IndicatorParams;
use crate::domain::training::TrainingMode;
use crate::ports::config_port::ConfigPort;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_TRAIN_FRACTION: f64 = 0.8;
pub const DEFAULT_SEED: u64 = 42;

#[derive(Debug, Clone, PartialEq)]
pub struct DataSettings {
    pub path: Option<PathBuf>,
    pub train_fraction: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSettings {
    pub mode: TrainingMode,
    pub seed: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputSettings {
    pub results_path: Option<PathBuf>,
    pub models_dir: Option<PathBuf>,
}

/// Fully validated run configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub data: DataSettings,
    pub features: IndicatorParams,
    pub training: TrainingSettings,
    pub backtest: BacktestConfig,
    pub output: OutputSettings,
}

impl AppConfig {
    pub fn from_port(config: &dyn ConfigPort) -> Result<Self, MltraderError> {
        Ok(AppConfig {
            data: validate_data_config(config)?,
            features: validate_feature_config(config)?,
            training: validate_training_config(config)?,
            backtest: validate_backtest_config(config)?,
            output: validate_output_config(config),
        })
    }

    /// The bar file; required by every command that computes features.
    pub fn require_data_path(&self) -> Result<&PathBuf, MltraderError> {
        self.data.path.as_ref().ok_or_else(|| MltraderError::ConfigMissing {
            section: "data".to_string(),
            key: "path".to_string(),
        })
    }
}

fn parse_value<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: T,
) -> Result<T, MltraderError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| {
            MltraderError::invalid(section, key, format!("cannot parse '{}'", raw))
        }),
    }
}

fn parse_list(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: &[usize],
) -> Result<Vec<usize>, MltraderError> {
    match config.get_string(section, key) {
        None => Ok(default.to_vec()),
        Some(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse().map_err(|_| {
                    MltraderError::invalid(section, key, format!("'{}' is not a whole number", s))
                })
            })
            .collect(),
    }
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<DataSettings, MltraderError> {
    let train_fraction = parse_value(config, "data", "train_fraction", DEFAULT_TRAIN_FRACTION)?;
    if !(train_fraction > 0.0 && train_fraction < 1.0) {
        return Err(MltraderError::invalid(
            "data",
            "train_fraction",
            "train_fraction must be between 0 and 1 (exclusive)",
        ));
    }
    Ok(DataSettings {
        path: config.get_string("data", "path").map(PathBuf::from),
        train_fraction,
    })
}

pub fn validate_feature_config(config: &dyn ConfigPort) -> Result<IndicatorParams, MltraderError> {
    let d = IndicatorParams::default();
    let section = "features";
    let params = IndicatorParams {
        ma_windows: parse_list(config, section, "ma_windows", &d.ma_windows)?,
        rsi_period: parse_value(config, section, "rsi_period", d.rsi_period)?,
        macd_fast: parse_value(config, section, "macd_fast", d.macd_fast)?,
        macd_slow: parse_value(config, section, "macd_slow", d.macd_slow)?,
        macd_signal: parse_value(config, section, "macd_signal", d.macd_signal)?,
        bollinger_period: parse_value(config, section, "bollinger_period", d.bollinger_period)?,
        bollinger_mult: parse_value(config, section, "bollinger_mult", d.bollinger_mult)?,
        stoch_k: parse_value(config, section, "stoch_k", d.stoch_k)?,
        stoch_d: parse_value(config, section, "stoch_d", d.stoch_d)?,
        atr_period: parse_value(config, section, "atr_period", d.atr_period)?,
        volume_window: parse_value(config, section, "volume_window", d.volume_window)?,
        lags: parse_list(config, section, "lags", &d.lags)?,
        horizon: parse_value(config, section, "horizon", d.horizon)?,
    };
    params.validate()?;
    Ok(params)
}

pub fn validate_training_config(config: &dyn ConfigPort) -> Result<TrainingSettings, MltraderError> {
    let workers: usize = parse_value(config, "training", "workers", 0)?;
    let mode = match config
        .get_string("training", "mode")
        .map(|m| m.to_lowercase())
        .as_deref()
    {
        None | Some("parallel") => TrainingMode::Parallel {
            workers: (workers > 0).then_some(workers),
        },
        Some("sequential") => TrainingMode::Sequential,
        Some(other) => {
            return Err(MltraderError::invalid(
                "training",
                "mode",
                format!("unknown mode '{}', expected parallel or sequential", other),
            ))
        }
    };
    Ok(TrainingSettings {
        mode,
        seed: parse_value(config, "training", "seed", DEFAULT_SEED)?,
    })
}

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, MltraderError> {
    let d = BacktestConfig::default();
    let backtest = BacktestConfig {
        initial_capital: parse_value(config, "backtest", "initial_capital", d.initial_capital)?,
        commission: parse_value(config, "backtest", "commission", d.commission)?,
        risk_free_rate: parse_value(config, "backtest", "risk_free_rate", d.risk_free_rate)?,
        periods_per_year: parse_value(config, "backtest", "periods_per_year", d.periods_per_year)?,
    };
    backtest.validate()?;
    Ok(backtest)
}

pub fn validate_output_config(config: &dyn ConfigPort) -> OutputSettings {
    OutputSettings {
        results_path: config.get_string("output", "results_path").map(PathBuf::from),
        models_dir: config.get_string("output", "models_dir").map(PathBuf::from),
    }
}
