#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use mltrader::domain::error::MltraderError;
use mltrader::domain::indicator::IndicatorParams;
use mltrader::domain::model::{ModelSnapshot, TrainableModel};
pub use mltrader::domain::ohlcv::Bar;
use mltrader::ports::data_port::DataPort;
use ndarray::Array2;

pub struct MockDataPort {
    pub bars: Vec<Bar>,
    pub error: Option<String>,
}

impl MockDataPort {
    pub fn new(bars: Vec<Bar>) -> Self {
        Self { bars, error: None }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            bars: Vec::new(),
            error: Some(reason.to_string()),
        }
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(&self) -> Result<Vec<Bar>, MltraderError> {
        match &self.error {
            Some(reason) => Err(MltraderError::Data {
                reason: reason.clone(),
            }),
            None => Ok(self.bars.clone()),
        }
    }
}

pub fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

/// Hourly bars with the given closes; open is the previous close.
pub fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                timestamp: start() + Duration::hours(i as i64),
                open,
                high: open.max(close) * 1.002,
                low: open.min(close) * 0.998,
                close,
                volume: 1000.0 + (i % 7) as f64 * 150.0,
            }
        })
        .collect()
}

/// Close rises by exactly 1 every bar, starting at 100.
pub fn rising_bars(n: usize) -> Vec<Bar> {
    let closes: Vec<f64> = (0..n).map(|i| 100.0 + i as f64).collect();
    bars_from_closes(&closes)
}

/// A drifting oscillation with both up and down moves.
pub fn wavy_bars(n: usize) -> Vec<Bar> {
    let closes: Vec<f64> = (0..n)
        .map(|i| {
            let t = i as f64;
            100.0 + 8.0 * (t * 0.31).sin() + 3.0 * (t * 1.7).cos() + 0.02 * t
        })
        .collect();
    bars_from_closes(&closes)
}

pub fn bars_to_csv(bars: &[Bar]) -> String {
    let mut out = String::from("timestamp,open,high,low,close,volume\n");
    for b in bars {
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            b.timestamp.format("%Y-%m-%d %H:%M:%S"),
            b.open,
            b.high,
            b.low,
            b.close,
            b.volume
        ));
    }
    out
}

/// Short windows so small fixtures clear the warm-up.
pub fn small_params() -> IndicatorParams {
    IndicatorParams {
        ma_windows: vec![3, 5, 10],
        rsi_period: 5,
        macd_fast: 4,
        macd_slow: 8,
        macd_signal: 3,
        bollinger_period: 5,
        bollinger_mult: 2.0,
        stoch_k: 5,
        stoch_d: 3,
        atr_period: 5,
        volume_window: 5,
        lags: vec![1, 2, 3],
        horizon: 1,
    }
}

pub const SMALL_FEATURES_INI: &str = "\
[features]
ma_windows = 3, 5, 10
rsi_period = 5
macd_fast = 4
macd_slow = 8
macd_signal = 3
bollinger_period = 5
stoch_k = 5
stoch_d = 3
atr_period = 5
volume_window = 5
lags = 1, 2, 3
";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Script {
    Constant(u8),
    FailFit,
    Panic,
}

/// A model whose behaviour is fixed up front.
#[derive(Debug)]
pub struct ScriptedModel {
    pub name: String,
    pub script: Script,
    pub fitted: bool,
}

pub fn scripted(name: &str, script: Script) -> Box<dyn TrainableModel> {
    Box::new(ScriptedModel {
        name: name.to_string(),
        script,
        fitted: false,
    })
}

impl TrainableModel for ScriptedModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_fitted(&self) -> bool {
        self.fitted
    }

    fn fit(&mut self, _x: &Array2<f64>, _y: &[u8]) -> Result<(), MltraderError> {
        match self.script {
            Script::Constant(_) => {
                self.fitted = true;
                Ok(())
            }
            Script::FailFit => Err(MltraderError::ModelTraining {
                model: self.name.clone(),
                reason: "scripted failure".to_string(),
            }),
            Script::Panic => panic!("scripted panic in {}", self.name),
        }
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Vec<u8>, MltraderError> {
        match (self.fitted, self.script) {
            (true, Script::Constant(label)) => Ok(vec![label; x.nrows()]),
            _ => Err(MltraderError::InvalidState {
                model: self.name.clone(),
            }),
        }
    }

    fn snapshot(&self) -> Result<ModelSnapshot, MltraderError> {
        Ok(ModelSnapshot {
            model: self.name.clone(),
            scaler: None,
            state: serde_json::Value::Null,
        })
    }

    fn restore(&mut self, _snapshot: ModelSnapshot) -> Result<(), MltraderError> {
        self.fitted = true;
        Ok(())
    }
}
