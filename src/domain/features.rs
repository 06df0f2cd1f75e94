//! Feature pipeline: raw bars to a fully defined feature table plus targets.
//!
//! Every column is computed over the complete bar history. Rows holding any
//! undefined value are removed in a single pass at the very end, so no
//! trailing window is ever starved by an earlier trim.

use crate::domain::error::MltraderError;
use crate::domain::indicator::window::{lead, shift};
use crate::domain::indicator::{
    calculate_atr, calculate_bollinger, calculate_ema, calculate_macd, calculate_obv,
    calculate_rsi, calculate_sma, calculate_stochastic, column_of, defined, log_returns,
    pct_change, zip_with, Column, IndicatorParams, IndicatorType,
};
use crate::domain::ohlcv::{validate_ordering, Bar};
use chrono::NaiveDateTime;
use ndarray::Array2;
use std::io::Write;
use tracing::{debug, info};

/// Columns derived from the future; never part of the model input.
pub const TARGET_COLUMNS: [&str; 4] = [
    "future_close",
    "future_return",
    "target",
    "target_multiclass",
];

/// Ordinal bucket breakpoints on the forward return (right-inclusive).
const STRONG_MOVE: f64 = 0.02;
const MILD_MOVE: f64 = 0.005;

/// Maps a forward return to {0: strong down, 1: down, 2: neutral, 3: up, 4: strong up}.
pub fn ordinal_bucket(forward_return: f64) -> u8 {
    if forward_return <= -STRONG_MOVE {
        0
    } else if forward_return <= -MILD_MOVE {
        1
    } else if forward_return <= MILD_MOVE {
        2
    } else if forward_return <= STRONG_MOVE {
        3
    } else {
        4
    }
}

/// Indicator families the pipeline computes for the given parameters.
pub fn indicator_types(params: &IndicatorParams) -> Vec<IndicatorType> {
    let mut types = Vec::new();
    for &window in &params.ma_windows {
        types.push(IndicatorType::Sma(window));
        types.push(IndicatorType::Ema(window));
    }
    types.push(IndicatorType::Rsi(params.rsi_period));
    types.push(IndicatorType::Macd {
        fast: params.macd_fast,
        slow: params.macd_slow,
        signal: params.macd_signal,
    });
    types.push(IndicatorType::Bollinger {
        period: params.bollinger_period,
        stddev_mult_x100: (params.bollinger_mult * 100.0).round() as u32,
    });
    types.push(IndicatorType::Stochastic {
        k_period: params.stoch_k,
        d_period: params.stoch_d,
    });
    types.push(IndicatorType::Atr(params.atr_period));
    types.push(IndicatorType::VolumeSma(params.volume_window));
    types.push(IndicatorType::Obv);
    types
}

/// Dense, fully defined feature rows with named columns.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    names: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl FeatureTable {
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.names.len()
    }

    /// Row `index` as (feature name, value) pairs in column order.
    pub fn row(&self, index: usize) -> Option<Vec<(&str, f64)>> {
        self.rows.get(index).map(|row| {
            self.names
                .iter()
                .map(String::as_str)
                .zip(row.iter().copied())
                .collect()
        })
    }

    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.names.iter().position(|n| n == name)?;
        Some(self.rows.iter().map(|row| row[idx]).collect())
    }

    /// Row-major matrix of shape (rows, features) for model input.
    pub fn to_matrix(&self) -> Array2<f64> {
        let mut matrix = Array2::zeros((self.rows.len(), self.names.len()));
        for (i, row) in self.rows.iter().enumerate() {
            for (j, value) in row.iter().enumerate() {
                matrix[[i, j]] = *value;
            }
        }
        matrix
    }
}

/// Explicit pipeline state handed from feature construction to training and backtesting.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedData {
    pub features: FeatureTable,
    pub labels: Vec<u8>,
    pub ordinal_labels: Vec<u8>,
    pub forward_returns: Vec<f64>,
    pub closes: Vec<f64>,
    pub timestamps: Vec<NaiveDateTime>,
    /// Input rows removed by the final trim.
    pub dropped_rows: usize,
}

impl PreparedData {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Writes timestamp, every feature and the targets as CSV.
    pub fn to_csv<W: Write>(&self, writer: W) -> Result<(), MltraderError> {
        let mut wtr = csv::Writer::from_writer(writer);
        let csv_err = |e: csv::Error| MltraderError::Report {
            reason: e.to_string(),
        };

        let mut header = vec!["timestamp".to_string()];
        header.extend(self.features.names().iter().cloned());
        header.extend(TARGET_COLUMNS[1..].iter().map(|s| s.to_string()));
        wtr.write_record(&header).map_err(csv_err)?;

        for (i, row) in self.features.rows.iter().enumerate() {
            let mut record = Vec::with_capacity(header.len());
            record.push(self.timestamps[i].format("%Y-%m-%d %H:%M:%S").to_string());
            record.extend(row.iter().map(|v| v.to_string()));
            record.push(self.forward_returns[i].to_string());
            record.push(self.labels[i].to_string());
            record.push(self.ordinal_labels[i].to_string());
            wtr.write_record(&record).map_err(csv_err)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

/// Ordered named columns under construction.
struct Frame {
    columns: Vec<(String, Column)>,
}

impl Frame {
    fn push(&mut self, name: impl Into<String>, column: Column) {
        self.columns.push((name.into(), column));
    }

    fn get(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|(n, _)| n == name).map(|(_, c)| c)
    }
}

/// Builds the feature table, labels and aligned closes from an ordered bar sequence.
pub fn build_features(
    bars: &[Bar],
    params: &IndicatorParams,
) -> Result<PreparedData, MltraderError> {
    params.validate()?;
    validate_ordering(bars)?;

    let minimum = params.minimum_bars();
    if bars.len() < minimum {
        return Err(MltraderError::InsufficientData {
            bars: bars.len(),
            minimum,
        });
    }

    let open = column_of(bars.iter().map(|b| b.open));
    let high = column_of(bars.iter().map(|b| b.high));
    let low = column_of(bars.iter().map(|b| b.low));
    let close = column_of(bars.iter().map(|b| b.close));
    let volume = column_of(bars.iter().map(|b| b.volume));

    let mut frame = Frame {
        columns: Vec::new(),
    };
    frame.push("open", open.clone());
    frame.push("high", high.clone());
    frame.push("low", low.clone());
    frame.push("close", close.clone());
    frame.push("volume", volume.clone());

    // Returns
    let returns = pct_change(&close);
    frame.push("returns", returns.clone());
    frame.push("log_returns", log_returns(&close));

    // Moving averages
    for &window in &params.ma_windows {
        frame.push(format!("sma_{}", window), calculate_sma(&close, window));
        frame.push(format!("ema_{}", window), calculate_ema(&close, window));
    }

    frame.push("rsi", calculate_rsi(&close, params.rsi_period));

    let macd = calculate_macd(&close, params.macd_fast, params.macd_slow, params.macd_signal);
    frame.push("macd", macd.line);
    frame.push("macd_signal", macd.signal);
    frame.push("macd_histogram", macd.histogram);

    let bands = calculate_bollinger(&close, params.bollinger_period, params.bollinger_mult);
    frame.push("bb_upper", bands.upper);
    frame.push("bb_middle", bands.middle);
    frame.push("bb_lower", bands.lower);
    frame.push("bb_width", bands.width);
    frame.push("bb_position", bands.position);

    let stoch = calculate_stochastic(bars, params.stoch_k, params.stoch_d);
    frame.push("stoch_k", stoch.k);
    frame.push("stoch_d", stoch.d);

    frame.push("atr", calculate_atr(bars, params.atr_period));

    // Volume
    let volume_sma = calculate_sma(&volume, params.volume_window);
    let volume_ratio = zip_with(&volume, &volume_sma, |v, avg| v / avg);
    frame.push(format!("volume_sma_{}", params.volume_window), volume_sma);
    frame.push("volume_ratio", volume_ratio);
    frame.push("obv", calculate_obv(bars));

    // Price shape
    let range = zip_with(&high, &low, |h, l| h - l);
    frame.push("hl_ratio", zip_with(&range, &close, |r, c| r / c));
    let above_low = zip_with(&close, &low, |c, l| c - l);
    frame.push("close_position", zip_with(&above_low, &range, |a, r| a / r));
    let body = zip_with(&close, &open, |c, o| c - o);
    frame.push("oc_diff", zip_with(&body, &open, |b, o| b / o));

    // Lags
    for &lag in &params.lags {
        frame.push(format!("close_lag_{}", lag), shift(&close, lag));
        frame.push(format!("volume_lag_{}", lag), shift(&volume, lag));
        frame.push(format!("returns_lag_{}", lag), shift(&returns, lag));
    }

    debug!(
        indicators = %indicator_types(params)
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", "),
        "indicator columns computed"
    );

    // Targets
    let future_close = lead(&close, params.horizon);
    let future_return = zip_with(&future_close, &close, |f, c| (f - c) / c);
    let target: Column = future_return
        .iter()
        .map(|r| r.map(|r| if r > 0.0 { 1.0 } else { 0.0 }))
        .collect();
    let target_multiclass: Column = future_return
        .iter()
        .map(|r| r.and_then(|r| defined(f64::from(ordinal_bucket(r)))))
        .collect();
    frame.push(TARGET_COLUMNS[0], future_close);
    frame.push(TARGET_COLUMNS[1], future_return);
    frame.push(TARGET_COLUMNS[2], target);
    frame.push(TARGET_COLUMNS[3], target_multiclass);

    let prepared = trim(bars, frame)?;
    info!(
        features = prepared.features.n_features(),
        rows = prepared.len(),
        dropped = prepared.dropped_rows,
        "feature table built"
    );
    Ok(prepared)
}

/// Removes every row holding an undefined value and splits features from targets.
fn trim(bars: &[Bar], frame: Frame) -> Result<PreparedData, MltraderError> {
    let keep: Vec<usize> = (0..bars.len())
        .filter(|&i| frame.columns.iter().all(|(_, col)| col[i].is_some()))
        .collect();

    if keep.is_empty() {
        return Err(MltraderError::InvalidData {
            reason: format!(
                "no fully defined rows remain out of {} bars after indicator warm-up",
                bars.len()
            ),
        });
    }

    let target_col = |name: &str| -> Result<Vec<f64>, MltraderError> {
        let col = frame.get(name).ok_or_else(|| MltraderError::InvalidData {
            reason: format!("missing target column {}", name),
        })?;
        Ok(keep.iter().filter_map(|&i| col[i]).collect())
    };
    let forward_returns = target_col("future_return")?;
    let labels = target_col("target")?.into_iter().map(|v| v as u8).collect();
    let ordinal_labels = target_col("target_multiclass")?
        .into_iter()
        .map(|v| v as u8)
        .collect();

    let feature_cols: Vec<&(String, Column)> = frame
        .columns
        .iter()
        .filter(|(name, _)| !TARGET_COLUMNS.contains(&name.as_str()))
        .collect();
    let names = feature_cols.iter().map(|(name, _)| name.clone()).collect();
    let rows = keep
        .iter()
        .map(|&i| {
            feature_cols
                .iter()
                .filter_map(|(_, col)| col[i])
                .collect()
        })
        .collect();

    Ok(PreparedData {
        features: FeatureTable { names, rows },
        labels,
        ordinal_labels,
        forward_returns,
        closes: keep.iter().map(|&i| bars[i].close).collect(),
        timestamps: keep.iter().map(|&i| bars[i].timestamp).collect(),
        dropped_rows: bars.len() - keep.len(),
    })
}
