//! Feature pipeline properties and the CSV-to-features path.

mod common;

use common::*;
use mltrader::adapters::csv_adapter::CsvAdapter;
use mltrader::domain::error::MltraderError;
use mltrader::domain::features::{build_features, ordinal_bucket};
use mltrader::domain::indicator::{calculate_bollinger, calculate_rsi, IndicatorParams};
use mltrader::ports::data_port::DataPort;
use proptest::prelude::*;
use std::fs;
use tempfile::TempDir;

fn random_walk(start: f64, steps: &[f64]) -> Vec<f64> {
    steps
        .iter()
        .scan(start, |p, s| {
            *p *= 1.0 + s;
            Some(*p)
        })
        .collect()
}

#[test]
fn csv_file_to_feature_table() {
    let bars = wavy_bars(260);
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bars.csv");
    fs::write(&path, bars_to_csv(&bars)).unwrap();

    let loaded = CsvAdapter::new(path).fetch_bars().unwrap();
    assert_eq!(loaded.len(), bars.len());

    let prepared = build_features(&loaded, &IndicatorParams::default()).unwrap();
    assert_eq!(prepared.len(), 260 - 200);
    assert_eq!(prepared.dropped_rows, 200);
    assert_eq!(prepared.timestamps[0], bars[199].timestamp);
}

#[test]
fn default_minimum_is_enforced() {
    let err = build_features(&wavy_bars(199), &IndicatorParams::default()).unwrap_err();
    assert!(matches!(
        err,
        MltraderError::InsufficientData {
            bars: 199,
            minimum: 201
        }
    ));
}

#[test]
fn warmup_length_input_is_insufficient_not_empty() {
    let err = build_features(&wavy_bars(200), &IndicatorParams::default()).unwrap_err();
    assert!(matches!(
        err,
        MltraderError::InsufficientData {
            bars: 200,
            minimum: 201
        }
    ));

    let prepared = build_features(&wavy_bars(201), &IndicatorParams::default()).unwrap();
    assert_eq!(prepared.len(), 1);
    assert_eq!(prepared.dropped_rows, 200);
}

#[test]
fn appending_bars_does_not_change_earlier_rows() {
    let bars = wavy_bars(120);
    let short = build_features(&bars[..80], &small_params()).unwrap();
    let long = build_features(&bars, &small_params()).unwrap();

    for (i, ts) in short.timestamps.iter().enumerate() {
        let j = long.timestamps.iter().position(|t| t == ts).unwrap();
        assert_eq!(short.features.row(i), long.features.row(j));
        assert_eq!(short.labels[i], long.labels[j]);
    }
}

proptest! {
    #[test]
    fn prepared_rows_are_fully_defined(
        steps in prop::collection::vec(-0.03f64..0.03, 40..120),
    ) {
        let bars = bars_from_closes(&random_walk(100.0, &steps));
        let prepared = build_features(&bars, &small_params()).unwrap();

        prop_assert_eq!(prepared.len() + prepared.dropped_rows, bars.len());
        prop_assert!(prepared.features.to_matrix().iter().all(|v| !v.is_nan()));
        for i in 0..prepared.len() {
            let r = prepared.forward_returns[i];
            prop_assert_eq!(prepared.labels[i], u8::from(r > 0.0));
            prop_assert_eq!(prepared.ordinal_labels[i], ordinal_bucket(r));
        }
    }

    #[test]
    fn rsi_stays_in_range(
        steps in prop::collection::vec(-0.05f64..0.05, 2..100),
        period in 2usize..20,
    ) {
        let closes: Vec<Option<f64>> = random_walk(50.0, &steps).into_iter().map(Some).collect();
        for value in calculate_rsi(&closes, period).into_iter().flatten() {
            prop_assert!((0.0..=100.0).contains(&value));
        }
    }

    #[test]
    fn bollinger_bands_are_ordered(
        steps in prop::collection::vec(-0.05f64..0.05, 2..100),
        period in 2usize..30,
        mult in 0.5f64..3.0,
    ) {
        let closes: Vec<Option<f64>> = random_walk(50.0, &steps).into_iter().map(Some).collect();
        let bands = calculate_bollinger(&closes, period, mult);
        for i in 0..closes.len() {
            if let (Some(l), Some(m), Some(u)) = (bands.lower[i], bands.middle[i], bands.upper[i]) {
                prop_assert!(l <= m && m <= u);
            }
        }
    }
}
