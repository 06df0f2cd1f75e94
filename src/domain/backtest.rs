//! Prediction backtest engine.
//!
//! A prediction of 1 holds the market for the next period, 0 stays flat.
//! Commission is charged on every period, flat or not.

use crate::domain::error::MltraderError;
use crate::domain::metrics::{
    annualized_return, max_drawdown, sharpe_ratio, win_rate, ClassificationMetrics,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    /// Fraction deducted from every period's return.
    pub commission: f64,
    /// Annual rate, spread evenly over `periods_per_year`.
    pub risk_free_rate: f64,
    pub periods_per_year: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_capital: 10_000.0,
            commission: 0.001,
            risk_free_rate: 0.02,
            periods_per_year: 365.0 * 24.0,
        }
    }
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<(), MltraderError> {
        if !(self.initial_capital > 0.0 && self.initial_capital.is_finite()) {
            return Err(MltraderError::invalid(
                "backtest",
                "initial_capital",
                "initial_capital must be a positive number",
            ));
        }
        if !(0.0..1.0).contains(&self.commission) {
            return Err(MltraderError::invalid(
                "backtest",
                "commission",
                "commission must be in [0, 1)",
            ));
        }
        if !self.risk_free_rate.is_finite() {
            return Err(MltraderError::invalid(
                "backtest",
                "risk_free_rate",
                "risk_free_rate must be finite",
            ));
        }
        if !(self.periods_per_year > 0.0 && self.periods_per_year.is_finite()) {
            return Err(MltraderError::invalid(
                "backtest",
                "periods_per_year",
                "periods_per_year must be positive",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub model_id: String,

    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    /// Rows actual (down, up), columns predicted (down, up).
    pub confusion_matrix: [[usize; 2]; 2],

    pub initial_capital: f64,
    pub final_capital: f64,
    pub total_return: f64,
    pub total_return_pct: f64,
    pub annualized_return: f64,
    pub annualized_return_pct: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub max_drawdown_pct: f64,
    pub win_rate: f64,
    pub win_rate_pct: f64,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,

    pub buy_hold_return: f64,
    pub buy_hold_return_pct: f64,
    pub vs_buy_hold: f64,

    pub equity_curve: Vec<f64>,
    pub strategy_returns: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Best {
    pub model_id: String,
    pub value: f64,
}

/// Leading model per metric; the first model in key order wins ties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BestByMetric {
    pub accuracy: Option<Best>,
    pub sharpe_ratio: Option<Best>,
    pub total_return: Option<Best>,
}

impl BestByMetric {
    pub fn from_results(results: &BTreeMap<String, BacktestResult>) -> Self {
        let pick = |metric: fn(&BacktestResult) -> f64| {
            let mut best: Option<Best> = None;
            for (id, result) in results {
                let value = metric(result);
                if best.as_ref().is_none_or(|b| value > b.value) && !value.is_nan() {
                    best = Some(Best {
                        model_id: id.clone(),
                        value,
                    });
                }
            }
            best
        };
        BestByMetric {
            accuracy: pick(|r| r.accuracy),
            sharpe_ratio: pick(|r| r.sharpe_ratio),
            total_return: pick(|r| r.total_return),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    pub results: BTreeMap<String, BacktestResult>,
    /// Models whose backtest could not be computed, with the reason.
    pub failures: BTreeMap<String, String>,
    pub best: BestByMetric,
}

/// Simulates one model's predictions against the price path.
///
/// Predictions, next-period returns and the actual labels (shifted by one)
/// are truncated from the start to their shortest common length.
pub fn backtest_strategy(
    model_id: &str,
    predictions: &[u8],
    actual: &[u8],
    prices: &[f64],
    config: &BacktestConfig,
) -> Result<BacktestResult, MltraderError> {
    let market_returns: Vec<f64> = prices
        .windows(2)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect();

    let n = predictions
        .len()
        .min(market_returns.len())
        .min(actual.len().saturating_sub(1));
    if n == 0 {
        return Err(MltraderError::DataAlignment {
            reason: format!(
                "{}: {} predictions, {} prices and {} labels leave no common period",
                model_id,
                predictions.len(),
                prices.len(),
                actual.len()
            ),
        });
    }
    let predictions = &predictions[..n];
    let actual = &actual[1..=n];

    let strategy_returns: Vec<f64> = predictions
        .iter()
        .zip(&market_returns[..n])
        .map(|(&p, &r)| {
            let held = if p == 1 { r } else { 0.0 };
            held - config.commission
        })
        .collect();

    let equity_curve: Vec<f64> = strategy_returns
        .iter()
        .scan(config.initial_capital, |equity, r| {
            *equity *= 1.0 + r;
            Some(*equity)
        })
        .collect();

    let classification = ClassificationMetrics::compute(predictions, actual);

    let final_capital = equity_curve.last().copied().unwrap_or(config.initial_capital);
    let total_return = (final_capital - config.initial_capital) / config.initial_capital;
    let annualized = annualized_return(&strategy_returns, config.periods_per_year);
    let sharpe = sharpe_ratio(
        &strategy_returns,
        config.risk_free_rate,
        config.periods_per_year,
    );
    let drawdown = max_drawdown(&equity_curve);
    let wins = win_rate(&strategy_returns);

    let first_price = prices[0];
    let last_price = prices[prices.len() - 1];
    let buy_hold_return = (last_price - first_price) / first_price;

    Ok(BacktestResult {
        model_id: model_id.to_string(),
        accuracy: classification.accuracy,
        precision: classification.precision,
        recall: classification.recall,
        f1_score: classification.f1_score,
        confusion_matrix: classification.confusion.as_rows(),
        initial_capital: config.initial_capital,
        final_capital,
        total_return,
        total_return_pct: total_return * 100.0,
        annualized_return: annualized,
        annualized_return_pct: annualized * 100.0,
        sharpe_ratio: sharpe,
        max_drawdown: drawdown,
        max_drawdown_pct: drawdown * 100.0,
        win_rate: wins,
        win_rate_pct: wins * 100.0,
        total_trades: strategy_returns.len(),
        winning_trades: strategy_returns.iter().filter(|&&r| r > 0.0).count(),
        losing_trades: strategy_returns.iter().filter(|&&r| r < 0.0).count(),
        buy_hold_return,
        buy_hold_return_pct: buy_hold_return * 100.0,
        vs_buy_hold: total_return - buy_hold_return,
        equity_curve,
        strategy_returns,
    })
}

/// Backtests every model's predictions against the shared labels and prices.
///
/// A model whose backtest fails is recorded in `failures`; the others still run.
pub fn run_backtests(
    predictions: &BTreeMap<String, Vec<u8>>,
    actual: &[u8],
    prices: &[f64],
    config: &BacktestConfig,
) -> Result<BacktestReport, MltraderError> {
    config.validate()?;
    if prices.len() < 2 || actual.len() < 2 {
        return Err(MltraderError::DataAlignment {
            reason: format!(
                "backtest needs at least 2 prices and 2 labels, got {} and {}",
                prices.len(),
                actual.len()
            ),
        });
    }

    let mut report = BacktestReport::default();
    for (model_id, preds) in predictions {
        match backtest_strategy(model_id, preds, actual, prices, config) {
            Ok(result) => {
                info!(
                    model = %model_id,
                    accuracy = result.accuracy,
                    total_return = result.total_return,
                    sharpe = result.sharpe_ratio,
                    "backtest complete"
                );
                report.results.insert(model_id.clone(), result);
            }
            Err(e) => {
                warn!(model = %model_id, error = %e, "backtest failed");
                report.failures.insert(model_id.clone(), e.to_string());
            }
        }
    }
    report.best = BestByMetric::from_results(&report.results);
    Ok(report)
}
