//! Classification and performance metrics.

use serde::{Deserialize, Serialize};

/// Binary confusion counts; the up class (1) is positive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_negative: usize,
    pub false_positive: usize,
    pub false_negative: usize,
    pub true_positive: usize,
}

impl ConfusionMatrix {
    pub fn from_labels(predicted: &[u8], actual: &[u8]) -> Self {
        let mut m = ConfusionMatrix::default();
        for (&p, &a) in predicted.iter().zip(actual) {
            match (a == 1, p == 1) {
                (false, false) => m.true_negative += 1,
                (false, true) => m.false_positive += 1,
                (true, false) => m.false_negative += 1,
                (true, true) => m.true_positive += 1,
            }
        }
        m
    }

    pub fn total(&self) -> usize {
        self.true_negative + self.false_positive + self.false_negative + self.true_positive
    }

    /// Rows are actual (down, up), columns predicted (down, up).
    pub fn as_rows(&self) -> [[usize; 2]; 2] {
        [
            [self.true_negative, self.false_positive],
            [self.false_negative, self.true_positive],
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub confusion: ConfusionMatrix,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

impl ClassificationMetrics {
    /// Precision, recall and F1 are 0 when their denominator is 0.
    pub fn compute(predicted: &[u8], actual: &[u8]) -> Self {
        let confusion = ConfusionMatrix::from_labels(predicted, actual);
        let tp = confusion.true_positive;
        let accuracy = ratio(tp + confusion.true_negative, confusion.total());
        let precision = ratio(tp, tp + confusion.false_positive);
        let recall = ratio(tp, tp + confusion.false_negative);
        let f1_score = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        ClassificationMetrics {
            accuracy,
            precision,
            recall,
            f1_score,
            confusion,
        }
    }
}

/// Compounded growth of the per-period returns, annualized.
///
/// Returns 0 when there are no periods.
pub fn annualized_return(returns: &[f64], periods_per_year: f64) -> f64 {
    let total_return = returns.iter().map(|r| 1.0 + r).product::<f64>() - 1.0;
    let years = returns.len() as f64 / periods_per_year;
    if years > 0.0 && total_return.is_finite() {
        (1.0 + total_return).powf(1.0 / years) - 1.0
    } else {
        0.0
    }
}

/// Annualized Sharpe ratio over per-period returns, population standard deviation.
///
/// 0 when there are no periods or the returns do not vary.
pub fn sharpe_ratio(returns: &[f64], risk_free_rate: f64, periods_per_year: f64) -> f64 {
    // a constant series has zero variance; the float mean can leave a residue
    if returns.iter().all(|r| *r == returns[0]) {
        return 0.0;
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();
    if stddev == 0.0 || !stddev.is_finite() {
        return 0.0;
    }

    let period_rf = risk_free_rate / periods_per_year;
    let excess_mean = mean - period_rf;
    periods_per_year.sqrt() * excess_mean / stddev
}

/// Worst peak-to-trough decline as a non-positive fraction of the peak.
pub fn max_drawdown(equity: &[f64]) -> f64 {
    let Some(&first) = equity.first() else {
        return 0.0;
    };
    let mut peak = first;
    let mut max_dd = 0.0_f64;
    for &value in equity {
        if value > peak {
            peak = value;
        } else if peak > 0.0 {
            max_dd = max_dd.min((value - peak) / peak);
        }
    }
    max_dd
}

/// Share of nonzero-return periods that were positive; 0 when there are none.
pub fn win_rate(returns: &[f64]) -> f64 {
    let active = returns.iter().filter(|&&r| r != 0.0).count();
    let wins = returns.iter().filter(|&&r| r > 0.0).count();
    ratio(wins, active)
}
