//! Trailing-window primitives shared by the indicators.
//!
//! A window result is defined only when every value inside the window is
//! defined, and the first `period - 1` positions are always undefined.

use super::{defined, Column};

/// Applies `f` to each full trailing window of `period` values.
pub fn rolling(values: &[Option<f64>], period: usize, f: impl Fn(&[f64]) -> f64) -> Column {
    if period == 0 {
        return vec![None; values.len()];
    }

    let mut out = Vec::with_capacity(values.len());
    let mut buf: Vec<f64> = Vec::with_capacity(period);

    for i in 0..values.len() {
        if i + 1 < period {
            out.push(None);
            continue;
        }
        buf.clear();
        for v in &values[i + 1 - period..=i] {
            match v {
                Some(x) => buf.push(*x),
                None => break,
            }
        }
        if buf.len() == period {
            out.push(defined(f(&buf)));
        } else {
            out.push(None);
        }
    }

    out
}

pub fn rolling_min(values: &[Option<f64>], period: usize) -> Column {
    rolling(values, period, |w| w.iter().copied().fold(f64::INFINITY, f64::min))
}

pub fn rolling_max(values: &[Option<f64>], period: usize) -> Column {
    rolling(values, period, |w| {
        w.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    })
}

/// Moves values `lag` positions later; the first `lag` positions become undefined.
pub fn shift(values: &[Option<f64>], lag: usize) -> Column {
    let n = values.len();
    let mut out = vec![None; n.min(lag)];
    if lag < n {
        out.extend_from_slice(&values[..n - lag]);
    }
    out
}

/// Moves values `lead` positions earlier; the last `lead` positions become undefined.
pub fn lead(values: &[Option<f64>], lead: usize) -> Column {
    let n = values.len();
    let mut out: Column = values.iter().skip(lead).copied().collect();
    out.resize(n, None);
    out
}

/// First difference; position 0 is undefined.
pub fn diff(values: &[Option<f64>]) -> Column {
    let prev = shift(values, 1);
    super::zip_with(values, &prev, |cur, prev| cur - prev)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(values: &[f64]) -> Column {
        values.iter().copied().map(Some).collect()
    }

    #[test]
    fn rolling_warmup_is_undefined() {
        let out = rolling(&col(&[1.0, 2.0, 3.0, 4.0]), 3, |w| w.iter().sum());
        assert_eq!(out, vec![None, None, Some(6.0), Some(9.0)]);
    }

    #[test]
    fn rolling_undefined_input_poisons_window() {
        let values = vec![Some(1.0), None, Some(3.0), Some(4.0), Some(5.0)];
        let out = rolling(&values, 2, |w| w.iter().sum());
        assert_eq!(out, vec![None, None, None, Some(7.0), Some(9.0)]);
    }

    #[test]
    fn rolling_zero_period_is_all_undefined() {
        let out = rolling(&col(&[1.0, 2.0]), 0, |w| w.iter().sum());
        assert_eq!(out, vec![None, None]);
    }

    #[test]
    fn rolling_min_max() {
        let values = col(&[3.0, 1.0, 4.0, 1.0, 5.0]);
        assert_eq!(
            rolling_min(&values, 3),
            vec![None, None, Some(1.0), Some(1.0), Some(1.0)]
        );
        assert_eq!(
            rolling_max(&values, 3),
            vec![None, None, Some(4.0), Some(4.0), Some(5.0)]
        );
    }

    #[test]
    fn shift_and_lead() {
        let values = col(&[1.0, 2.0, 3.0]);
        assert_eq!(shift(&values, 1), vec![None, Some(1.0), Some(2.0)]);
        assert_eq!(shift(&values, 5), vec![None, None, None]);
        assert_eq!(lead(&values, 1), vec![Some(2.0), Some(3.0), None]);
    }

    #[test]
    fn diff_first_is_undefined() {
        let values = col(&[10.0, 12.0, 11.0]);
        assert_eq!(diff(&values), vec![None, Some(2.0), Some(-1.0)]);
    }
}
