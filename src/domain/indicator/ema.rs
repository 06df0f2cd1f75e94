//! Exponential Moving Average.
//!
//! k = 2/(span+1), seeded directly from the first defined value (no bias
//! adjustment), then EMA[i] = x[i]*k + EMA[i-1]*(1-k).
//! No warmup: the EMA is defined from the first defined input onward.
//! An undefined input after the seed carries the previous EMA forward.

use super::Column;

pub fn calculate_ema(values: &[Option<f64>], span: usize) -> Column {
    if span == 0 {
        return vec![None; values.len()];
    }

    let k = 2.0 / (span as f64 + 1.0);
    let mut ema: Option<f64> = None;

    values
        .iter()
        .map(|v| {
            ema = match (ema, v) {
                (None, Some(x)) => Some(*x),
                (Some(prev), Some(x)) => Some(x * k + prev * (1.0 - k)),
                (prev, None) => prev,
            };
            ema
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn col(values: &[f64]) -> Column {
        values.iter().copied().map(Some).collect()
    }

    #[test]
    fn ema_seeded_from_first_value() {
        let series = calculate_ema(&col(&[10.0, 20.0, 30.0]), 3);
        assert_relative_eq!(series[0].unwrap(), 10.0);
    }

    #[test]
    fn ema_recursive_calculation() {
        let series = calculate_ema(&col(&[10.0, 20.0, 30.0, 40.0]), 3);
        let k = 2.0 / 4.0;

        let e1 = 20.0 * k + 10.0 * (1.0 - k);
        let e2 = 30.0 * k + e1 * (1.0 - k);
        let e3 = 40.0 * k + e2 * (1.0 - k);

        assert_relative_eq!(series[1].unwrap(), e1);
        assert_relative_eq!(series[2].unwrap(), e2);
        assert_relative_eq!(series[3].unwrap(), e3);
    }

    #[test]
    fn ema_span_1_is_identity() {
        let input = col(&[10.0, 20.0, 30.0]);
        assert_eq!(calculate_ema(&input, 1), input);
    }

    #[test]
    fn ema_leading_undefined_stays_undefined() {
        let series = calculate_ema(&[None, Some(4.0), Some(6.0)], 3);
        assert!(series[0].is_none());
        assert_relative_eq!(series[1].unwrap(), 4.0);
        assert_relative_eq!(series[2].unwrap(), 5.0);
    }

    #[test]
    fn ema_equal_prices() {
        let series = calculate_ema(&col(&[100.0; 5]), 3);
        for v in series {
            assert_relative_eq!(v.unwrap(), 100.0);
        }
    }

    #[test]
    fn ema_span_0() {
        let series = calculate_ema(&col(&[10.0, 20.0]), 0);
        assert!(series.iter().all(Option::is_none));
    }
}
