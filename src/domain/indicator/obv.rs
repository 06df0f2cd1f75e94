//! OBV (On-Balance Volume) indicator.

use super::Column;
use crate::domain::ohlcv::Bar;

/// Calculate OBV (On-Balance Volume).
///
/// OBV[0] = 0 (no previous close)
/// If close[i] > close[i-1]: OBV[i] = OBV[i-1] + volume[i]
/// If close[i] < close[i-1]: OBV[i] = OBV[i-1] - volume[i]
/// If close[i] == close[i-1]: OBV[i] = OBV[i-1]
///
/// No warmup period; all bars are defined.
pub fn calculate_obv(bars: &[Bar]) -> Column {
    let mut obv = 0.0;

    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            if i > 0 {
                let prev_close = bars[i - 1].close;
                if bar.close > prev_close {
                    obv += bar.volume;
                } else if bar.close < prev_close {
                    obv -= bar.volume;
                }
            }
            Some(obv)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn make_bar(hour: i64, close: f64, volume: f64) -> Bar {
        Bar {
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
                + chrono::Duration::hours(hour),
            open: close,
            high: close,
            low: close,
            close,
            volume,
        }
    }

    #[test]
    fn obv_empty() {
        assert!(calculate_obv(&[]).is_empty());
    }

    #[test]
    fn obv_first_bar_is_zero() {
        let series = calculate_obv(&[make_bar(0, 100.0, 5000.0)]);
        assert_relative_eq!(series[0].unwrap(), 0.0);
    }

    #[test]
    fn obv_signed_accumulation() {
        let bars = vec![
            make_bar(0, 100.0, 1000.0),
            make_bar(1, 105.0, 2000.0),
            make_bar(2, 103.0, 500.0),
            make_bar(3, 103.0, 700.0),
            make_bar(4, 110.0, 300.0),
        ];
        let series = calculate_obv(&bars);
        let values: Vec<f64> = series.into_iter().flatten().collect();
        assert_eq!(values, vec![0.0, 2000.0, 1500.0, 1500.0, 1800.0]);
    }
}
