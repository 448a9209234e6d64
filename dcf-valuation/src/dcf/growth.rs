//! Historical growth estimator.

use super::types::HistoricalSeries;
use crate::error::{DcfError, Result};

/// Year-over-year fractional changes between adjacent entries.
///
/// A step whose predecessor is zero has no defined percentage change and is
/// skipped.
pub fn period_changes(series: &HistoricalSeries) -> Vec<f64> {
    let values: Vec<f64> = series.values().collect();
    values
        .windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| (w[1] - w[0]) / w[0])
        .filter(|c| c.is_finite())
        .collect()
}

/// Mean year-over-year growth of the series, in percent.
///
/// Fails with `InsufficientData` when fewer than two periods exist or no step
/// is defined.
pub fn average_growth_pct(series: &HistoricalSeries) -> Result<f64> {
    if series.len() < 2 {
        return Err(DcfError::InsufficientData(format!(
            "need at least 2 historical periods, got {}",
            series.len()
        )));
    }

    let changes = period_changes(series);
    if changes.is_empty() {
        return Err(DcfError::InsufficientData(
            "no defined year-over-year change (all predecessors are zero)".into(),
        ));
    }

    let mean = changes.iter().sum::<f64>() / changes.len() as f64;
    Ok(mean * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_ten_percent_steps() {
        let series = HistoricalSeries::new([(2020, 100.0), (2021, 110.0), (2022, 121.0)]);
        let growth = average_growth_pct(&series).unwrap();
        assert!((growth - 10.0).abs() < 1e-9, "growth: {}", growth);
    }

    #[test_case(0.05 ; "five percent")]
    #[test_case(-0.2 ; "shrinking")]
    #[test_case(0.0 ; "flat")]
    #[test_case(1.5 ; "fast")]
    fn test_uniform_growth_recovered(rate: f64) {
        let mut value = 250.0;
        let mut pairs = Vec::new();
        for year in 2015..2024 {
            pairs.push((year, value));
            value *= 1.0 + rate;
        }
        let series = HistoricalSeries::new(pairs);
        let growth = average_growth_pct(&series).unwrap();
        assert!((growth - rate * 100.0).abs() < 1e-9, "growth: {}", growth);
    }

    #[test]
    fn test_mixed_growth_is_mean_of_steps() {
        // +50%, -50%
        let series = HistoricalSeries::new([(2020, 100.0), (2021, 150.0), (2022, 75.0)]);
        let growth = average_growth_pct(&series).unwrap();
        assert!(growth.abs() < 1e-9);
    }

    #[test]
    fn test_zero_predecessor_step_skipped() {
        let series = HistoricalSeries::new([(2020, 0.0), (2021, 50.0), (2022, 55.0)]);
        assert_eq!(period_changes(&series).len(), 1);
        let growth = average_growth_pct(&series).unwrap();
        assert!((growth - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_point_is_insufficient() {
        let series = HistoricalSeries::new([(2022, 121.0)]);
        assert!(matches!(
            average_growth_pct(&series),
            Err(DcfError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_all_zero_is_insufficient() {
        let series = HistoricalSeries::new([(2021, 0.0), (2022, 0.0)]);
        assert!(matches!(
            average_growth_pct(&series),
            Err(DcfError::InsufficientData(_))
        ));
    }
}
