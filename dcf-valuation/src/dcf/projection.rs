//! Cash-flow projection, terminal value and discounting.
//!
//! All functions here are pure: the same inputs always produce the same
//! output.

use super::types::{HistoricalSeries, PresentValueSeries, ProjectedSeries, TerminalValue};
use crate::error::{DcfError, Result};

/// Project free cash flow forward at a constant rate.
///
/// The horizon equals the number of historical periods, so the output holds
/// `series.len() + 1` values: index 0 is the last historical value and each
/// following value grows by `rate`.
pub fn project_cash_flows(series: &HistoricalSeries, rate: f64) -> Result<ProjectedSeries> {
    let seed = series
        .last()
        .ok_or_else(|| DcfError::InsufficientData("historical series is empty".into()))?
        .value;

    let horizon = series.len();
    let mut projected = Vec::with_capacity(horizon + 1);
    projected.push(seed);
    for i in 1..=horizon {
        projected.push(projected[i - 1] * (1.0 + rate));
    }

    Ok(ProjectedSeries(projected))
}

/// Gordon-growth terminal value: `base * (1 + g) / (k - g)`.
///
/// `required_rate` must be strictly greater than `perpetual_rate`.
pub fn terminal_value(base: f64, perpetual_rate: f64, required_rate: f64) -> Result<TerminalValue> {
    if required_rate <= perpetual_rate {
        return Err(DcfError::InvalidAssumption(format!(
            "required rate ({}) must be greater than perpetual growth rate ({})",
            required_rate, perpetual_rate
        )));
    }

    Ok(TerminalValue {
        value: base * (1.0 + perpetual_rate) / (required_rate - perpetual_rate),
        base,
        perpetual_rate,
        required_rate,
    })
}

/// Discount every projected value and the terminal value to today.
///
/// Projected value `i` is divided by `(1 + k)^(i + 1)`, so the seed at index 0
/// is discounted one full period. The terminal value is divided by
/// `(1 + k)^n` where `n` is the number of projected values, i.e. over the
/// same number of periods as the final projected value.
pub fn discount_cash_flows(
    projected: &ProjectedSeries,
    required_rate: f64,
    terminal: &TerminalValue,
) -> PresentValueSeries {
    let factor = 1.0 + required_rate;
    let mut discounted: Vec<f64> = projected
        .values()
        .iter()
        .enumerate()
        .map(|(i, cf)| cf / factor.powi(i as i32 + 1))
        .collect();

    discounted.push(terminal.value / factor.powi(projected.len() as i32));

    PresentValueSeries(discounted)
}

/// Total present value divided by shares outstanding.
pub fn intrinsic_value_per_share(present_values: &PresentValueSeries, shares_outstanding: f64) -> Result<f64> {
    if !shares_outstanding.is_finite() || shares_outstanding <= 0.0 {
        return Err(DcfError::InvalidAssumption(format!(
            "shares outstanding must be positive, got {}",
            shares_outstanding
        )));
    }

    Ok(present_values.total() / shares_outstanding)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9 * b.abs().max(1.0)
    }

    #[test]
    fn test_projection_scenario() {
        let series = HistoricalSeries::new([(2021, 110.0), (2022, 121.0)]);
        let projected = project_cash_flows(&series, 0.10).unwrap();
        let expected = [121.0, 133.1, 146.41];
        assert_eq!(projected.len(), 3);
        for (got, want) in projected.values().iter().zip(expected) {
            assert!(approx(*got, want), "{} vs {}", got, want);
        }
    }

    #[test]
    fn test_projection_length_and_seed() {
        for n in 1..8 {
            let series = HistoricalSeries::new((0..n).map(|i| (2000 + i, 10.0 + f64::from(i))));
            let projected = project_cash_flows(&series, 0.03).unwrap();
            assert_eq!(projected.len(), series.len() + 1);
            assert_eq!(projected.values()[0], series.last().unwrap().value);
        }
    }

    #[test]
    fn test_projection_empty_series() {
        let err = project_cash_flows(&HistoricalSeries::default(), 0.05).unwrap_err();
        assert!(matches!(err, DcfError::InsufficientData(_)));
    }

    #[test]
    fn test_terminal_value_scenario() {
        let tv = terminal_value(121.0, 0.02, 0.10).unwrap();
        assert!(approx(tv.value, 1542.75), "tv: {}", tv.value);
        assert_eq!(tv.base, 121.0);
    }

    #[test]
    fn test_terminal_value_equal_rates_rejected() {
        let err = terminal_value(121.0, 0.10, 0.10).unwrap_err();
        assert!(matches!(err, DcfError::InvalidAssumption(_)));
    }

    #[test]
    fn test_terminal_value_required_below_perpetual_rejected() {
        assert!(terminal_value(121.0, 0.05, 0.03).is_err());
    }

    #[test]
    fn test_discount_scenario() {
        let projected = ProjectedSeries(vec![121.0, 133.1, 146.41]);
        let tv = terminal_value(121.0, 0.02, 0.10).unwrap();
        let pv = discount_cash_flows(&projected, 0.10, &tv);

        let expected = [
            121.0 / 1.1,
            133.1 / 1.1_f64.powi(2),
            146.41 / 1.1_f64.powi(3),
            1542.75 / 1.1_f64.powi(3),
        ];
        assert_eq!(pv.len(), 4);
        for (got, want) in pv.values().iter().zip(expected) {
            assert!(approx(*got, want), "{} vs {}", got, want);
        }
        assert!(approx(pv.total(), expected.iter().sum()));
    }

    #[test]
    fn test_discount_is_pure() {
        let projected = ProjectedSeries(vec![50.0, 55.0, 60.5, 66.55]);
        let tv = terminal_value(66.55, 0.025, 0.09).unwrap();
        let first = discount_cash_flows(&projected, 0.09, &tv);
        let second = discount_cash_flows(&projected, 0.09, &tv);
        assert_eq!(first, second);
        assert_eq!(first.len(), projected.len() + 1);
    }

    #[test]
    fn test_intrinsic_value_per_share() {
        let pv = PresentValueSeries(vec![100.0, 200.0, 700.0]);
        assert_eq!(intrinsic_value_per_share(&pv, 10.0).unwrap(), 100.0);
        assert!(matches!(
            intrinsic_value_per_share(&pv, 0.0),
            Err(DcfError::InvalidAssumption(_))
        ));
    }
}
