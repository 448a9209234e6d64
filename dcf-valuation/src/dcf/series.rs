//! Historical series builder.
//!
//! Extracts one line item from a cash-flow statement, parses each cell
//! explicitly and keys the usable values by calendar year.

use chrono::Datelike;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::types::{ExclusionReason, HistoricalSeries, ParsedValue};
use crate::data::{CashFlowStatement, RawCell};
use crate::error::{DcfError, Result};

/// Parse a raw cell into a usable number or an exclusion marker.
pub fn parse_cell(cell: &RawCell) -> ParsedValue {
    let value = match cell {
        RawCell::Missing => return ParsedValue::Excluded(ExclusionReason::Missing),
        RawCell::Number(n) => *n,
        RawCell::Text(s) => match s.trim().parse::<f64>() {
            Ok(n) => n,
            Err(_) => return ParsedValue::Excluded(ExclusionReason::NotNumeric),
        },
    };

    if value.is_finite() {
        ParsedValue::Valid(value)
    } else {
        ParsedValue::Excluded(ExclusionReason::NonFinite)
    }
}

/// Build the historical series for `line_item`.
///
/// Cells that do not parse are dropped. When two periods end in the same
/// calendar year the later period is kept.
pub fn build_historical_series(
    statement: &CashFlowStatement,
    line_item: &str,
) -> Result<HistoricalSeries> {
    let row = statement
        .row(line_item)
        .ok_or_else(|| DcfError::NotFound(format!("line item '{}' not in statement", line_item)))?;

    let mut by_year: BTreeMap<i32, f64> = BTreeMap::new();
    let mut excluded = 0usize;

    // Row is ordered by period end, so a later period overwrites an earlier one.
    for (period_end, cell) in row {
        match parse_cell(cell) {
            ParsedValue::Valid(value) => {
                let year = period_end.year();
                if let Some(discarded) = by_year.insert(year, value) {
                    warn!(
                        year,
                        discarded,
                        kept = value,
                        period_end = %period_end,
                        "Two periods end in the same year, keeping the later one"
                    );
                }
            }
            ParsedValue::Excluded(reason) => {
                debug!(period_end = %period_end, reason = ?reason, "Excluding statement cell");
                excluded += 1;
            }
        }
    }

    let series = HistoricalSeries::new(by_year);

    debug!(
        line_item,
        periods = series.len(),
        excluded,
        "Historical series built"
    );

    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{FREE_CASH_FLOW, OPERATING_CASH_FLOW};
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_cell() {
        assert_eq!(parse_cell(&RawCell::Number(5.0)), ParsedValue::Valid(5.0));
        assert_eq!(parse_cell(&RawCell::Text(" 1.5e3 ".into())), ParsedValue::Valid(1500.0));
        assert_eq!(
            parse_cell(&RawCell::Text("n/a".into())),
            ParsedValue::Excluded(ExclusionReason::NotNumeric)
        );
        assert_eq!(
            parse_cell(&RawCell::Missing),
            ParsedValue::Excluded(ExclusionReason::Missing)
        );
        assert_eq!(
            parse_cell(&RawCell::Number(f64::NAN)),
            ParsedValue::Excluded(ExclusionReason::NonFinite)
        );
        assert_eq!(
            parse_cell(&RawCell::Text("inf".into())),
            ParsedValue::Excluded(ExclusionReason::NonFinite)
        );
    }

    #[test]
    fn test_build_series_ascending_by_year() {
        let statement = CashFlowStatement::new()
            .with(FREE_CASH_FLOW, date(2022, 9, 30), 121.0)
            .with(FREE_CASH_FLOW, date(2020, 9, 30), 100.0)
            .with(FREE_CASH_FLOW, date(2021, 9, 30), 110.0);

        let series = build_historical_series(&statement, FREE_CASH_FLOW).unwrap();
        let pairs: Vec<(i32, f64)> = series.iter().map(|p| (p.year, p.value)).collect();
        assert_eq!(pairs, vec![(2020, 100.0), (2021, 110.0), (2022, 121.0)]);
    }

    #[test]
    fn test_build_series_drops_malformed_cells() {
        let statement = CashFlowStatement::new()
            .with(FREE_CASH_FLOW, date(2019, 12, 31), "garbage")
            .with(FREE_CASH_FLOW, date(2020, 12, 31), 100.0)
            .with(FREE_CASH_FLOW, date(2021, 12, 31), "110")
            .with(FREE_CASH_FLOW, date(2022, 12, 31), RawCell::Missing);

        let series = build_historical_series(&statement, FREE_CASH_FLOW).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.first().unwrap().year, 2020);
        assert_eq!(series.last().unwrap().value, 110.0);
    }

    #[test]
    fn test_same_year_keeps_later_period() {
        let statement = CashFlowStatement::new()
            .with(FREE_CASH_FLOW, date(2021, 1, 31), 90.0)
            .with(FREE_CASH_FLOW, date(2021, 12, 31), 95.0);

        let series = build_historical_series(&statement, FREE_CASH_FLOW).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series.last().unwrap().value, 95.0);
    }

    #[test]
    fn test_three_periods_in_one_year_keep_the_last() {
        let statement = CashFlowStatement::new()
            .with(FREE_CASH_FLOW, date(2020, 12, 31), 80.0)
            .with(FREE_CASH_FLOW, date(2021, 3, 31), 90.0)
            .with(FREE_CASH_FLOW, date(2021, 6, 30), 95.0)
            .with(FREE_CASH_FLOW, date(2021, 12, 31), 97.0);

        let series = build_historical_series(&statement, FREE_CASH_FLOW).unwrap();
        let pairs: Vec<(i32, f64)> = series.iter().map(|p| (p.year, p.value)).collect();
        assert_eq!(pairs, vec![(2020, 80.0), (2021, 97.0)]);
    }

    #[test]
    fn test_missing_line_item_is_not_found() {
        let statement = CashFlowStatement::new().with(OPERATING_CASH_FLOW, date(2021, 1, 1), 1.0);
        let err = build_historical_series(&statement, FREE_CASH_FLOW).unwrap_err();
        assert!(matches!(err, DcfError::NotFound(_)));
    }
}
