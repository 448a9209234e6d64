//! DCF Analyzer.
//!
//! Runs the linear pipeline: historical series → growth estimate →
//! projection → terminal value → discounting → per-share value.

use chrono::Utc;
use dcf_common::config::TerminalBase;
use std::sync::Arc;
use tracing::{info, instrument};

use super::growth::average_growth_pct;
use super::projection::{
    discount_cash_flows, intrinsic_value_per_share, project_cash_flows, terminal_value,
};
use super::series::build_historical_series;
use super::types::{DcfAssumptions, DcfReport, ValuationResult};
use crate::data::{MarketDataSource, MarketSnapshot, FREE_CASH_FLOW};
use crate::error::{DcfError, Result};

/// Normalize a user-entered ticker: trimmed, upper-cased, restricted to the
/// characters exchange symbols use and holding at least one letter or digit.
pub fn normalize_ticker(raw: &str) -> Result<String> {
    let ticker = raw.trim().to_uppercase();
    if ticker.is_empty() {
        return Err(DcfError::InvalidInput("ticker must not be empty".into()));
    }
    if !ticker
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '='))
    {
        return Err(DcfError::InvalidInput(format!("invalid ticker symbol '{}'", raw.trim())));
    }
    if !ticker.chars().any(|c| c.is_ascii_alphanumeric()) {
        return Err(DcfError::InvalidInput(format!("invalid ticker symbol '{}'", raw.trim())));
    }
    Ok(ticker)
}

/// DCF analyzer bound to a market data source.
pub struct DcfAnalyzer {
    source: Arc<dyn MarketDataSource>,
}

impl DcfAnalyzer {
    /// Create an analyzer fetching from `source`.
    pub fn new(source: Arc<dyn MarketDataSource>) -> Self {
        Self { source }
    }

    /// Name of the underlying data source
    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    /// Fetch market data for `ticker` and value it.
    #[instrument(skip(self, assumptions), fields(source = self.source.name()))]
    pub async fn analyze(&self, ticker: &str, assumptions: DcfAssumptions) -> Result<DcfReport> {
        let ticker = normalize_ticker(ticker)?;
        let assumptions = assumptions.clamped()?;

        let snapshot = self.source.snapshot(&ticker).await?;
        Self::evaluate(&snapshot, &assumptions)
    }

    /// Value an already-fetched snapshot. Pure computation, no I/O.
    pub fn evaluate(snapshot: &MarketSnapshot, assumptions: &DcfAssumptions) -> Result<DcfReport> {
        let historical = build_historical_series(&snapshot.statement, FREE_CASH_FLOW)?;
        let historical_growth_pct = average_growth_pct(&historical)?;
        let projected = project_cash_flows(&historical, assumptions.growth_rate)?;

        let base = match assumptions.terminal_base {
            TerminalBase::Projected => projected.last(),
            TerminalBase::Historical => historical.last().map(|p| p.value),
        }
        .ok_or_else(|| DcfError::InsufficientData("no cash flow to seed terminal value".into()))?;

        let terminal = terminal_value(base, assumptions.perpetual_rate, assumptions.required_rate)?;
        let present_values = discount_cash_flows(&projected, assumptions.required_rate, &terminal);
        let intrinsic_value =
            intrinsic_value_per_share(&present_values, snapshot.shares_outstanding)?;

        let margin_of_safety = if intrinsic_value > 0.0 {
            Some((intrinsic_value - snapshot.current_price) / intrinsic_value * 100.0)
        } else {
            None
        };

        let valuation = ValuationResult {
            total_present_value: present_values.total(),
            shares_outstanding: snapshot.shares_outstanding,
            intrinsic_value,
            current_price: snapshot.current_price,
            margin_of_safety,
        };

        info!(
            ticker = %snapshot.ticker,
            periods = historical.len(),
            historical_growth_pct,
            growth_rate = assumptions.growth_rate,
            required_rate = assumptions.required_rate,
            perpetual_rate = assumptions.perpetual_rate,
            terminal_base = %assumptions.terminal_base,
            intrinsic_value,
            current_price = snapshot.current_price,
            "DCF valuation complete"
        );

        Ok(DcfReport {
            ticker: snapshot.ticker.clone(),
            assumptions: *assumptions,
            historical,
            historical_growth_pct,
            projected,
            terminal_value: terminal,
            present_values,
            valuation,
            analyzed_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::CashFlowStatement;
    use chrono::NaiveDate;

    fn make_snapshot() -> MarketSnapshot {
        let statement = CashFlowStatement::new()
            .with(FREE_CASH_FLOW, NaiveDate::from_ymd_opt(2020, 9, 30).unwrap(), 100.0)
            .with(FREE_CASH_FLOW, NaiveDate::from_ymd_opt(2021, 9, 30).unwrap(), 110.0)
            .with(FREE_CASH_FLOW, NaiveDate::from_ymd_opt(2022, 9, 30).unwrap(), 121.0);

        MarketSnapshot {
            ticker: "TEST".into(),
            statement,
            shares_outstanding: 10.0,
            current_price: 150.0,
        }
    }

    #[test]
    fn test_normalize_ticker() {
        assert_eq!(normalize_ticker(" aapl ").unwrap(), "AAPL");
        assert_eq!(normalize_ticker("brk-b").unwrap(), "BRK-B");
        assert!(matches!(normalize_ticker("   "), Err(DcfError::InvalidInput(_))));
        assert!(matches!(normalize_ticker("../etc"), Err(DcfError::InvalidInput(_))));
    }

    #[test]
    fn test_normalize_ticker_rejects_symbol_only() {
        for raw in [".", "..", "-", "^=", " ... "] {
            assert!(
                matches!(normalize_ticker(raw), Err(DcfError::InvalidInput(_))),
                "accepted '{}'",
                raw
            );
        }
        assert_eq!(normalize_ticker("^gspc").unwrap(), "^GSPC");
        assert_eq!(normalize_ticker("eurusd=x").unwrap(), "EURUSD=X");
    }

    #[test]
    fn test_evaluate_historical_base() {
        let assumptions =
            DcfAssumptions::new(0.10, 0.10, 0.02).with_terminal_base(TerminalBase::Historical);
        let report = DcfAnalyzer::evaluate(&make_snapshot(), &assumptions).unwrap();

        assert!((report.historical_growth_pct - 10.0).abs() < 1e-9);
        assert_eq!(report.projected.len(), 4);
        assert!((report.terminal_value.value - 1542.75).abs() < 1e-9);
        assert_eq!(report.present_values.len(), 5);

        let expected_tv_pv = 1542.75 / 1.1_f64.powi(4);
        assert!((report.present_values.terminal().unwrap() - expected_tv_pv).abs() < 1e-9);
        assert!(
            (report.valuation.intrinsic_value - report.present_values.total() / 10.0).abs() < 1e-9
        );
    }

    #[test]
    fn test_evaluate_projected_base_uses_final_projection() {
        let assumptions = DcfAssumptions::new(0.10, 0.10, 0.02);
        let report = DcfAnalyzer::evaluate(&make_snapshot(), &assumptions).unwrap();
        assert_eq!(report.terminal_value.base, report.projected.last().unwrap());
        assert!(report.terminal_value.base > 121.0);
    }

    #[test]
    fn test_evaluate_rejects_required_equal_perpetual() {
        let assumptions = DcfAssumptions::new(0.05, 0.02, 0.02);
        let err = DcfAnalyzer::evaluate(&make_snapshot(), &assumptions).unwrap_err();
        assert!(matches!(err, DcfError::InvalidAssumption(_)));
    }

    #[test]
    fn test_margin_of_safety() {
        let mut snapshot = make_snapshot();
        let assumptions = DcfAssumptions::new(0.05, 0.10, 0.02);
        let report = DcfAnalyzer::evaluate(&snapshot, &assumptions).unwrap();
        let iv = report.valuation.intrinsic_value;

        snapshot.current_price = iv / 2.0;
        let report = DcfAnalyzer::evaluate(&snapshot, &assumptions).unwrap();
        assert!((report.valuation.margin_of_safety.unwrap() - 50.0).abs() < 1e-9);
    }
}
