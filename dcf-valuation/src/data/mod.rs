//! Market data for the DCF pipeline.
//!
//! A data source supplies three inputs per ticker: the cash-flow statement,
//! the share count outstanding and the latest traded price. The statement is
//! kept in raw form (cells may be numbers, text or missing) so the series
//! builder decides what counts as usable data.
//!
//! # Data Sources
//! - **Yahoo Finance**: fundamentals time-series + intraday chart endpoints

mod provider;
mod yahoo;

pub use provider::{MarketDataSource, ProviderError};
pub use yahoo::YahooFinanceAdapter;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Line item carrying free cash flow in a cash-flow statement.
pub const FREE_CASH_FLOW: &str = "Free Cash Flow";

/// Line item carrying operating cash flow in a cash-flow statement.
pub const OPERATING_CASH_FLOW: &str = "Operating Cash Flow";

/// Line item carrying capital expenditure in a cash-flow statement.
pub const CAPITAL_EXPENDITURE: &str = "Capital Expenditure";

// ============================================================================
// Raw Statement Types
// ============================================================================

/// A single statement cell as delivered by the upstream source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum RawCell {
    /// Numeric value (may still be NaN/inf)
    Number(f64),
    /// Textual value, possibly numeric ("1.5e9") or garbage ("n/a")
    Text(String),
    /// No value reported for the period
    Missing,
}

impl From<f64> for RawCell {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for RawCell {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Cash-flow statement: line item → (period end date → cell).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CashFlowStatement {
    rows: BTreeMap<String, BTreeMap<NaiveDate, RawCell>>,
}

impl CashFlowStatement {
    /// Create an empty statement
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cell for a line item and period, replacing any previous cell.
    pub fn insert(&mut self, line_item: impl Into<String>, period_end: NaiveDate, cell: RawCell) {
        self.rows
            .entry(line_item.into())
            .or_default()
            .insert(period_end, cell);
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, line_item: &str, period_end: NaiveDate, cell: impl Into<RawCell>) -> Self {
        self.insert(line_item, period_end, cell.into());
        self
    }

    /// Get all cells of a line item, ordered by period end.
    pub fn row(&self, line_item: &str) -> Option<&BTreeMap<NaiveDate, RawCell>> {
        self.rows.get(line_item)
    }

    /// Names of all line items present
    pub fn line_items(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Everything fetched for one ticker in one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// Normalized ticker symbol
    pub ticker: String,
    /// Cash-flow statement
    pub statement: CashFlowStatement,
    /// Shares outstanding
    pub shares_outstanding: f64,
    /// Latest traded price
    pub current_price: f64,
}
