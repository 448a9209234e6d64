//! DCF pipeline types.
//!
//! Every type here is a transient value computed fresh per analysis run.

use chrono::{DateTime, Utc};
use dcf_common::config::{TerminalBase, ValuationDefaults};
use dcf_common::{GROWTH_RATE_RANGE, RATE_RANGE};
use serde::{Deserialize, Serialize};

use crate::error::{DcfError, Result};

// ============================================================================
// Parsed Cells
// ============================================================================

/// Why a statement cell was left out of the historical series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    /// No value reported
    Missing,
    /// Text that does not parse as a number
    NotNumeric,
    /// NaN or infinite
    NonFinite,
}

/// Outcome of parsing one statement cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParsedValue {
    Valid(f64),
    Excluded(ExclusionReason),
}

// ============================================================================
// Historical Series
// ============================================================================

/// One fiscal year of free cash flow.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YearValue {
    pub year: i32,
    pub value: f64,
}

/// Free cash flow by fiscal year, ascending, one entry per year.
///
/// There is no mutating API; a series is fixed once built.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoricalSeries {
    points: Vec<YearValue>,
}

impl HistoricalSeries {
    /// Build from (year, value) pairs in any order.
    ///
    /// Non-finite values are dropped; for a repeated year the last pair wins.
    pub fn new(pairs: impl IntoIterator<Item = (i32, f64)>) -> Self {
        let mut points: Vec<YearValue> = Vec::new();
        for (year, value) in pairs {
            if !value.is_finite() {
                continue;
            }
            match points.iter_mut().find(|p| p.year == year) {
                Some(existing) => existing.value = value,
                None => points.push(YearValue { year, value }),
            }
        }
        points.sort_by_key(|p| p.year);
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &YearValue> {
        self.points.iter()
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.value)
    }

    pub fn first(&self) -> Option<YearValue> {
        self.points.first().copied()
    }

    /// Most recent year
    pub fn last(&self) -> Option<YearValue> {
        self.points.last().copied()
    }
}

// ============================================================================
// Projection Types
// ============================================================================

/// Projected free cash flows, index 0 = last historical value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectedSeries(pub(crate) Vec<f64>);

impl ProjectedSeries {
    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<f64> {
        self.0.last().copied()
    }
}

/// Gordon-growth terminal value and the inputs it was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerminalValue {
    /// Terminal value
    pub value: f64,
    /// Cash flow the perpetuity was seeded from
    pub base: f64,
    /// Perpetual growth rate (fraction)
    pub perpetual_rate: f64,
    /// Required rate of return (fraction)
    pub required_rate: f64,
}

/// Discounted cash flows; the final entry is the discounted terminal value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PresentValueSeries(pub(crate) Vec<f64>);

impl PresentValueSeries {
    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum of every entry, terminal value included.
    pub fn total(&self) -> f64 {
        self.0.iter().sum()
    }

    /// Discounted terminal value
    pub fn terminal(&self) -> Option<f64> {
        self.0.last().copied()
    }
}

// ============================================================================
// Assumptions
// ============================================================================

/// User-supplied valuation assumptions. All rates are fractions (0.05 = 5%).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DcfAssumptions {
    /// Constant growth rate applied to projected cash flows
    pub growth_rate: f64,
    /// Required rate of return (discount rate)
    pub required_rate: f64,
    /// Perpetual growth rate for the terminal value
    pub perpetual_rate: f64,
    /// Terminal value seed
    #[serde(default)]
    pub terminal_base: TerminalBase,
}

impl DcfAssumptions {
    pub fn new(growth_rate: f64, required_rate: f64, perpetual_rate: f64) -> Self {
        Self {
            growth_rate,
            required_rate,
            perpetual_rate,
            terminal_base: TerminalBase::default(),
        }
    }

    pub fn with_terminal_base(mut self, terminal_base: TerminalBase) -> Self {
        self.terminal_base = terminal_base;
        self
    }

    /// Clamp every rate into the range the form accepts.
    ///
    /// Non-finite input is rejected rather than clamped.
    pub fn clamped(self) -> Result<Self> {
        for (name, value) in [
            ("growth_rate", self.growth_rate),
            ("required_rate", self.required_rate),
            ("perpetual_rate", self.perpetual_rate),
        ] {
            if !value.is_finite() {
                return Err(DcfError::InvalidInput(format!("{} must be a finite number", name)));
            }
        }

        Ok(Self {
            growth_rate: self.growth_rate.clamp(GROWTH_RATE_RANGE.0, GROWTH_RATE_RANGE.1),
            required_rate: self.required_rate.clamp(RATE_RANGE.0, RATE_RANGE.1),
            perpetual_rate: self.perpetual_rate.clamp(RATE_RANGE.0, RATE_RANGE.1),
            terminal_base: self.terminal_base,
        })
    }
}

impl From<&ValuationDefaults> for DcfAssumptions {
    fn from(defaults: &ValuationDefaults) -> Self {
        Self::new(
            defaults.growth_rate,
            defaults.required_rate,
            defaults.perpetual_rate,
        )
        .with_terminal_base(defaults.terminal_base)
    }
}

// ============================================================================
// Results
// ============================================================================

/// Per-share valuation outcome.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValuationResult {
    /// Sum of the present value series
    pub total_present_value: f64,
    pub shares_outstanding: f64,
    /// Intrinsic value per share
    pub intrinsic_value: f64,
    /// Latest traded price
    pub current_price: f64,
    /// (intrinsic - price) / intrinsic, in percent; absent when intrinsic <= 0
    pub margin_of_safety: Option<f64>,
}

/// Complete output of one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DcfReport {
    pub ticker: String,
    pub assumptions: DcfAssumptions,
    pub historical: HistoricalSeries,
    /// Mean year-over-year historical growth, in percent
    pub historical_growth_pct: f64,
    pub projected: ProjectedSeries,
    pub terminal_value: TerminalValue,
    pub present_values: PresentValueSeries,
    pub valuation: ValuationResult,
    pub analyzed_at: DateTime<Utc>,
}
