//! Discounted-cash-flow valuation.
//!
//! # Pipeline
//!
//! 1. **Series**: pull "Free Cash Flow" out of the statement, keyed by year
//! 2. **Growth**: mean year-over-year change of the historical series
//! 3. **Projection**: grow the last historical value at the assumed rate,
//!    one period per historical year
//! 4. **Terminal value**: Gordon growth on the chosen base cash flow
//! 5. **Discounting**: present-value every projected flow and the terminal
//!    value at the required rate, then divide by shares outstanding
//!
//! # Usage
//!
//! ```ignore
//! use dcf_valuation::dcf::{DcfAnalyzer, DcfAssumptions};
//!
//! let analyzer = DcfAnalyzer::new(source);
//! let report = analyzer.analyze("AAPL", DcfAssumptions::new(0.05, 0.10, 0.02)).await?;
//!
//! println!("Intrinsic value: {:.2}", report.valuation.intrinsic_value);
//! ```

pub mod analyzer;
pub mod growth;
pub mod projection;
pub mod series;
pub mod types;

pub use analyzer::{normalize_ticker, DcfAnalyzer};
pub use growth::average_growth_pct;
pub use projection::{
    discount_cash_flows, intrinsic_value_per_share, project_cash_flows, terminal_value,
};
pub use series::{build_historical_series, parse_cell};
pub use types::{
    DcfAssumptions, DcfReport, ExclusionReason, HistoricalSeries, ParsedValue,
    PresentValueSeries, ProjectedSeries, TerminalValue, ValuationResult, YearValue,
};
