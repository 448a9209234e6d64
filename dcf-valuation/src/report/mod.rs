//! Report rendering for DCF results.
//!
//! - Summary rows (metric → display string) shared by every output
//! - Plain-text report for the terminal
//! - XLSX workbook built in memory (see [`xlsx`])

pub mod xlsx;

pub use xlsx::{build_workbook, export_xlsx, write_xlsx, Workbook, XLSX_CONTENT_TYPE};

use serde::{Deserialize, Serialize};
use std::fmt::Write;

use crate::dcf::DcfReport;

/// Round to two decimals and render in shortest form with at least one
/// fractional digit (`10.0`, `5.12`, `-3.5`).
pub fn format_decimal(value: f64) -> String {
    if !value.is_finite() {
        return if value.is_nan() {
            "nan".into()
        } else if value > 0.0 {
            "inf".into()
        } else {
            "-inf".into()
        };
    }

    let rounded = (value * 100.0).round() / 100.0;
    let text = rounded.to_string();
    if text.contains('.') {
        text
    } else {
        format!("{}.0", text)
    }
}

/// Percentage display, e.g. `12.34%`.
pub fn format_percent(value: f64) -> String {
    format!("{}%", format_decimal(value))
}

/// Currency display, e.g. `$189.5`.
pub fn format_currency(value: f64) -> String {
    format!("${}", format_decimal(value))
}

/// File name for an exported workbook.
pub fn export_file_name(ticker: &str) -> String {
    format!("{}_financial_analysis.xlsx", ticker)
}

/// One row of the summary table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub metric: String,
    pub value: String,
}

impl SummaryRow {
    fn new(metric: &str, value: String) -> Self {
        Self {
            metric: metric.to_string(),
            value,
        }
    }
}

/// The five summary rows, in export order.
pub fn summary_rows(report: &DcfReport) -> Vec<SummaryRow> {
    vec![
        SummaryRow::new(
            "Average Historical FCF Growth YOY",
            format_percent(report.historical_growth_pct),
        ),
        SummaryRow::new(
            "Average Projected FCF Growth YOY",
            format_percent(report.assumptions.growth_rate * 100.0),
        ),
        SummaryRow::new(
            "Required Rate",
            format_percent(report.assumptions.required_rate * 100.0),
        ),
        SummaryRow::new(
            "Current Price",
            format_currency(report.valuation.current_price),
        ),
        SummaryRow::new(
            "Intrinsic Value",
            format_currency(report.valuation.intrinsic_value),
        ),
    ]
}

/// Render a report as plain text for terminal output.
pub fn render_text(report: &DcfReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Historical Cash Flow for {}", report.ticker);
    for point in report.historical.iter() {
        let _ = writeln!(out, "  {:<6} {:>22.2}", point.year, point.value);
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Average Historical FCF Growth YOY");
    let _ = writeln!(out, "  {}", format_percent(report.historical_growth_pct));

    let _ = writeln!(out);
    let _ = writeln!(out, "Future Cash Flow:");
    for (i, value) in report.projected.values().iter().enumerate() {
        let _ = writeln!(out, "  {:<6} {:>22.2}", i, value);
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "PV of Future Cash Flow:");
    for (i, value) in report.present_values.values().iter().enumerate() {
        let _ = writeln!(out, "  {:<6} {:>22.2}", i, value);
    }

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Terminal value ({} base): {:.2}",
        report.assumptions.terminal_base, report.terminal_value.value
    );
    let _ = writeln!(out, "Total present value: {:.2}", report.valuation.total_present_value);
    let _ = writeln!(
        out,
        "Current Price for {}: {}",
        report.ticker,
        format_currency(report.valuation.current_price)
    );
    let _ = writeln!(
        out,
        "Intrinsic Value for {}: {}",
        report.ticker,
        format_currency(report.valuation.intrinsic_value)
    );
    if let Some(mos) = report.valuation.margin_of_safety {
        let _ = writeln!(out, "Margin of safety: {}", format_percent(mos));
    }

    out
}
