//! HTTP routes for the valuation service.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::header,
    response::{Html, IntoResponse, Json},
    routing::{get, post},
    Router,
};
use dcf_common::config::TerminalBase;
use dcf_common::logging::generate_trace_id;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::dcf::{normalize_ticker, DcfAssumptions, DcfReport};
use crate::error::{DcfError, Result};
use crate::report::{export_file_name, export_xlsx, summary_rows, SummaryRow, XLSX_CONTENT_TYPE};
use crate::AppState;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub service: String,
    pub data_source: String,
}

/// Analysis request. Omitted rates fall back to the configured defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeRequest {
    pub ticker: String,
    #[serde(default)]
    pub growth_rate: Option<f64>,
    #[serde(default)]
    pub required_rate: Option<f64>,
    #[serde(default)]
    pub perpetual_rate: Option<f64>,
    #[serde(default)]
    pub terminal_base: Option<TerminalBase>,
}

impl AnalyzeRequest {
    fn assumptions(&self, state: &AppState) -> DcfAssumptions {
        let defaults = &state.config.defaults;
        DcfAssumptions::new(
            self.growth_rate.unwrap_or(defaults.growth_rate),
            self.required_rate.unwrap_or(defaults.required_rate),
            self.perpetual_rate.unwrap_or(defaults.perpetual_rate),
        )
        .with_terminal_base(self.terminal_base.unwrap_or(defaults.terminal_base))
    }
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub report: DcfReport,
    pub summary: Vec<SummaryRow>,
    pub export_file: String,
}

// ============================================================================
// Router
// ============================================================================

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/v1/analyze", post(analyze))
        .route("/api/v1/export", post(export))
        .with_state(state)
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Health check endpoint
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        service: "simple-dcf".to_string(),
        data_source: state.analyzer.source_name().to_string(),
    })
}

/// Interactive form
pub async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    let defaults = &state.config.defaults;
    Html(
        INDEX_HTML
            .replace("{{ticker}}", &html_escape(&defaults.ticker))
            .replace("{{growth_rate}}", &defaults.growth_rate.to_string())
            .replace("{{required_rate}}", &defaults.required_rate.to_string())
            .replace("{{perpetual_rate}}", &defaults.perpetual_rate.to_string()),
    )
}

/// Run an analysis and return the report as JSON
pub async fn analyze(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<AnalyzeResponse>> {
    let report = run_analysis(&state, payload).await?;

    Ok(Json(AnalyzeResponse {
        summary: summary_rows(&report),
        export_file: export_file_name(&report.ticker),
        report,
    }))
}

/// Render a previously returned report as a workbook attachment.
///
/// The report is taken as posted, so the download matches what the user saw
/// and no market data is fetched again.
pub async fn export(
    payload: std::result::Result<Json<DcfReport>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(mut report) = payload.map_err(|e| DcfError::InvalidInput(e.body_text()))?;
    report.ticker = normalize_ticker(&report.ticker)?;
    let bytes = export_xlsx(&report)?;
    let file_name = export_file_name(&report.ticker);

    info!(ticker = %report.ticker, bytes = bytes.len(), "Workbook exported");

    Ok((
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        bytes,
    ))
}

async fn run_analysis(
    state: &AppState,
    payload: std::result::Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<DcfReport> {
    let Json(request) = payload.map_err(|e| DcfError::InvalidInput(e.body_text()))?;
    let trace_id = generate_trace_id();
    info!(trace_id = %trace_id, ticker = %request.ticker, "Analysis requested");

    let assumptions = request.assumptions(state);
    let analysis = state.analyzer.analyze(&request.ticker, assumptions);
    let outcome = match tokio::time::timeout(state.analysis_timeout, analysis).await {
        Ok(outcome) => outcome,
        Err(_) => Err(DcfError::UpstreamUnavailable(format!(
            "market data not received within {:?}",
            state.analysis_timeout
        ))),
    };

    outcome.inspect_err(|e| {
        warn!(trace_id = %trace_id, kind = e.kind(), error = %e, "Analysis failed");
    })
}

fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Simple DCF Analysis</title>
<style>
body { font-family: sans-serif; max-width: 720px; margin: 2em auto; }
label { display: block; margin-top: 0.8em; }
table { border-collapse: collapse; margin: 0.5em 0 1.5em; }
td, th { border: 1px solid #ccc; padding: 0.2em 0.6em; text-align: right; }
.error { color: #b00; }
</style>
</head>
<body>
<h1>Simple DCF Analysis</h1>
<form id="dcf-form">
  <label>Enter a ticker symbol:
    <input name="ticker" type="text" value="{{ticker}}" required></label>
  <label>Enter a growth rate:
    <input name="growth_rate" type="number" min="0" max="10" step="0.01" value="{{growth_rate}}"></label>
  <label>Enter a required rate:
    <input name="required_rate" type="number" min="0" max="1" step="0.01" value="{{required_rate}}"></label>
  <label>Enter a perpetual growth rate:
    <input name="perpetual_rate" type="number" min="0" max="1" step="0.01" value="{{perpetual_rate}}"></label>
  <p><button type="submit">Analyze</button></p>
</form>
<div id="result"></div>
<script>
const form = document.getElementById('dcf-form');
const result = document.getElementById('result');

function request() {
  const data = new FormData(form);
  return {
    ticker: data.get('ticker'),
    growth_rate: parseFloat(data.get('growth_rate')),
    required_rate: parseFloat(data.get('required_rate')),
    perpetual_rate: parseFloat(data.get('perpetual_rate')),
  };
}

function table(title, header, rows) {
  let html = `<h3>${title}</h3><table><tr><th></th><th>${header}</th></tr>`;
  for (const [k, v] of rows) html += `<tr><th>${k}</th><td>${v.toFixed(2)}</td></tr>`;
  return html + '</table>';
}

form.addEventListener('submit', async (event) => {
  event.preventDefault();
  result.textContent = 'Analyzing...';
  const res = await fetch('/api/v1/analyze', {
    method: 'POST', headers: { 'content-type': 'application/json' },
    body: JSON.stringify(request()),
  });
  const json = await res.json().catch(() => ({ message: res.statusText }));
  if (!res.ok) {
    const error = document.createElement('p');
    error.className = 'error';
    error.textContent = json.message;
    result.replaceChildren(error);
    return;
  }
  const r = json.report;
  let html = table(`Historical Cash Flow for ${r.ticker}`, 'Historical FCF',
    r.historical.map(p => [p.year, p.value]));
  html += `<p>Average Historical FCF Growth YOY: ${json.summary[0].value}</p>`;
  html += table('Future Cash Flow', 'Future FCF', r.projected.map((v, i) => [i, v]));
  html += table('PV of Future Cash Flow', 'PV of Future FCF', r.present_values.map((v, i) => [i, v]));
  html += `<p>Total present value: ${r.valuation.total_present_value.toFixed(2)}</p>`;
  html += `<p>Current Price for ${r.ticker}: ${json.summary[3].value}</p>`;
  html += `<p>Intrinsic Value for ${r.ticker}: ${json.summary[4].value}</p>`;
  html += `<p><button id="download">Download Excel file</button></p>`;
  result.innerHTML = html;

  document.getElementById('download').addEventListener('click', async () => {
    const res = await fetch('/api/v1/export', {
      method: 'POST', headers: { 'content-type': 'application/json' },
      body: JSON.stringify(json.report),
    });
    if (!res.ok) return;
    const link = document.createElement('a');
    link.href = URL.createObjectURL(await res.blob());
    link.download = json.export_file;
    link.click();
  });
});
</script>
</body>
</html>
"#;
