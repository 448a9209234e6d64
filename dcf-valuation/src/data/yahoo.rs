//! Yahoo Finance adapter.
//!
//! # Endpoints
//! - `/ws/fundamentals-timeseries/v1/finance/timeseries/{ticker}`: annual cash-flow
//!   line items and share counts, one series per requested `type`
//! - `/v8/finance/chart/{ticker}?range=1d&interval=1m`: intraday price history
//!
//! Time-series points may be `null`, and `reportedValue.raw` is not always
//! numeric; such cells are kept as [`RawCell::Text`]/[`RawCell::Missing`] and
//! left to the series builder.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use dcf_common::config::MarketDataConfig;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use super::provider::{MarketDataSource, ProviderError};
use super::{CashFlowStatement, RawCell, CAPITAL_EXPENDITURE, FREE_CASH_FLOW, OPERATING_CASH_FLOW};

// ============================================================================
// Constants
// ============================================================================

/// Fundamentals time-series endpoint prefix
const TIMESERIES_ENDPOINT: &str = "/ws/fundamentals-timeseries/v1/finance/timeseries";

/// Chart endpoint prefix
const CHART_ENDPOINT: &str = "/v8/finance/chart";

/// Cash-flow series requested for the statement, with their line-item names.
const CASH_FLOW_TYPES: &[(&str, &str)] = &[
    ("annualFreeCashFlow", FREE_CASH_FLOW),
    ("annualOperatingCashFlow", OPERATING_CASH_FLOW),
    ("annualCapitalExpenditure", CAPITAL_EXPENDITURE),
];

/// Share-count series, most recent dated value wins.
const SHARE_COUNT_TYPES: &[&str] = &["quarterlyOrdinarySharesNumber", "annualOrdinarySharesNumber"];

/// Retry hint returned with rate-limit errors (seconds)
const RATE_LIMIT_RETRY_SECS: u64 = 60;

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct TimeseriesEnvelope {
    timeseries: TimeseriesBody,
}

#[derive(Debug, Deserialize)]
struct TimeseriesBody {
    #[serde(default)]
    result: Option<Vec<TimeseriesResult>>,
    #[serde(default)]
    error: Option<YahooError>,
}

#[derive(Debug, Deserialize)]
struct TimeseriesResult {
    meta: TimeseriesMeta,
    /// Series keyed by their type name (e.g. "annualFreeCashFlow")
    #[serde(flatten)]
    series: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct TimeseriesMeta {
    #[serde(rename = "type", default)]
    kind: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TimeseriesPoint {
    #[serde(rename = "asOfDate")]
    as_of_date: String,
    #[serde(rename = "reportedValue", default)]
    reported_value: Option<ReportedValue>,
}

#[derive(Debug, Deserialize)]
struct ReportedValue {
    #[serde(default)]
    raw: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<YahooError>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    indicators: Option<ChartIndicators>,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    #[serde(rename = "regularMarketPrice", default)]
    regular_market_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct YahooError {
    code: String,
    #[serde(default)]
    description: Option<String>,
}

impl YahooError {
    fn into_provider_error(self, ticker: &str) -> ProviderError {
        let detail = self.description.unwrap_or_else(|| self.code.clone());
        if self.code.eq_ignore_ascii_case("Not Found") {
            ProviderError::DataNotAvailable(format!("{}: {}", ticker, detail))
        } else {
            ProviderError::Internal(format!("{}: {}", self.code, detail))
        }
    }
}

/// Convert a `reportedValue.raw` JSON value into a raw statement cell.
fn raw_cell(value: Option<&serde_json::Value>) -> RawCell {
    match value {
        Some(serde_json::Value::Number(n)) => n.as_f64().map_or(RawCell::Missing, RawCell::Number),
        Some(serde_json::Value::String(s)) => RawCell::Text(s.clone()),
        Some(serde_json::Value::Null) | None => RawCell::Missing,
        Some(other) => RawCell::Text(other.to_string()),
    }
}

/// Flatten a time-series response into (type, date, cell) triples.
///
/// `null` points and points with an unparseable `asOfDate` are skipped.
fn timeseries_points(results: Vec<TimeseriesResult>) -> Vec<(String, NaiveDate, RawCell)> {
    let mut points = Vec::new();

    for mut result in results {
        let Some(kind) = result.meta.kind.first().cloned() else {
            continue;
        };
        let Some(serde_json::Value::Array(items)) = result.series.remove(&kind) else {
            continue;
        };

        for item in items {
            if item.is_null() {
                continue;
            }
            let point: TimeseriesPoint = match serde_json::from_value(item) {
                Ok(p) => p,
                Err(e) => {
                    debug!(kind = %kind, error = %e, "Skipping malformed time-series point");
                    continue;
                }
            };
            let Ok(date) = NaiveDate::parse_from_str(&point.as_of_date, "%Y-%m-%d") else {
                debug!(kind = %kind, as_of_date = %point.as_of_date, "Skipping point with bad date");
                continue;
            };
            let cell = raw_cell(point.reported_value.as_ref().and_then(|v| v.raw.as_ref()));
            points.push((kind.clone(), date, cell));
        }
    }

    points
}

// ============================================================================
// Yahoo Finance Adapter
// ============================================================================

/// Yahoo Finance adapter.
pub struct YahooFinanceAdapter {
    client: reqwest::Client,
    base_url: String,
    chart_base_url: String,
    lookback_years: u32,
}

impl YahooFinanceAdapter {
    /// Create from the market data config section
    pub fn from_config(config: &MarketDataConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            chart_base_url: config.chart_base_url.trim_end_matches('/').to_string(),
            lookback_years: config.lookback_years,
        }
    }

    /// GET a JSON document, mapping transport and status failures.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        ticker: &str,
    ) -> Result<T, ProviderError> {
        debug!(url = %url, ticker = ticker, "Fetching from Yahoo Finance");

        let response = self
            .client
            .get(url)
            .header("accept", "application/json")
            .query(query)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Network("Request timeout".into())
                } else if e.is_connect() {
                    ProviderError::Network("Connection failed".into())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ProviderError::DataNotAvailable(format!(
                "No data found for {}",
                ticker
            )));
        }

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(ProviderError::Auth(format!("HTTP {}", status)));
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited {
                retry_after_secs: Some(RATE_LIMIT_RETRY_SECS),
            });
        }

        if status.is_server_error() {
            return Err(ProviderError::Unavailable(format!("HTTP {}", status)));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Internal(format!("HTTP {}: {}", status, body)));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ProviderError::Internal(format!("Failed to parse response: {}", e)))
    }

    /// Fetch the requested time-series types for a ticker.
    async fn fetch_timeseries(
        &self,
        ticker: &str,
        types: &[&str],
    ) -> Result<Vec<(String, NaiveDate, RawCell)>, ProviderError> {
        let url = format!("{}{}/{}", self.base_url, TIMESERIES_ENDPOINT, ticker);
        let period2 = Utc::now().timestamp();
        let period1 = period2 - i64::from(self.lookback_years) * 366 * 24 * 3600;

        let query = [
            ("symbol", ticker.to_string()),
            ("type", types.join(",")),
            ("period1", period1.to_string()),
            ("period2", period2.to_string()),
        ];

        let envelope: TimeseriesEnvelope = self.get_json(&url, &query, ticker).await?;

        if let Some(err) = envelope.timeseries.error {
            return Err(err.into_provider_error(ticker));
        }

        Ok(timeseries_points(envelope.timeseries.result.unwrap_or_default()))
    }
}

// ============================================================================
// MarketDataSource Implementation
// ============================================================================

#[async_trait]
impl MarketDataSource for YahooFinanceAdapter {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    async fn cash_flow_statement(&self, ticker: &str) -> Result<CashFlowStatement, ProviderError> {
        let types: Vec<&str> = CASH_FLOW_TYPES.iter().map(|(t, _)| *t).collect();
        let points = self.fetch_timeseries(ticker, &types).await?;

        let mut statement = CashFlowStatement::new();
        for (kind, date, cell) in points {
            if let Some((_, line_item)) = CASH_FLOW_TYPES.iter().find(|(t, _)| *t == kind) {
                statement.insert(*line_item, date, cell);
            }
        }

        debug!(
            ticker = ticker,
            line_items = statement.line_items().count(),
            "Cash-flow statement fetched"
        );

        Ok(statement)
    }

    async fn shares_outstanding(&self, ticker: &str) -> Result<f64, ProviderError> {
        let points = self.fetch_timeseries(ticker, SHARE_COUNT_TYPES).await?;

        points
            .into_iter()
            .filter_map(|(_, date, cell)| match cell {
                RawCell::Number(n) if n.is_finite() && n > 0.0 => Some((date, n)),
                _ => None,
            })
            .max_by_key(|(date, _)| *date)
            .map(|(_, shares)| shares)
            .ok_or_else(|| {
                ProviderError::DataNotAvailable(format!("No share count reported for {}", ticker))
            })
    }

    async fn latest_price(&self, ticker: &str) -> Result<f64, ProviderError> {
        let url = format!("{}{}/{}", self.chart_base_url, CHART_ENDPOINT, ticker);
        let query = [("range", "1d".to_string()), ("interval", "1m".to_string())];

        let envelope: ChartEnvelope = self.get_json(&url, &query, ticker).await?;

        if let Some(err) = envelope.chart.error {
            return Err(err.into_provider_error(ticker));
        }

        let result = envelope
            .chart
            .result
            .and_then(|mut r| if r.is_empty() { None } else { Some(r.remove(0)) })
            .ok_or_else(|| ProviderError::DataNotAvailable(format!("No price history for {}", ticker)))?;

        let last_close = result
            .indicators
            .iter()
            .flat_map(|i| i.quote.iter())
            .flat_map(|q| q.close.iter())
            .rev()
            .find_map(|c| (*c).filter(|p| p.is_finite()));

        last_close
            .or(result.meta.regular_market_price)
            .ok_or_else(|| ProviderError::DataNotAvailable(format!("No price reported for {}", ticker)))
    }
}
