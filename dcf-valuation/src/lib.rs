//! Simple DCF Library
//!
//! Values a public company by discounting its projected free cash flow.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    simple-dcf (Rust Service)                        │
//! │                           :4440                                     │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────┐      │
//! │  │  Market Data    │  │  DCF            │  │  Report         │      │
//! │  │  (Yahoo)        │─▶│  Pipeline       │─▶│  (text / xlsx)  │      │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────┘      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `dcf` module is pure computation; `routes` and the `simple-dcf`
//! binary are thin layers that call it and render its `Result`.

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod data;
pub mod dcf;
pub mod error;
pub mod report;
pub mod routes;

use anyhow::Result;
use axum::http::StatusCode;
use axum::Router;
use dcf_common::config::{Config, MarketDataConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

use crate::data::{MarketDataSource, YahooFinanceAdapter};
use crate::dcf::DcfAnalyzer;

/// Maximum accepted request body (the API only takes small JSON documents).
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Sequential upstream calls per analysis: statement, share count, price.
const UPSTREAM_CALLS_PER_ANALYSIS: u64 = 3;

const ANALYSIS_SLACK_SECS: u64 = 2;

/// Headroom between the analysis budget and the outer request timeout, so a
/// slow analysis ends as a JSON error rather than a bare 408.
const REQUEST_SLACK_SECS: u64 = 5;

/// Time allowed for one full analysis: every upstream call at its own
/// timeout, plus slack.
pub fn analysis_budget(config: &MarketDataConfig) -> Duration {
    Duration::from_secs(
        config
            .timeout_secs
            .saturating_mul(UPSTREAM_CALLS_PER_ANALYSIS)
            .saturating_add(ANALYSIS_SLACK_SECS),
    )
}

/// Shared service state
pub struct AppState {
    /// Configuration
    pub config: Config,
    /// Analyzer bound to the market data source
    pub analyzer: DcfAnalyzer,
    /// Deadline for one analysis, upstream fetches included
    pub analysis_timeout: Duration,
}

impl AppState {
    /// Create state backed by Yahoo Finance
    pub fn new(config: Config) -> Self {
        let source = Arc::new(YahooFinanceAdapter::from_config(&config.market_data));
        Self::with_source(config, source)
    }

    /// Create state backed by an arbitrary market data source
    pub fn with_source(config: Config, source: Arc<dyn MarketDataSource>) -> Self {
        Self {
            analysis_timeout: analysis_budget(&config.market_data),
            config,
            analyzer: DcfAnalyzer::new(source),
        }
    }

    /// Override the analysis deadline
    pub fn with_analysis_timeout(mut self, timeout: Duration) -> Self {
        self.analysis_timeout = timeout;
        self
    }
}

/// Build the full application with middleware.
pub fn build_app(state: Arc<AppState>) -> Router {
    let timeout = state.analysis_timeout + Duration::from_secs(REQUEST_SLACK_SECS);
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    routes::router(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout))
        .layer(cors)
}

/// HTTP valuation service
pub struct DcfService {
    state: Arc<AppState>,
}

impl DcfService {
    /// Create a new service
    pub fn new(config: Config) -> Self {
        Self {
            state: Arc::new(AppState::new(config)),
        }
    }

    /// Bind and serve until Ctrl-C.
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = self.state.config.bind_address().parse()?;
        let app = build_app(self.state.clone());

        tracing::info!(
            address = %addr,
            source = self.state.analyzer.source_name(),
            "Starting HTTP server"
        );

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
