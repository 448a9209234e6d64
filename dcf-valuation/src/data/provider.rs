//! Data source abstraction for the valuation pipeline.
//!
//! Defines the `MarketDataSource` trait that every upstream must implement,
//! so the analyzer can run against Yahoo Finance in production and an
//! in-memory source in tests.

use async_trait::async_trait;
use std::fmt;

use super::{CashFlowStatement, MarketSnapshot};

// ============================================================================
// Provider Error
// ============================================================================

/// Errors specific to data sources.
#[derive(Debug, Clone)]
pub enum ProviderError {
    /// Network error (connection failed, timeout)
    Network(String),
    /// Authentication/consent rejected by the upstream
    Auth(String),
    /// Rate limit exceeded
    RateLimited { retry_after_secs: Option<u64> },
    /// Data not available for the requested ticker
    DataNotAvailable(String),
    /// Upstream is temporarily unavailable (5xx)
    Unavailable(String),
    /// Unexpected payload or internal failure
    Internal(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(msg) => write!(f, "Network error: {}", msg),
            Self::Auth(msg) => write!(f, "Authentication error: {}", msg),
            Self::RateLimited { retry_after_secs } => {
                write!(f, "Rate limited")?;
                if let Some(secs) = retry_after_secs {
                    write!(f, ", retry after {} seconds", secs)?;
                }
                Ok(())
            }
            Self::DataNotAvailable(msg) => write!(f, "Data not available: {}", msg),
            Self::Unavailable(msg) => write!(f, "Provider unavailable: {}", msg),
            Self::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ProviderError {}

impl ProviderError {
    /// Whether the failure means the ticker/data does not exist, as opposed
    /// to the upstream being unreachable.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::DataNotAvailable(_))
    }
}

// ============================================================================
// Market Data Source Trait
// ============================================================================

/// Trait for market data sources.
///
/// Each call is a single attempt; callers surface failures rather than retry.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Source name (e.g., "yahoo")
    fn name(&self) -> &'static str;

    /// Fetch the historical cash-flow statement for a ticker.
    async fn cash_flow_statement(&self, ticker: &str) -> Result<CashFlowStatement, ProviderError>;

    /// Fetch the current number of shares outstanding.
    async fn shares_outstanding(&self, ticker: &str) -> Result<f64, ProviderError>;

    /// Fetch the latest traded price (last intraday close).
    async fn latest_price(&self, ticker: &str) -> Result<f64, ProviderError>;

    /// Fetch all three inputs.
    ///
    /// Default implementation calls the three methods in order and stops at
    /// the first failure.
    async fn snapshot(&self, ticker: &str) -> Result<MarketSnapshot, ProviderError> {
        let statement = self.cash_flow_statement(ticker).await?;
        let shares_outstanding = self.shares_outstanding(ticker).await?;
        let current_price = self.latest_price(ticker).await?;

        Ok(MarketSnapshot {
            ticker: ticker.to_string(),
            statement,
            shares_outstanding,
            current_price,
        })
    }
}
