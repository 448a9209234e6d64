//! Configuration management for the Simple DCF services.
//!
//! The service and CLI share a single configuration file at
//! `~/.simple-dcf/config.json`.
//!
//! # Configuration Priority
//!
//! 1. Environment variables (DCF_* prefix)
//! 2. Explicit config file values
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! - `DCF_HOST` → server.host
//! - `DCF_PORT` → server.port
//! - `DCF_LOG_LEVEL` → observability.log_level
//! - `DCF_LOG_FORMAT` → observability.log_format
//! - `DCF_MARKET_DATA_URL` → market_data.base_url
//! - `DCF_CHART_URL` → market_data.chart_base_url
//! - `DCF_TIMEOUT_SECS` → market_data.timeout_secs
//! - `DCF_EXPORT_DIR` → export.output_dir

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".simple-dcf"),
        |dirs| dirs.home_dir().join(".simple-dcf"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

// ============================================================================
// Server Configuration
// ============================================================================

/// HTTP server configuration for the interactive form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address. Default: "127.0.0.1" (local only)
    #[serde(default = "default_host")]
    pub host: String,

    /// Port number
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

// ============================================================================
// Market Data Configuration
// ============================================================================

/// Market data source configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketDataConfig {
    /// Base URL for the fundamentals time-series API
    #[serde(default = "default_market_data_url")]
    pub base_url: String,

    /// Base URL for the chart (price history) API
    #[serde(default = "default_chart_url")]
    pub chart_base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User-Agent header sent with every request.
    /// The upstream rejects requests without a browser-like agent.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// How many years of statements to request
    #[serde(default = "default_lookback_years")]
    pub lookback_years: u32,
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            base_url: default_market_data_url(),
            chart_base_url: default_chart_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            lookback_years: default_lookback_years(),
        }
    }
}

// ============================================================================
// Valuation Defaults
// ============================================================================

/// Which cash flow seeds the Gordon-growth terminal value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerminalBase {
    /// Final projected cash flow (standard DCF convention)
    #[default]
    Projected,
    /// Last historical cash flow
    Historical,
}

impl TerminalBase {
    /// Parse from a user-facing string ("projected", "historical").
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "projected" | "last_projected" => Some(Self::Projected),
            "historical" | "last_historical" => Some(Self::Historical),
            _ => None,
        }
    }
}

impl fmt::Display for TerminalBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Projected => write!(f, "projected"),
            Self::Historical => write!(f, "historical"),
        }
    }
}

/// Default assumptions pre-filled in the form and used by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationDefaults {
    /// Default ticker symbol
    #[serde(default = "default_ticker")]
    pub ticker: String,

    /// Projected FCF growth rate (fraction)
    #[serde(default = "default_growth_rate")]
    pub growth_rate: f64,

    /// Required rate of return (fraction)
    #[serde(default = "default_required_rate")]
    pub required_rate: f64,

    /// Perpetual growth rate (fraction)
    #[serde(default = "default_perpetual_rate")]
    pub perpetual_rate: f64,

    /// Terminal value seed
    #[serde(default)]
    pub terminal_base: TerminalBase,
}

impl Default for ValuationDefaults {
    fn default() -> Self {
        Self {
            ticker: default_ticker(),
            growth_rate: default_growth_rate(),
            required_rate: default_required_rate(),
            perpetual_rate: default_perpetual_rate(),
            terminal_base: TerminalBase::default(),
        }
    }
}

// ============================================================================
// Export Configuration
// ============================================================================

/// Spreadsheet export configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Directory the CLI writes workbooks into
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
        }
    }
}

// ============================================================================
// Observability Configuration
// ============================================================================

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level", alias = "level")]
    pub log_level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format", alias = "format")]
    pub log_format: String,

    /// Additional module targets to pin at `warn`.
    #[serde(default)]
    pub excluded_targets: Vec<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            excluded_targets: Vec::new(),
        }
    }
}

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub market_data: MarketDataConfig,

    #[serde(default)]
    pub defaults: ValuationDefaults,

    #[serde(default)]
    pub export: ExportConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// A missing file is not an error; defaults are used instead.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            tracing::info!("Config file not found, using defaults");
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Load configuration with environment variable overrides.
    pub fn load_with_env() -> Result<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup.
    ///
    /// Unparseable numeric values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("DCF_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("DCF_PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(level) = lookup("DCF_LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Some(format) = lookup("DCF_LOG_FORMAT") {
            self.observability.log_format = format;
        }
        if let Some(url) = lookup("DCF_MARKET_DATA_URL") {
            self.market_data.base_url = url;
        }
        if let Some(url) = lookup("DCF_CHART_URL") {
            self.market_data.chart_base_url = url;
        }
        if let Some(secs) = lookup("DCF_TIMEOUT_SECS").and_then(|s| s.parse().ok()) {
            self.market_data.timeout_secs = secs;
        }
        if let Some(dir) = lookup("DCF_EXPORT_DIR") {
            self.export.output_dir = PathBuf::from(dir);
        }
    }

    /// Socket address string for the HTTP server.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    4440
}
fn default_market_data_url() -> String {
    "https://query2.finance.yahoo.com".into()
}
fn default_chart_url() -> String {
    "https://query1.finance.yahoo.com".into()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36"
        .into()
}
fn default_lookback_years() -> u32 {
    10
}
fn default_ticker() -> String {
    "AAPL".into()
}
fn default_growth_rate() -> f64 {
    0.05
}
fn default_required_rate() -> f64 {
    0.1
}
fn default_perpetual_rate() -> f64 {
    0.02
}
fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}
fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "pretty".into()
}
