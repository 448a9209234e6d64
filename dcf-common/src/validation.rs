//! Configuration validation.
//!
//! Checks that configured values are present and inside the ranges the
//! form accepts, before any service starts.

use thiserror::Error;

use crate::config::{Config, MarketDataConfig, ObservabilityConfig, ServerConfig, ValuationDefaults};

/// Inclusive range accepted for the projected growth rate.
pub const GROWTH_RATE_RANGE: (f64, f64) = (0.0, 10.0);

/// Inclusive range accepted for the required and perpetual rates.
pub const RATE_RANGE: (f64, f64) = (0.0, 1.0);

/// Configuration validation error.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid port {port}: must be between 1 and 65535")]
    InvalidPort { port: u16, field: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Multiple validation errors: {0:?}")]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Trait for validatable configuration sections.
pub trait Validate {
    /// Validate this configuration section.
    fn validate(&self) -> ValidationResult<()>;
}

impl Config {
    /// Validate the entire configuration.
    pub fn validate(&self) -> ValidationResult<()> {
        let mut errors: Vec<ValidationError> = [
            self.server.validate(),
            self.market_data.validate(),
            self.defaults.validate(),
            self.observability.validate(),
        ]
        .into_iter()
        .filter_map(Result::err)
        .collect();

        if errors.is_empty() {
            Ok(())
        } else if errors.len() == 1 {
            Err(errors.remove(0))
        } else {
            Err(ValidationError::Multiple(errors))
        }
    }

    /// Load (with environment overrides) and validate configuration.
    pub fn load_and_validate() -> anyhow::Result<Self> {
        let config = Self::load_with_env()?;
        config.validate().map_err(|e| anyhow::anyhow!("{}", e))?;
        Ok(config)
    }
}

impl Validate for ServerConfig {
    fn validate(&self) -> ValidationResult<()> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort {
                port: self.port,
                field: "server.port".into(),
            });
        }
        if self.host.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "server.host".into(),
            });
        }
        Ok(())
    }
}

impl Validate for MarketDataConfig {
    fn validate(&self) -> ValidationResult<()> {
        for (field, value) in [
            ("market_data.base_url", &self.base_url),
            ("market_data.chart_base_url", &self.chart_base_url),
        ] {
            if let Err(e) = url::Url::parse(value) {
                return Err(ValidationError::InvalidValue {
                    field: field.into(),
                    reason: e.to_string(),
                });
            }
        }

        if self.timeout_secs == 0 {
            return Err(ValidationError::InvalidValue {
                field: "market_data.timeout_secs".into(),
                reason: "must be greater than 0".into(),
            });
        }

        if self.lookback_years == 0 {
            return Err(ValidationError::InvalidValue {
                field: "market_data.lookback_years".into(),
                reason: "must be greater than 0".into(),
            });
        }

        Ok(())
    }
}

fn check_range(field: &str, value: f64, (min, max): (f64, f64)) -> ValidationResult<()> {
    if !value.is_finite() || value < min || value > max {
        return Err(ValidationError::InvalidValue {
            field: field.into(),
            reason: format!("must be between {} and {}", min, max),
        });
    }
    Ok(())
}

impl Validate for ValuationDefaults {
    fn validate(&self) -> ValidationResult<()> {
        if self.ticker.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "defaults.ticker".into(),
            });
        }
        check_range("defaults.growth_rate", self.growth_rate, GROWTH_RATE_RANGE)?;
        check_range("defaults.required_rate", self.required_rate, RATE_RANGE)?;
        check_range("defaults.perpetual_rate", self.perpetual_rate, RATE_RANGE)?;
        Ok(())
    }
}

impl Validate for ObservabilityConfig {
    fn validate(&self) -> ValidationResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ValidationError::InvalidValue {
                field: "observability.log_level".into(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            });
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.log_format.to_lowercase().as_str()) {
            return Err(ValidationError::InvalidValue {
                field: "observability.log_format".into(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            });
        }

        Ok(())
    }
}
