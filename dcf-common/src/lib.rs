//! DCF Common - shared configuration, validation and logging for the
//! Simple DCF workspace.
//!
//! This crate provides:
//! - Configuration types and loading (`~/.simple-dcf/config.json` + `DCF_*` env)
//! - Configuration validation
//! - Logging setup

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod logging;
pub mod validation;

pub use config::{
    Config, ExportConfig, MarketDataConfig, ObservabilityConfig, ServerConfig, TerminalBase,
    ValuationDefaults,
};
pub use validation::{Validate, ValidationError, ValidationResult, GROWTH_RATE_RANGE, RATE_RANGE};

