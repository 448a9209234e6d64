//! Error types for the valuation pipeline.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use crate::data::ProviderError;

/// Result type alias using the pipeline error type.
pub type Result<T> = std::result::Result<T, DcfError>;

/// Failures surfaced to the user by an analysis run.
#[derive(Error, Debug)]
pub enum DcfError {
    /// Unknown ticker or missing statement line item
    #[error("Not found: {0}")]
    NotFound(String),

    /// Too few usable historical periods
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Assumptions that make the valuation undefined (e.g. required rate <= perpetual rate)
    #[error("Invalid assumption: {0}")]
    InvalidAssumption(String),

    /// Malformed user input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Market data source failed or is unreachable
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Workbook serialization or file write failed
    #[error("Export failed: {0}")]
    Export(String),
}

impl DcfError {
    /// Stable machine-readable kind, used in API error bodies.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::InsufficientData(_) => "insufficient_data",
            Self::InvalidAssumption(_) => "invalid_assumption",
            Self::InvalidInput(_) => "invalid_input",
            Self::UpstreamUnavailable(_) => "upstream_unavailable",
            Self::Export(_) => "export_failed",
        }
    }

    /// Get HTTP status code for this error.
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::InsufficientData(_) | Self::InvalidAssumption(_) => 422,
            Self::InvalidInput(_) => 400,
            Self::UpstreamUnavailable(_) => 502,
            Self::Export(_) => 500,
        }
    }
}

impl From<ProviderError> for DcfError {
    fn from(err: ProviderError) -> Self {
        if err.is_not_found() {
            Self::NotFound(err.to_string())
        } else {
            Self::UpstreamUnavailable(err.to_string())
        }
    }
}

impl From<std::io::Error> for DcfError {
    fn from(err: std::io::Error) -> Self {
        Self::Export(err.to_string())
    }
}

impl From<zip::result::ZipError> for DcfError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::Export(err.to_string())
    }
}

/// API error body.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: &'static str,
    pub message: String,
}

impl From<&DcfError> for ApiError {
    fn from(err: &DcfError) -> Self {
        Self {
            error: err.kind(),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for DcfError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, axum::Json(ApiError::from(&self))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(DcfError::NotFound("x".into()).status_code(), 404);
        assert_eq!(DcfError::InsufficientData("x".into()).status_code(), 422);
        assert_eq!(DcfError::InvalidAssumption("x".into()).status_code(), 422);
        assert_eq!(DcfError::InvalidInput("x".into()).status_code(), 400);
        assert_eq!(DcfError::UpstreamUnavailable("x".into()).status_code(), 502);
        assert_eq!(DcfError::Export("x".into()).status_code(), 500);
    }

    #[test]
    fn test_provider_error_conversion() {
        let err: DcfError = ProviderError::DataNotAvailable("ZZZZ".into()).into();
        assert!(matches!(err, DcfError::NotFound(_)));

        let err: DcfError = ProviderError::Network("timeout".into()).into();
        assert!(matches!(err, DcfError::UpstreamUnavailable(_)));

        let err: DcfError = ProviderError::RateLimited { retry_after_secs: None }.into();
        assert_eq!(err.kind(), "upstream_unavailable");
    }

    #[test]
    fn test_error_into_response() {
        let response = DcfError::InvalidInput("empty ticker".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = DcfError::UpstreamUnavailable("down".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_api_error_body() {
        let body = ApiError::from(&DcfError::NotFound("ZZZZ".into()));
        assert_eq!(body.error, "not_found");
        assert_eq!(body.message, "Not found: ZZZZ");
    }
}
