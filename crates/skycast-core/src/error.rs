//! Centralized error types for the Skycast application.
//!
//! This module provides a typed error hierarchy that:
//! - Enables precise error handling throughout the codebase
//! - Provides user-friendly messages suitable for UI display
//! - Preserves full error context for debugging/logging

use chrono::NaiveDate;
use thiserror::Error;

/// Top-level application error type.
///
/// All errors in the Skycast application should be convertible to this type.
/// Use `user_message()` to get a UI-appropriate message.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Location error: {0}")]
    Location(#[from] LocationError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Returns a user-friendly message suitable for display in the UI.
    ///
    /// These messages are designed to be actionable and non-technical.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Fetch(e) => e.user_message(),
            AppError::Location(e) => e.user_message(),
            AppError::Config(e) => e.user_message(),
            AppError::Io(_) => "A file operation failed. Please try again.",
            AppError::Other(_) => "An unexpected error occurred. Please try again.",
        }
    }
}

/// Errors from remote HTTP fetches (weather, geocoding, predictor).
///
/// The variants mirror the retry policy: `NetworkUnreachable` and
/// `ServerTransient` are retryable, everything else surfaces immediately.
#[derive(Debug, Error)]
pub enum FetchError {
    /// No response was received at all (DNS, connect, timeout).
    #[error("Network unreachable: {0}")]
    NetworkUnreachable(String),

    /// 503/504-class status. The server exists but cannot answer right now.
    #[error("Server temporarily unavailable ({status})")]
    ServerTransient { status: u16 },

    /// Any other 4xx/5xx status. Retrying will not help.
    #[error("Server rejected request ({status}): {message}")]
    ServerRejected { status: u16, message: String },

    /// The response body did not match the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Requested date is not present in the fetched daily series.
    #[error("Date {0} is outside the forecast range")]
    DateOutOfRange(NaiveDate),

    /// The request was superseded by a newer one and cancelled.
    #[error("Request cancelled")]
    Cancelled,
}

impl FetchError {
    /// Whether the retry layer may try this request again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FetchError::NetworkUnreachable(_) | FetchError::ServerTransient { .. }
        )
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            FetchError::NetworkUnreachable(_) => {
                "Unable to connect. Check your internet connection."
            }
            FetchError::ServerTransient { .. } => {
                "The weather service is experiencing issues. Please try again later."
            }
            FetchError::ServerRejected { .. } => "The request failed. Please try again.",
            FetchError::InvalidResponse(_) => "Received an unexpected response. Please try again.",
            FetchError::DateOutOfRange(_) => "No forecast is available for that date.",
            FetchError::Cancelled => "The request was cancelled.",
        }
    }
}

/// Geolocation errors. All of these degrade to a fallback location
/// rather than blocking the view.
#[derive(Debug, Error)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Location service unavailable")]
    ServiceUnavailable,

    #[error("Location request timed out")]
    Timeout,

    #[error("Location error: {0}")]
    Other(String),
}

impl LocationError {
    pub fn user_message(&self) -> &'static str {
        match self {
            LocationError::PermissionDenied => {
                "Location access was denied. Showing the default location."
            }
            LocationError::ServiceUnavailable => {
                "Location services are unavailable. Showing the default location."
            }
            LocationError::Timeout => "Locating took too long. Showing the default location.",
            LocationError::Other(_) => "Could not determine your location.",
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
            ConfigError::ParseError(_) => "Configuration file is malformed. Check your settings.",
        }
    }
}

/// Extension trait for converting reqwest errors to our error types.
pub trait ReqwestErrorExt {
    fn into_fetch_error(self) -> FetchError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_fetch_error(self) -> FetchError {
        if self.is_timeout() || self.is_connect() {
            FetchError::NetworkUnreachable(self.to_string())
        } else if let Some(status) = self.status() {
            classify_status(status.as_u16(), self.to_string())
        } else if self.is_decode() {
            FetchError::InvalidResponse(self.to_string())
        } else {
            FetchError::NetworkUnreachable(self.to_string())
        }
    }
}

/// Classify an unsuccessful HTTP status into the fetch taxonomy.
pub fn classify_status(status: u16, message: String) -> FetchError {
    match status {
        503 | 504 => FetchError::ServerTransient { status },
        _ => FetchError::ServerRejected { status, message },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_statuses_are_retryable() {
        assert!(classify_status(503, String::new()).is_retryable());
        assert!(classify_status(504, String::new()).is_retryable());
    }

    #[test]
    fn rejected_statuses_are_not_retryable() {
        assert!(!classify_status(400, String::new()).is_retryable());
        assert!(!classify_status(404, String::new()).is_retryable());
        assert!(!classify_status(500, String::new()).is_retryable());
    }

    #[test]
    fn network_unreachable_is_retryable() {
        let err = FetchError::NetworkUnreachable("connection refused".into());
        assert!(err.is_retryable());
    }

    #[test]
    fn date_out_of_range_is_user_input() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let err = FetchError::DateOutOfRange(date);
        assert!(!err.is_retryable());
        assert!(err.user_message().contains("date"));
    }

    #[test]
    fn test_app_error_conversion() {
        let loc_err = LocationError::Timeout;
        let app_err: AppError = loc_err.into();
        assert!(matches!(app_err, AppError::Location(LocationError::Timeout)));
    }

    #[test]
    fn test_user_message_propagation() {
        let app_err = AppError::Fetch(FetchError::ServerTransient { status: 503 });
        assert_eq!(
            app_err.user_message(),
            "The weather service is experiencing issues. Please try again later."
        );
    }
}
