//! Error types for the NodeMCU bridge
//!
//! This module provides structured error handling with machine-readable
//! error codes, severity levels and logging integration. Every variant
//! carries owned text so a single poll outcome can be handed to every
//! caller waiting on it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Error types for bridge operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BridgeError {
    /// HTTP request could not be completed or returned a failure status
    #[error("HTTP request failed: {0}")]
    Transport(String),

    /// HTTP request exceeded the configured timeout
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Response body was not a JSON object
    #[error("Parsing error: {0}")]
    Parse(String),

    /// None of the configured characteristics were present in a response
    #[error("No valid value in device response from {0}")]
    EmptyResult(String),

    /// Characteristic name unknown to the host platform
    #[error("Unrecognized characteristic: {0}")]
    UnrecognizedCharacteristic(String),

    /// Service kind unknown to the host platform
    #[error("Service {0} not available yet")]
    UnsupportedService(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network discovery errors
    #[error("Discovery failed: {0}")]
    Discovery(String),

    /// Invalid input errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal errors (dropped channels, task failures)
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Structured error code for machine-readable error handling
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Connection errors (1000-1099)
    ConnectionTimeout,
    ConnectionFailed,

    // Configuration errors (1200-1299)
    ConfigurationInvalid,

    // Device errors (1300-1399)
    DeviceNoData,
    CharacteristicUnsupported,
    ServiceUnsupported,

    // Data errors (1400-1499)
    ParsingFailed,
    InvalidInput,

    // Network errors (1600-1699)
    DiscoveryFailed,

    // Internal errors (1900-1999)
    InternalError,
}

impl ErrorCode {
    /// Get numeric error code
    pub fn as_number(&self) -> u32 {
        match self {
            ErrorCode::ConnectionTimeout => 1001,
            ErrorCode::ConnectionFailed => 1002,
            ErrorCode::ConfigurationInvalid => 1201,
            ErrorCode::DeviceNoData => 1301,
            ErrorCode::CharacteristicUnsupported => 1302,
            ErrorCode::ServiceUnsupported => 1303,
            ErrorCode::ParsingFailed => 1401,
            ErrorCode::InvalidInput => 1402,
            ErrorCode::DiscoveryFailed => 1601,
            ErrorCode::InternalError => 1901,
        }
    }

    /// Get error category
    pub fn category(&self) -> &'static str {
        match self.as_number() {
            1000..=1099 => "connection",
            1200..=1299 => "configuration",
            1300..=1399 => "device",
            1400..=1499 => "data",
            1600..=1699 => "network",
            _ => "internal",
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Setup problem that leaves the bridge running with reduced function
    Warning,
    /// Operation failed
    Error,
    /// Bridge cannot start
    Critical,
}

impl BridgeError {
    /// Create a transport error
    pub fn transport<S: Into<String>>(msg: S) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a timeout error
    pub fn timeout<S: Into<String>>(msg: S) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create a parsing error
    pub fn parse<S: Into<String>>(msg: S) -> Self {
        Self::Parse(msg.into())
    }

    /// Create an empty-result error for the given endpoint
    pub fn empty_result<S: Into<String>>(endpoint: S) -> Self {
        Self::EmptyResult(endpoint.into())
    }

    /// Create an unrecognized characteristic error
    pub fn unrecognized_characteristic<S: Into<String>>(name: S) -> Self {
        Self::UnrecognizedCharacteristic(name.into())
    }

    /// Create an unsupported service error
    pub fn unsupported_service<S: Into<String>>(name: S) -> Self {
        Self::UnsupportedService(name.into())
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a discovery error
    pub fn discovery<S: Into<String>>(msg: S) -> Self {
        Self::Discovery(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Map BridgeError to structured error code
    pub fn to_error_code(&self) -> ErrorCode {
        match self {
            BridgeError::Transport(_) => ErrorCode::ConnectionFailed,
            BridgeError::Timeout(_) => ErrorCode::ConnectionTimeout,
            BridgeError::Parse(_) => ErrorCode::ParsingFailed,
            BridgeError::EmptyResult(_) => ErrorCode::DeviceNoData,
            BridgeError::UnrecognizedCharacteristic(_) => ErrorCode::CharacteristicUnsupported,
            BridgeError::UnsupportedService(_) => ErrorCode::ServiceUnsupported,
            BridgeError::Config(_) => ErrorCode::ConfigurationInvalid,
            BridgeError::Discovery(_) => ErrorCode::DiscoveryFailed,
            BridgeError::InvalidInput(_) => ErrorCode::InvalidInput,
            BridgeError::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            BridgeError::Config(_) => ErrorSeverity::Critical,
            BridgeError::UnrecognizedCharacteristic(_)
            | BridgeError::UnsupportedService(_)
            | BridgeError::Discovery(_) => ErrorSeverity::Warning,
            _ => ErrorSeverity::Error,
        }
    }

    /// Whether the next poll may succeed without any configuration change
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BridgeError::Transport(_) | BridgeError::Timeout(_) | BridgeError::EmptyResult(_)
        )
    }
}

impl From<reqwest::Error> for BridgeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BridgeError::Timeout(err.to_string())
        } else {
            BridgeError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::Parse(err.to_string())
    }
}

impl From<url::ParseError> for BridgeError {
    fn from(err: url::ParseError) -> Self {
        BridgeError::Config(format!("Invalid URL: {err}"))
    }
}

#[cfg(feature = "discovery")]
impl From<mdns_sd::Error> for BridgeError {
    fn from(err: mdns_sd::Error) -> Self {
        BridgeError::Discovery(err.to_string())
    }
}

/// Error logging and reporting utilities
pub struct ErrorReporter;

impl ErrorReporter {
    /// Log an error with its structured code at the matching severity
    pub fn log_error(error: &BridgeError, component: &str, operation: &str) {
        let code = error.to_error_code();

        match error.severity() {
            ErrorSeverity::Critical | ErrorSeverity::Error => {
                tracing::error!(
                    error_code = code.as_number(),
                    category = code.category(),
                    component,
                    operation,
                    retryable = error.is_retryable(),
                    "{}",
                    error
                );
            }
            ErrorSeverity::Warning => {
                tracing::warn!(
                    error_code = code.as_number(),
                    category = code.category(),
                    component,
                    operation,
                    "{}",
                    error
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_and_categories() {
        let error = BridgeError::timeout("http://sensor.local/ after 1000ms");
        assert_eq!(error.to_error_code(), ErrorCode::ConnectionTimeout);
        assert_eq!(error.to_error_code().as_number(), 1001);
        assert_eq!(error.to_error_code().category(), "connection");

        let error = BridgeError::empty_result("http://sensor.local/");
        assert_eq!(error.to_error_code().category(), "device");
        assert!(error.is_retryable());
    }

    #[test]
    fn test_setup_errors_are_warnings() {
        assert_eq!(
            BridgeError::unrecognized_characteristic("Bogus").severity(),
            ErrorSeverity::Warning
        );
        assert_eq!(
            BridgeError::unsupported_service("Toaster").severity(),
            ErrorSeverity::Warning
        );
        assert_eq!(
            BridgeError::config("missing url").severity(),
            ErrorSeverity::Critical
        );
        assert!(!BridgeError::parse("expected value").is_retryable());
    }

    #[test]
    fn test_json_error_conversion() {
        let err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let converted: BridgeError = err.into();
        assert!(matches!(converted, BridgeError::Parse(_)));
    }

    #[test]
    fn test_display_messages() {
        assert_eq!(
            BridgeError::unsupported_service("Toaster").to_string(),
            "Service Toaster not available yet"
        );
        assert_eq!(
            BridgeError::empty_result("http://10.0.0.2/").to_string(),
            "No valid value in device response from http://10.0.0.2/"
        );
    }
}
