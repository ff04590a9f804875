//! Error types for the Loxone MCP server
//!
//! Every failure the dispatch engine can encounter is a variant of
//! [`LoxoneError`]. Address and configuration errors are fatal at startup;
//! everything else is recovered at the tool/resource boundary into a failure
//! result and logged through [`ErrorReporter`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for Loxone operations
pub type Result<T> = std::result::Result<T, LoxoneError>;

/// Error taxonomy for the dispatch engine and its backend adapter
#[derive(Error, Debug)]
pub enum LoxoneError {
    /// Blank connection address
    #[error("Address cannot be empty or blank")]
    EmptyAddress,

    /// Address matches none of the supported shapes
    #[error("Invalid address format: {0}")]
    InvalidAddressFormat(String),

    /// A required tool argument was not supplied
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    /// Room, category or device type with zero matches
    #[error("{0}")]
    NotFound(String),

    /// Any I/O or protocol failure talking to the Miniserver
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Configuration references a handler tag the engine does not implement
    #[error("Unknown handler type: {0}")]
    UnknownHandlerKind(String),

    /// The Miniserver rejected a command (non-200 `LL.Code`)
    #[error("Device control error: {0}")]
    DeviceControl(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// MCP session could not be set up or ended abnormally
    #[error("Transport error: {0}")]
    Transport(String),

    /// JSON parsing errors
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Generic I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for LoxoneError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::BackendUnavailable(format!("Request timed out: {err}"))
        } else if err.is_connect() {
            Self::BackendUnavailable(format!("Connection failed: {err}"))
        } else {
            Self::BackendUnavailable(format!("HTTP request failed: {err}"))
        }
    }
}

/// Structured error code for machine-readable error handling
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Connection errors (1000-1099)
    BackendUnavailable,

    // Configuration errors (1200-1299)
    ConfigurationInvalid,
    AddressInvalid,
    HandlerUnknown,

    // Device errors (1300-1399)
    NotFound,
    DeviceControlFailed,

    // Data errors (1400-1499)
    ParsingFailed,
    InvalidInput,
    ParameterMissing,

    // Internal errors (1900-1999)
    InternalError,
}

impl ErrorCode {
    /// Get numeric error code
    pub fn as_number(&self) -> u32 {
        match self {
            ErrorCode::BackendUnavailable => 1001,
            ErrorCode::ConfigurationInvalid => 1201,
            ErrorCode::AddressInvalid => 1202,
            ErrorCode::HandlerUnknown => 1203,
            ErrorCode::NotFound => 1301,
            ErrorCode::DeviceControlFailed => 1302,
            ErrorCode::ParsingFailed => 1401,
            ErrorCode::InvalidInput => 1402,
            ErrorCode::ParameterMissing => 1403,
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
            1900..=1999 => "internal",
            _ => "unknown",
        }
    }
}

/// Error severity levels for logging
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Caller mistake, recovered locally
    Info,
    /// Transient condition
    Warning,
    /// Error condition
    Error,
    /// Configuration/implementation mismatch
    Critical,
}

impl LoxoneError {
    /// Create a backend-unavailable error
    pub fn backend<S: Into<String>>(msg: S) -> Self {
        Self::BackendUnavailable(msg.into())
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a device control error
    pub fn device_control<S: Into<String>>(msg: S) -> Self {
        Self::DeviceControl(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a missing-parameter error
    pub fn missing_parameter<S: Into<String>>(name: S) -> Self {
        Self::MissingParameter(name.into())
    }

    /// Create a not found error
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a transport error
    pub fn transport<S: Into<String>>(msg: S) -> Self {
        Self::Transport(msg.into())
    }

    /// Map LoxoneError to structured error code
    pub fn to_error_code(&self) -> ErrorCode {
        match self {
            LoxoneError::EmptyAddress | LoxoneError::InvalidAddressFormat(_) => {
                ErrorCode::AddressInvalid
            }
            LoxoneError::MissingParameter(_) => ErrorCode::ParameterMissing,
            LoxoneError::NotFound(_) => ErrorCode::NotFound,
            LoxoneError::BackendUnavailable(_) => ErrorCode::BackendUnavailable,
            LoxoneError::UnknownHandlerKind(_) => ErrorCode::HandlerUnknown,
            LoxoneError::DeviceControl(_) => ErrorCode::DeviceControlFailed,
            LoxoneError::Config(_) => ErrorCode::ConfigurationInvalid,
            LoxoneError::InvalidInput(_) => ErrorCode::InvalidInput,
            LoxoneError::Json(_) | LoxoneError::Yaml(_) => ErrorCode::ParsingFailed,
            LoxoneError::Io(_) | LoxoneError::Transport(_) => ErrorCode::InternalError,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            LoxoneError::MissingParameter(_)
            | LoxoneError::NotFound(_)
            | LoxoneError::InvalidInput(_) => ErrorSeverity::Info,
            LoxoneError::BackendUnavailable(_) | LoxoneError::DeviceControl(_) => {
                ErrorSeverity::Warning
            }
            LoxoneError::UnknownHandlerKind(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }

    /// Check if error is retryable by the caller
    pub fn is_retryable(&self) -> bool {
        matches!(self, LoxoneError::BackendUnavailable(_))
    }
}

/// Error logging utilities
pub struct ErrorReporter;

impl ErrorReporter {
    /// Log an error with a severity matching its kind
    pub fn log_error(error: &LoxoneError, component: &str, operation: &str) {
        let code = error.to_error_code();
        match error.severity() {
            ErrorSeverity::Critical => {
                tracing::error!(
                    error_code = code.as_number(),
                    category = code.category(),
                    component,
                    operation,
                    "Configuration/implementation mismatch: {error}"
                );
            }
            ErrorSeverity::Error => {
                tracing::error!(
                    error_code = code.as_number(),
                    category = code.category(),
                    component,
                    operation,
                    "Error occurred: {error}"
                );
            }
            ErrorSeverity::Warning => {
                tracing::warn!(
                    error_code = code.as_number(),
                    category = code.category(),
                    component,
                    operation,
                    retryable = error.is_retryable(),
                    "Warning: {error}"
                );
            }
            ErrorSeverity::Info => {
                tracing::info!(
                    error_code = code.as_number(),
                    category = code.category(),
                    component,
                    operation,
                    "Request rejected: {error}"
                );
            }
        }
    }
}
