//! ═══════════════════════════════════════════════════════════════════════════════
//! ERROR — Unified Error Type for the HUD
//! ═══════════════════════════════════════════════════════════════════════════════
//! The simulators cannot fail. Everything fallible (configuration, the AI
//! gateway, file I/O) reports through `JarvisError`.
//! ═══════════════════════════════════════════════════════════════════════════════

use std::fmt;

/// The unified error type for the jarvis crate
#[derive(Debug)]
pub enum JarvisError {
    /// I/O error (config file, image frames, audio output)
    Io(std::io::Error),
    /// JSON serialization/deserialization error
    Json(serde_json::Error),
    /// Configuration error
    Config(ConfigError),
    /// Validation error (invariant or input check)
    Validation(ValidationError),
    /// AI gateway failure
    Gateway(GatewayError),
    /// Internal error (should not happen)
    Internal(String),
}

impl std::error::Error for JarvisError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            JarvisError::Io(e) => Some(e),
            JarvisError::Json(e) => Some(e),
            JarvisError::Gateway(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for JarvisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JarvisError::Io(e) => write!(f, "I/O error: {}", e),
            JarvisError::Json(e) => write!(f, "JSON error: {}", e),
            JarvisError::Config(e) => write!(f, "Configuration error: {}", e),
            JarvisError::Validation(e) => write!(f, "Validation error: {}", e),
            JarvisError::Gateway(e) => write!(f, "Gateway error: {}", e),
            JarvisError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl From<std::io::Error> for JarvisError {
    fn from(err: std::io::Error) -> Self {
        JarvisError::Io(err)
    }
}

impl From<serde_json::Error> for JarvisError {
    fn from(err: serde_json::Error) -> Self {
        JarvisError::Json(err)
    }
}

/// Configuration-specific errors
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// Missing required field
    MissingField(String),
    /// Invalid value
    InvalidValue { field: String, message: String },
    /// File not found
    FileNotFound(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingField(field) => write!(f, "Missing required field: {}", field),
            ConfigError::InvalidValue { field, message } => {
                write!(f, "Invalid value for '{}': {}", field, message)
            }
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {}", path),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for JarvisError {
    fn from(err: ConfigError) -> Self {
        JarvisError::Config(err)
    }
}

/// Validation-specific errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    /// Input validation failed
    InvalidInput { field: String, message: String },
    /// Constraint violation
    ConstraintViolation(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidInput { field, message } => {
                write!(f, "Invalid input for '{}': {}", field, message)
            }
            ValidationError::ConstraintViolation(msg) => write!(f, "Constraint violation: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for JarvisError {
    fn from(err: ValidationError) -> Self {
        JarvisError::Validation(err)
    }
}

/// Marker the upstream API puts in the message when the credential is unknown
pub const ENTITY_NOT_FOUND: &str = "Requested entity was not found.";

/// AI gateway errors
#[derive(Debug, Clone)]
pub enum GatewayError {
    /// No API key configured
    ApiKeyMissing,
    /// Upstream answered with a non-success status
    Upstream { status: u16, message: String },
    /// Request never completed (DNS, TLS, timeout, ...)
    Transport(String),
    /// Response body or payload could not be decoded
    Decode(String),
    /// Decoded audio could not be played back
    Playback(String),
}

impl GatewayError {
    /// True when the upstream rejected the credential itself
    pub fn is_credential_rejected(&self) -> bool {
        match self {
            GatewayError::Upstream { message, .. } => message.contains(ENTITY_NOT_FOUND),
            _ => false,
        }
    }
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::ApiKeyMissing => write!(f, "API_KEY_MISSING"),
            GatewayError::Upstream { status, message } => {
                write!(f, "upstream error ({}): {}", status, message)
            }
            GatewayError::Transport(msg) => write!(f, "transport error: {}", msg),
            GatewayError::Decode(msg) => write!(f, "decode error: {}", msg),
            GatewayError::Playback(msg) => write!(f, "playback error: {}", msg),
        }
    }
}

impl std::error::Error for GatewayError {}

impl From<GatewayError> for JarvisError {
    fn from(err: GatewayError) -> Self {
        JarvisError::Gateway(err)
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            GatewayError::Decode(err.to_string())
        } else {
            GatewayError::Transport(err.to_string())
        }
    }
}

/// Type alias for Result with JarvisError
pub type JarvisResult<T> = Result<T, JarvisError>;

/// Type alias for gateway results
pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = JarvisError::Config(ConfigError::InvalidValue {
            field: "anomaly.tick_ms".to_string(),
            message: "must be positive".to_string(),
        });
        assert!(err.to_string().contains("anomaly.tick_ms"));

        let err = JarvisError::Gateway(GatewayError::ApiKeyMissing);
        assert!(err.to_string().contains("API_KEY_MISSING"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: JarvisError = io_err.into();
        assert!(matches!(err, JarvisError::Io(_)));
    }

    #[test]
    fn test_credential_rejection() {
        let err = GatewayError::Upstream {
            status: 404,
            message: "Requested entity was not found.".to_string(),
        };
        assert!(err.is_credential_rejected());

        let err = GatewayError::Upstream {
            status: 500,
            message: "Internal error".to_string(),
        };
        assert!(!err.is_credential_rejected());
        assert!(!GatewayError::ApiKeyMissing.is_credential_rejected());
    }
}
