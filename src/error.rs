//! Error types for link decoding
//!
//! - **InvalidFormat**: Wrong scheme or malformed link structure.
//! - **InvalidField**: Structurally invalid field value (e.g. non-integer port).
//! - **JsonParseError** / **UrlParseError**: Failures from the JSON or generic URI parsers.
//!
//! A link that decodes but lacks data needed for rendering is not an error; the
//! builder yields an empty document instead.

use std::fmt;

/// Result type for link decoding operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors that can occur while decoding a link
#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolError {
    /// Invalid link format (e.g. wrong scheme prefix)
    InvalidFormat(String),
    /// JSON parsing error (WireGuard JSON form)
    JsonParseError(String),
    /// Generic URI parsing error
    UrlParseError(String),
    /// Invalid field value (e.g. port not an integer)
    InvalidField(String),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::InvalidFormat(msg) => write!(f, "Invalid format: {}", msg),
            ProtocolError::JsonParseError(msg) => write!(f, "JSON parse error: {}", msg),
            ProtocolError::UrlParseError(msg) => write!(f, "URL parse error: {}", msg),
            ProtocolError::InvalidField(msg) => write!(f, "Invalid field value: {}", msg),
        }
    }
}

impl std::error::Error for ProtocolError {}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        ProtocolError::JsonParseError(err.to_string())
    }
}

impl From<url::ParseError> for ProtocolError {
    fn from(err: url::ParseError) -> Self {
        match err {
            url::ParseError::InvalidPort => ProtocolError::InvalidField(format!(
                "{}: {}",
                crate::constants::error_msg::INVALID_PORT,
                err
            )),
            other => ProtocolError::UrlParseError(other.to_string()),
        }
    }
}
