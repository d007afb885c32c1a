//! SIP errors

use std::fmt;
use thiserror::Error;

/// Error kind without the detail payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    LineTooLong,
    MalformedStartLine,
    MalformedHeader,
    InvalidResponseCode,
    BufferTooSmall,
    NullInput,
    InvalidMessage,
    Config,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::LineTooLong => "line too long",
            ErrorKind::MalformedStartLine => "malformed start line",
            ErrorKind::MalformedHeader => "malformed header",
            ErrorKind::InvalidResponseCode => "invalid response code",
            ErrorKind::BufferTooSmall => "buffer too small",
            ErrorKind::NullInput => "missing input",
            ErrorKind::InvalidMessage => "invalid message",
            ErrorKind::Config => "configuration error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SipError {
    #[error("Line too long: exceeds {limit} bytes")]
    LineTooLong { limit: usize },

    #[error("Malformed start line: {0}")]
    MalformedStartLine(String),

    #[error("Malformed header: {0}")]
    MalformedHeader(String),

    #[error("Invalid response code: {0} (must be within 100..=699)")]
    InvalidResponseCode(u16),

    #[error("Buffer too small: {required} bytes required, {available} available")]
    BufferTooSmall { required: usize, available: usize },

    #[error("Missing input: {0}")]
    NullInput(&'static str),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SipError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SipError::LineTooLong { .. } => ErrorKind::LineTooLong,
            SipError::MalformedStartLine(_) => ErrorKind::MalformedStartLine,
            SipError::MalformedHeader(_) => ErrorKind::MalformedHeader,
            SipError::InvalidResponseCode(_) => ErrorKind::InvalidResponseCode,
            SipError::BufferTooSmall { .. } => ErrorKind::BufferTooSmall,
            SipError::NullInput(_) => ErrorKind::NullInput,
            SipError::InvalidMessage(_) => ErrorKind::InvalidMessage,
            SipError::Config(_) => ErrorKind::Config,
        }
    }

    /// True for errors raised while parsing wire input
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::LineTooLong
                | ErrorKind::MalformedStartLine
                | ErrorKind::MalformedHeader
                | ErrorKind::InvalidResponseCode
        )
    }
}

impl From<::config::ConfigError> for SipError {
    fn from(err: ::config::ConfigError) -> Self {
        SipError::Config(err.to_string())
    }
}
