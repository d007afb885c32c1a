//! SIP result type

use super::error::SipError;

/// Standard result type for message and serde operations
pub type Result<T> = std::result::Result<T, SipError>;
