//! SipSerde - incremental SIP message parsing and serialization
//!
//! The domain layer holds the message model ([`SipMessage`], headers,
//! start lines), the infrastructure layer the streaming codec
//! ([`SipSerde`]) that turns arbitrarily chunked wire bytes into messages
//! and messages back into wire bytes.

pub mod config;
pub mod domain;
pub mod infrastructure;

// Re-export commonly used types
pub use crate::config::{Config, SerdeConfig};
pub use crate::domain::message::{
    CSeq, HeaderStore, MessagePool, MessageType, SipMessage, StartLine,
};
pub use crate::domain::shared::error::{ErrorKind, SipError};
pub use crate::domain::shared::result::Result;
pub use crate::infrastructure::protocols::sip::{ParseState, SerdeState, SerdeStats, SipSerde};
