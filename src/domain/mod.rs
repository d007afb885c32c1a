//! Domain layer - SIP message model and shared kernel
//!
//! This layer contains:
//! - Entities: `SipMessage`
//! - Value Objects: start lines, `CSeq`, message type
//! - The header store and the message pool
//! - Shared error taxonomy

pub mod message;
pub mod shared;

// Re-export commonly used types
pub use shared::{Result, SipError};
