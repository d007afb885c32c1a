//! Shared kernel - error taxonomy and text helpers used across the crate

pub mod error;
pub mod result;
pub mod text;

pub use error::{ErrorKind, SipError};
pub use result::Result;
