//! Infrastructure layer - Technical implementations
//!
//! This layer contains:
//! - The SIP wire codec (line assembly, parser, serializer)

pub mod protocols;
