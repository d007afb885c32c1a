//! SIP wire codec
//!
//! Turns byte streams into [`SipMessage`](crate::domain::message::SipMessage)
//! values and back, for one connection at a time.
//!
//! Architecture:
//! ```text
//! ┌─────────────────────────┐
//! │    Transport Layer      │
//! │  (sockets, framing)     │
//! └───────────┬─────────────┘
//!             │ add_raw / pop_datum / serialize
//! ┌───────────▼─────────────┐
//! │       SipSerde          │
//! │ (residuum, statistics)  │
//! └───────────┬─────────────┘
//!             │
//! ┌───────────▼─────────────┐
//! │  MessageParser          │
//! │  Serializer             │
//! └───────────┬─────────────┘
//!             │
//! ┌───────────▼─────────────┐
//! │      LineBuffer         │
//! │  (CRLF line assembly)   │
//! └─────────────────────────┘
//! ```

pub mod line_buffer;
pub mod parser;
pub mod sip_serde;
pub mod serializer;

pub use line_buffer::{LineBuffer, LineState, MAX_LINE_LENGTH};
pub use parser::{MessageParser, ParseState, Progress};
pub use sip_serde::{SerdeState, SerdeStats, SipSerde};
