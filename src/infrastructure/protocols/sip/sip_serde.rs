//! SipSerde - per-connection SIP codec
//!
//! Feed raw chunks with [`SipSerde::add_raw`], collect finished messages with
//! [`SipSerde::pop_datum`]. Unconsumed bytes are kept as residuum and parsed
//! against the next message, so back-to-back messages in one chunk are all
//! delivered, one per `pop_datum` call.

use super::parser::{MessageParser, ParseState, Progress};
use super::serializer;
use crate::config::SerdeConfig;
use crate::domain::message::{MessagePool, SipMessage};
use crate::domain::shared::Result;
use bytes::{Bytes, BytesMut};
use tracing::{debug, info, warn};

/// Outcome of feeding a chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerdeState {
    /// Input consumed, no message complete yet
    Progress,
    /// A message is ready to be popped
    End,
}

/// Codec statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SerdeStats {
    pub messages_parsed: u64,
    pub parse_errors: u64,
    pub messages_lost: u64,
    pub bytes_received: u64,
    pub residuum_len: usize,
}

#[derive(Debug)]
pub struct SipSerde {
    config: SerdeConfig,
    parser: MessageParser,
    residuum: BytesMut,
    output: BytesMut,
    messages_parsed: u64,
    parse_errors: u64,
    messages_lost: u64,
    bytes_received: u64,
}

impl SipSerde {
    pub fn new() -> Self {
        Self::with_config(SerdeConfig::default())
    }

    pub fn with_config(config: SerdeConfig) -> Self {
        let parser = MessageParser::new(&config);
        let output = BytesMut::with_capacity(config.output_buffer_capacity);
        Self {
            config,
            parser,
            residuum: BytesMut::new(),
            output,
            messages_parsed: 0,
            parse_errors: 0,
            messages_lost: 0,
            bytes_received: 0,
        }
    }

    /// Use `pool` for messages built by the parser
    pub fn with_pool(mut self, pool: MessagePool) -> Self {
        self.parser.set_pool(pool);
        self
    }

    pub fn config(&self) -> &SerdeConfig {
        &self.config
    }

    pub fn state(&self) -> ParseState {
        self.parser.state()
    }

    /// Bytes received but not yet consumed by the parser
    pub fn residuum_len(&self) -> usize {
        self.residuum.len()
    }

    pub fn stats(&self) -> SerdeStats {
        SerdeStats {
            messages_parsed: self.messages_parsed,
            parse_errors: self.parse_errors,
            messages_lost: self.messages_lost,
            bytes_received: self.bytes_received,
            residuum_len: self.residuum.len(),
        }
    }

    /// Feed the next chunk of wire bytes.
    ///
    /// A message completed earlier but not popped is discarded. On error
    /// all buffered state, residuum included, is dropped.
    pub fn add_raw(&mut self, chunk: &[u8]) -> Result<SerdeState> {
        if chunk.is_empty() {
            return Ok(self.current_state());
        }

        if self.parser.state() == ParseState::Done {
            info!("Resetting SIP serde, SIP message lost");
            self.messages_lost += 1;
            self.parser.reset();
        }

        self.bytes_received += chunk.len() as u64;
        self.residuum.extend_from_slice(chunk);
        self.drive()
    }

    fn current_state(&self) -> SerdeState {
        match self.parser.state() {
            ParseState::Done => SerdeState::End,
            _ => SerdeState::Progress,
        }
    }

    fn drive(&mut self) -> Result<SerdeState> {
        match self.parser.advance(&mut self.residuum) {
            Ok(Progress::Complete) => {
                self.messages_parsed += 1;
                Ok(SerdeState::End)
            }
            Ok(Progress::Incomplete) => Ok(SerdeState::Progress),
            Err(e) => {
                self.parse_errors += 1;
                self.residuum.clear();
                Err(e)
            }
        }
    }

    /// Take the next finished message.
    ///
    /// If none is ready, buffered residuum is parsed first. A parse error
    /// there is returned and resets the codec.
    pub fn pop_datum(&mut self) -> Result<Option<SipMessage>> {
        if self.parser.state() != ParseState::Done && !self.residuum.is_empty() {
            debug!("Parsing {} bytes of residuum", self.residuum.len());
            self.drive()?;
        }
        Ok(self.parser.take_message())
    }

    /// Hand a popped message back to the pool, if one is configured
    pub fn release(&mut self, message: SipMessage) {
        self.parser.release(message);
    }

    /// Drop any partial or unpopped message and all buffered bytes
    pub fn clear_buffer(&mut self) {
        if self.parser.reset() {
            warn!("Clearing SIP serde, SIP message lost");
            self.messages_lost += 1;
        }
        self.residuum.clear();
    }

    /// Render `msg` to wire bytes
    pub fn serialize(&mut self, msg: &SipMessage) -> Result<Bytes> {
        serializer::encode(msg, &mut self.output)?;
        Ok(self.output.split().freeze())
    }

    /// Render `msg` into `out`; fails with `BufferTooSmall` without writing
    /// if it does not fit
    pub fn serialize_into(&self, msg: &SipMessage, out: &mut [u8]) -> Result<usize> {
        serializer::encode_into(msg, out)
    }

    /// Wire form as text, non-UTF-8 body bytes replaced
    pub fn to_string(&mut self, msg: &SipMessage) -> Result<String> {
        let bytes = self.serialize(msg)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl Default for SipSerde {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::message::MessageType;
    use crate::domain::shared::ErrorKind;

    #[test]
    fn test_request_example() {
        let mut serde = SipSerde::new();
        let state = serde.add_raw(b"INVITE sip:alburga.org SIP/2.0\r\n\r\n").unwrap();
        assert_eq!(state, SerdeState::End);

        let msg = serde.pop_datum().unwrap().unwrap();
        assert_eq!(msg.message_type(), MessageType::Request);
        assert_eq!(msg.method(), Some("INVITE"));
        assert_eq!(msg.uri(), Some("sip:alburga.org"));
        assert_eq!(msg.headers().len(), 1);
        assert_eq!(msg.header_get("Content-Length"), Some("0"));

        assert!(serde.pop_datum().unwrap().is_none());
    }

    #[test]
    fn test_response_with_body_example() {
        let mut serde = SipSerde::new();
        let state = serde
            .add_raw(b"SIP/2.0 200 OK\r\nContent-Length:2\r\nContent-Type:bor\r\n\r\nZZ")
            .unwrap();
        assert_eq!(state, SerdeState::End);

        let msg = serde.pop_datum().unwrap().unwrap();
        assert_eq!(msg.response_code(), Some(200));
        assert_eq!(msg.reason(), Some("OK"));
        assert_eq!(msg.header_get("Content-Type"), Some("bor"));
        assert_eq!(msg.header_get("Content-Length"), Some("2"));
        assert_eq!(&msg.body().unwrap()[..], b"ZZ");
    }

    #[test]
    fn test_malformed_example_resets() {
        let mut serde = SipSerde::new();
        let err = serde.add_raw(b"BYE urgend.a.be SIP/ 2.0\r\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedStartLine);
        assert_eq!(serde.state(), ParseState::StartLine);
        assert_eq!(serde.residuum_len(), 0);
        assert_eq!(serde.stats().parse_errors, 1);

        // Usable again afterwards
        let state = serde.add_raw(b"BYE sip:urgend.a.be SIP/2.0\r\n\r\n").unwrap();
        assert_eq!(state, SerdeState::End);
    }

    #[test]
    fn test_empty_chunk() {
        let mut serde = SipSerde::new();
        assert_eq!(serde.add_raw(b"").unwrap(), SerdeState::Progress);
        serde.add_raw(b"ACK sip:x SIP/2.0\r\n\r\n").unwrap();
        assert_eq!(serde.add_raw(b"").unwrap(), SerdeState::End);
        assert!(serde.pop_datum().unwrap().is_some());
    }

    #[test]
    fn test_keepalive_only() {
        let mut serde = SipSerde::new();
        assert_eq!(serde.add_raw(b"\r\n\r\n").unwrap(), SerdeState::Progress);
        assert_eq!(serde.state(), ParseState::StartLine);
        assert!(serde.pop_datum().unwrap().is_none());
    }

    #[test]
    fn test_back_to_back_in_one_chunk() {
        let mut serde = SipSerde::new();
        let state = serde
            .add_raw(b"OPTIONS sip:a SIP/2.0\r\n\r\nSIP/2.0 404 Not Found\r\n\r\n")
            .unwrap();
        assert_eq!(state, SerdeState::End);
        assert!(serde.residuum_len() > 0);

        let first = serde.pop_datum().unwrap().unwrap();
        assert_eq!(first.method(), Some("OPTIONS"));

        let second = serde.pop_datum().unwrap().unwrap();
        assert_eq!(second.response_code(), Some(404));
        assert_eq!(second.reason(), Some("Not Found"));

        assert!(serde.pop_datum().unwrap().is_none());
        assert_eq!(serde.stats().messages_parsed, 2);
    }

    #[test]
    fn test_unpopped_message_lost_on_add_raw() {
        let mut serde = SipSerde::new();
        serde.add_raw(b"ACK sip:first SIP/2.0\r\n\r\n").unwrap();
        serde.add_raw(b"ACK sip:second SIP/2.0\r\n\r\n").unwrap();

        let msg = serde.pop_datum().unwrap().unwrap();
        assert_eq!(msg.uri(), Some("sip:second"));
        assert_eq!(serde.stats().messages_lost, 1);
    }

    #[test]
    fn test_residuum_error_surfaces_on_pop() {
        let mut serde = SipSerde::new();
        serde
            .add_raw(b"ACK sip:x SIP/2.0\r\n\r\nGARBAGE\r\n")
            .unwrap();
        assert!(serde.pop_datum().unwrap().is_some());
        assert_eq!(
            serde.pop_datum().unwrap_err().kind(),
            ErrorKind::MalformedStartLine
        );
        assert_eq!(serde.residuum_len(), 0);
    }

    #[test]
    fn test_clear_buffer() {
        let mut serde = SipSerde::new();
        serde.add_raw(b"INVITE sip:x SIP/2.0\r\nVia: a\r\npartial").unwrap();
        assert_eq!(serde.state(), ParseState::Headers);

        serde.clear_buffer();
        assert_eq!(serde.state(), ParseState::StartLine);
        assert_eq!(serde.residuum_len(), 0);
        assert_eq!(serde.stats().messages_lost, 1);

        serde.add_raw(b"BYE sip:x SIP/2.0\r\n\r\n").unwrap();
        assert_eq!(serde.pop_datum().unwrap().unwrap().method(), Some("BYE"));
    }

    #[test]
    fn test_line_too_long() {
        let config = SerdeConfig {
            max_line_length: 32,
            ..SerdeConfig::default()
        };
        let mut serde = SipSerde::with_config(config);
        let line = vec![b'A'; 64];
        assert_eq!(serde.add_raw(&line).unwrap_err().kind(), ErrorKind::LineTooLong);
    }

    #[test]
    fn test_serialize_reuses_output_buffer() {
        let mut serde = SipSerde::new();
        let msg = SipMessage::response(200, "OK").unwrap();

        let first = serde.serialize(&msg).unwrap();
        let second = serde.serialize(&msg).unwrap();
        assert_eq!(first, second);
        assert_eq!(&first[..], b"SIP/2.0 200 OK\r\nContent-Length: 0\r\n\r\n");
        assert_eq!(
            serde.to_string(&msg).unwrap(),
            "SIP/2.0 200 OK\r\nContent-Length: 0\r\n\r\n"
        );
    }

    #[test]
    fn test_serialize_into_small_buffer() {
        let serde = SipSerde::new();
        let msg = SipMessage::request("INVITE", "sip:x").unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(
            serde.serialize_into(&msg, &mut buf).unwrap_err().kind(),
            ErrorKind::BufferTooSmall
        );
    }

    #[test]
    fn test_pool_recycling() {
        let mut serde = SipSerde::new().with_pool(MessagePool::new(4));
        serde.add_raw(b"ACK sip:x SIP/2.0\r\n\r\n").unwrap();
        let msg = serde.pop_datum().unwrap().unwrap();
        serde.release(msg);

        serde.add_raw(b"ACK sip:y SIP/2.0\r\n\r\n").unwrap();
        let msg = serde.pop_datum().unwrap().unwrap();
        assert_eq!(msg.uri(), Some("sip:y"));
        assert_eq!(msg.headers().len(), 1);
    }
}
