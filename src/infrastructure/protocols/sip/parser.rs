//! Incremental SIP message parser
//!
//! Drives the start line, header and body stages over whatever bytes are
//! available. Bytes belonging to a line are moved into the line buffer as
//! soon as they are seen; body bytes stay in the input until the whole body
//! has arrived.

use super::line_buffer::{LineBuffer, LineState};
use crate::config::SerdeConfig;
use crate::domain::message::{header_names, MessagePool, SipMessage, StartLine, SIP_VERSION};
use crate::domain::shared::text::{sanitize, trim_spaces};
use crate::domain::shared::{Result, SipError};
use bytes::{Buf, BytesMut};
use std::fmt;
use std::str;
use tracing::{debug, trace, warn};

/// Parser stage for the message currently being assembled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseState {
    StartLine,
    Headers,
    Body,
    /// A complete message waits to be taken
    Done,
}

impl ParseState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseState::StartLine => "START_LINE",
            ParseState::Headers => "HEADERS",
            ParseState::Body => "BODY",
            ParseState::Done => "DONE",
        }
    }
}

impl fmt::Display for ParseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of one `advance` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// More input is needed
    Incomplete,
    /// A message is ready, see [`MessageParser::take_message`]
    Complete,
}

#[derive(Debug)]
pub struct MessageParser {
    config: SerdeConfig,
    state: ParseState,
    line_buffer: LineBuffer,
    message: Option<SipMessage>,
    body_length: usize,
    pool: Option<MessagePool>,
}

impl MessageParser {
    pub fn new(config: &SerdeConfig) -> Self {
        let pool = match config.pool_capacity {
            0 => None,
            capacity => Some(MessagePool::new(capacity)),
        };

        Self {
            config: config.clone(),
            state: ParseState::StartLine,
            line_buffer: LineBuffer::new(config.max_line_length),
            message: None,
            body_length: 0,
            pool,
        }
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    pub fn set_pool(&mut self, pool: MessagePool) {
        self.pool = Some(pool);
    }

    pub fn pool(&self) -> Option<&MessagePool> {
        self.pool.as_ref()
    }

    /// True if a message is under construction or waiting to be taken
    pub fn has_message(&self) -> bool {
        self.message.is_some()
    }

    /// Hand a no longer needed message back for reuse
    pub fn release(&mut self, message: SipMessage) {
        if let Some(pool) = self.pool.as_mut() {
            pool.release(message);
        }
    }

    /// Consume as much of `input` as possible.
    ///
    /// On error the parser is reset and the partial message dropped.
    pub fn advance(&mut self, input: &mut BytesMut) -> Result<Progress> {
        let result = self.drive(input);
        if let Err(e) = &result {
            warn!("SIP parse error in state {}: {}", self.state, e);
            self.reset();
        }
        result
    }

    fn drive(&mut self, input: &mut BytesMut) -> Result<Progress> {
        loop {
            match self.state {
                ParseState::StartLine => {
                    if self.read_line(input)? == LineState::Continue {
                        return Ok(Progress::Incomplete);
                    }
                    if self.line_buffer.is_empty() {
                        trace!("Skipping empty line before start line");
                        continue;
                    }

                    let start_line = parse_start_line(self.line_buffer.line())?;
                    self.message = Some(self.new_message(start_line));
                    self.state = ParseState::Headers;
                }

                ParseState::Headers => {
                    if self.read_line(input)? == LineState::Continue {
                        return Ok(Progress::Incomplete);
                    }
                    if self.line_buffer.is_empty() {
                        self.finish_headers()?;
                        continue;
                    }

                    let (name, value) = split_header(self.line_buffer.line())?;
                    let message = self.message.as_mut().ok_or_else(|| {
                        SipError::InvalidMessage("header before start line".to_string())
                    })?;
                    message.header_set(name, value).map_err(|e| {
                        SipError::MalformedHeader(format!("{}: {}", sanitize(name.as_bytes()), e))
                    })?;
                }

                ParseState::Body => {
                    if input.len() < self.body_length {
                        trace!(
                            "Body incomplete: {} of {} bytes",
                            input.len(),
                            self.body_length
                        );
                        return Ok(Progress::Incomplete);
                    }

                    let body = input.split_to(self.body_length).freeze();
                    let message = self.message.as_mut().ok_or_else(|| {
                        SipError::InvalidMessage("body without message".to_string())
                    })?;
                    let content_type = message
                        .content_type()
                        .map(|content_type| content_type.to_string())
                        .ok_or_else(|| {
                            SipError::MalformedHeader("body without Content-Type".to_string())
                        })?;
                    message.body_set(body, &content_type)?;
                    self.state = ParseState::Done;
                }

                ParseState::Done => return Ok(Progress::Complete),
            }
        }
    }

    fn read_line(&mut self, input: &mut BytesMut) -> Result<LineState> {
        let mut rest: &[u8] = &input[..];
        let state = self.line_buffer.copy_line(&mut rest);
        let consumed = input.len() - rest.len();
        input.advance(consumed);
        state
    }

    fn new_message(&mut self, start_line: StartLine) -> SipMessage {
        match self.pool.as_mut() {
            Some(pool) => pool.acquire(start_line),
            None => SipMessage::from_start_line(start_line),
        }
    }

    fn finish_headers(&mut self) -> Result<()> {
        let message = self
            .message
            .as_ref()
            .ok_or_else(|| SipError::InvalidMessage("headers without message".to_string()))?;

        // A value that is not a decimal u32 counts as 0
        let length = match message.content_length() {
            Some(length) => length as usize,
            None => {
                let raw = message.header_get(header_names::CONTENT_LENGTH).unwrap_or("");
                debug!(
                    "Content-Length not numerical, assuming 0: {}",
                    sanitize(raw.as_bytes())
                );
                0
            }
        };

        if length == 0 {
            self.state = ParseState::Done;
            return Ok(());
        }

        if !self.config.accepts_body_length(length) {
            return Err(SipError::MalformedHeader(format!(
                "Content-Length {} exceeds limit of {}",
                length, self.config.max_body_length
            )));
        }
        if message.content_type().is_none() {
            return Err(SipError::MalformedHeader(
                "Content-Length without Content-Type".to_string(),
            ));
        }

        self.body_length = length;
        self.state = ParseState::Body;
        Ok(())
    }

    /// Take the finished message and rearm for the next one
    pub fn take_message(&mut self) -> Option<SipMessage> {
        if self.state != ParseState::Done {
            return None;
        }
        self.state = ParseState::StartLine;
        self.body_length = 0;
        self.line_buffer.reset();
        self.message.take()
    }

    /// Drop partial state; returns true if a message was discarded
    pub fn reset(&mut self) -> bool {
        self.state = ParseState::StartLine;
        self.body_length = 0;
        self.line_buffer.reset();

        match self.message.take() {
            Some(message) => {
                debug!("Discarding {} under construction", message.message_type());
                self.release(message);
                true
            }
            None => false,
        }
    }
}

/// Parse `METHOD SP URI SP SIP/2.0` or `SIP/2.0 SP CODE SP REASON`
pub fn parse_start_line(line: &[u8]) -> Result<StartLine> {
    let text = str::from_utf8(line).map_err(|_| {
        SipError::MalformedStartLine(format!("not UTF-8: {}", sanitize(line)))
    })?;

    let mut tokens = text.splitn(3, ' ');
    let (el1, el2, el3) = match (tokens.next(), tokens.next(), tokens.next()) {
        (Some(el1), Some(el2), Some(el3)) => (el1, el2, el3),
        _ => {
            return Err(SipError::MalformedStartLine(format!(
                "expected three elements: {}",
                sanitize(line)
            )))
        }
    };

    if el1 == SIP_VERSION {
        if el2.is_empty() || !el2.bytes().all(|b| b.is_ascii_digit()) {
            return Err(SipError::MalformedStartLine(format!(
                "response code not numerical: {}",
                sanitize(el2.as_bytes())
            )));
        }
        let code = el2.parse::<u16>().map_err(|_| {
            SipError::MalformedStartLine(format!(
                "response code out of range: {}",
                sanitize(el2.as_bytes())
            ))
        })?;
        return StartLine::response(code, el3);
    }

    if el3 != SIP_VERSION {
        return Err(SipError::MalformedStartLine(format!(
            "no or invalid SIP version: {}",
            sanitize(line)
        )));
    }

    StartLine::request(el1, el2).map_err(|e| {
        SipError::MalformedStartLine(format!("{}: {}", e, sanitize(line)))
    })
}

/// Split `Name: value` at the first colon, trimming spaces on both sides
pub fn split_header(line: &[u8]) -> Result<(&str, &str)> {
    let text = str::from_utf8(line)
        .map_err(|_| SipError::MalformedHeader(format!("not UTF-8: {}", sanitize(line))))?;

    let (name, value) = text.split_once(':').ok_or_else(|| {
        SipError::MalformedHeader(format!("missing colon: {}", sanitize(line)))
    })?;

    let name = trim_spaces(name);
    if name.is_empty() {
        return Err(SipError::MalformedHeader(format!(
            "empty header name: {}",
            sanitize(line)
        )));
    }

    Ok((name, trim_spaces(value)))
}
