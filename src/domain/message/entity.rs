//! SIP message entity
//!
//! A message is either a request or a response, carries a header store and an
//! optional body. `Content-Length` is always present on a live message and is
//! kept in lock-step with the body together with `Content-Type`.

use super::headers::HeaderStore;
use super::value_object::{
    header_names, CSeq, MessageType, RequestLine, ResponseLine, StartLine,
};
use crate::domain::shared::text::{escape_control, sanitize, trim_spaces};
use crate::domain::shared::{Result, SipError};
use bytes::Bytes;
use std::fmt;
use std::io;
use std::ops::ControlFlow;
use tracing::{debug, error, warn};

#[derive(Debug, PartialEq, Eq)]
pub struct SipMessage {
    start_line: StartLine,
    headers: HeaderStore,
    body: Option<Bytes>,
}

impl SipMessage {
    /// Create a request; fails on an empty method or URI
    pub fn request(method: &str, uri: &str) -> Result<Self> {
        Ok(Self::from_start_line(StartLine::request(method, uri)?))
    }

    /// Create a response; fails if `code` is outside 100..=699
    pub fn response(code: u16, reason: &str) -> Result<Self> {
        let start_line = StartLine::response(code, reason).map_err(|e| {
            error!("Cannot create SIP response: {}", e);
            e
        })?;
        Ok(Self::from_start_line(start_line))
    }

    pub(crate) fn from_start_line(start_line: StartLine) -> Self {
        let mut msg = Self {
            start_line: StartLine::Invalid,
            headers: HeaderStore::new(),
            body: None,
        };
        msg.reinit(start_line);
        msg
    }

    /// Reuse a cleared instance, keeping the header allocation
    pub(crate) fn reinit(&mut self, start_line: StartLine) {
        debug_assert_eq!(self.message_type(), MessageType::Invalid);
        self.headers.clear();
        self.body = None;
        self.start_line = start_line;
        self.headers.set(header_names::CONTENT_LENGTH, "0");
    }

    /// Return to the invalid ground state, dropping start line, headers and body
    pub fn clear(&mut self) {
        self.start_line = StartLine::Invalid;
        self.headers.clear();
        self.body = None;
    }

    pub fn message_type(&self) -> MessageType {
        self.start_line.message_type()
    }

    pub fn is_request(&self) -> bool {
        matches!(self.start_line, StartLine::Request(_))
    }

    pub fn is_response(&self) -> bool {
        matches!(self.start_line, StartLine::Response(_))
    }

    pub fn start_line(&self) -> &StartLine {
        &self.start_line
    }

    pub fn request_line(&self) -> Option<&RequestLine> {
        match &self.start_line {
            StartLine::Request(line) => Some(line),
            _ => None,
        }
    }

    pub fn response_line(&self) -> Option<&ResponseLine> {
        match &self.start_line {
            StartLine::Response(line) => Some(line),
            _ => None,
        }
    }

    pub fn method(&self) -> Option<&str> {
        self.request_line().map(|line| line.method.as_str())
    }

    pub fn uri(&self) -> Option<&str> {
        self.request_line().map(|line| line.uri.as_str())
    }

    pub fn response_code(&self) -> Option<u16> {
        self.response_line().map(|line| line.code)
    }

    pub fn reason(&self) -> Option<&str> {
        self.response_line().map(|line| line.reason.as_str())
    }

    fn ensure_valid(&self, operation: &str) -> Result<()> {
        if self.message_type() == MessageType::Invalid {
            return Err(SipError::InvalidMessage(format!(
                "cannot {} on a cleared message",
                operation
            )));
        }
        Ok(())
    }

    // Headers

    /// Insert or overwrite a header.
    ///
    /// Names and values must survive a serialize/parse cycle unchanged: no
    /// CRLF, no surrounding spaces, and no colon in the name.
    /// `Content-Length` may not contradict an attached body.
    pub fn header_set(&mut self, name: &str, value: &str) -> Result<()> {
        self.ensure_valid("set header")?;
        check_header(name, value)?;

        if name == header_names::CONTENT_LENGTH {
            if let Some(body) = &self.body {
                if value.parse::<usize>().ok() != Some(body.len()) {
                    return Err(SipError::MalformedHeader(format!(
                        "Content-Length {} contradicts body of {} bytes",
                        value,
                        body.len()
                    )));
                }
            }
        }

        if let Some(previous) = self.headers.set(name, value) {
            debug!("Replaced SIP header {}: {} -> {}", name, previous, value);
        }
        Ok(())
    }

    pub fn header_get(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Remove a header; the body bookkeeping headers cannot be removed
    pub fn header_remove(&mut self, name: &str) -> bool {
        if name == header_names::CONTENT_LENGTH {
            return false;
        }
        if name == header_names::CONTENT_TYPE && self.body.is_some() {
            return false;
        }
        self.headers.remove(name).is_some()
    }

    /// Visit headers in store order; returns the number visited
    pub fn header_for_each<F>(&self, visitor: F) -> usize
    where
        F: FnMut(&str, &str) -> ControlFlow<()>,
    {
        self.headers.for_each(visitor)
    }

    pub fn headers(&self) -> &HeaderStore {
        &self.headers
    }

    /// Declared body length; `None` if the header is not a decimal number
    pub fn content_length(&self) -> Option<u32> {
        self.headers
            .get(header_names::CONTENT_LENGTH)
            .and_then(|value| value.parse::<u32>().ok())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(header_names::CONTENT_TYPE)
    }

    // Body

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Attach a body, replacing any previous one, and rewrite
    /// `Content-Length` and `Content-Type`.
    pub fn body_set(&mut self, body: impl Into<Bytes>, content_type: &str) -> Result<()> {
        self.ensure_valid("set body")?;
        if content_type.is_empty() {
            return Err(SipError::NullInput("content type"));
        }
        check_header(header_names::CONTENT_TYPE, content_type)?;

        let body = body.into();
        let length = body.len().to_string();
        self.body = Some(body);
        self.headers.set(header_names::CONTENT_LENGTH, &length);
        self.headers.set(header_names::CONTENT_TYPE, content_type);
        Ok(())
    }

    /// Detach the body and reset `Content-Length` to 0
    pub fn take_body(&mut self) -> Option<Bytes> {
        let body = self.body.take()?;
        self.headers.set(header_names::CONTENT_LENGTH, "0");
        self.headers.remove(header_names::CONTENT_TYPE);
        Some(body)
    }

    // CSeq

    pub fn cseq_get(&self) -> Result<CSeq> {
        self.headers
            .get(header_names::CSEQ)
            .ok_or_else(|| SipError::MalformedHeader("CSeq header missing".to_string()))?
            .parse()
    }

    /// Write `CSeq: <seq> <method>`.
    ///
    /// A method differing from the request line is allowed and only logged.
    pub fn cseq_set(&mut self, method: &str, seq: u32) -> Result<()> {
        if method.is_empty() {
            return Err(SipError::NullInput("CSeq method"));
        }

        if let Some(request_method) = self.method() {
            if request_method != method {
                warn!(
                    "CSeq method {} does not fit request start line method {}",
                    method, request_method
                );
            }
        }

        self.header_set(header_names::CSEQ, &CSeq::new(seq, method).to_string())
    }

    /// Bytes strictly between the first `<` and the following `>` of `From`
    pub fn get_caller(&self) -> Option<Bytes> {
        let caller = self
            .headers
            .get(header_names::FROM)
            .and_then(|from| {
                let start = from.find('<')? + 1;
                let len = from[start..].find('>')?;
                Some(&from[start..start + len])
            })
            .filter(|caller| !caller.is_empty());

        match caller {
            Some(caller) => Some(Bytes::copy_from_slice(caller.as_bytes())),
            None => {
                warn!("No 'From' in SIP message found or invalid format");
                None
            }
        }
    }

    /// Deep copy with its own header entries and body bytes
    pub fn copy(&self) -> Result<Self> {
        self.ensure_valid("copy")?;
        Ok(Self {
            start_line: self.start_line.clone(),
            headers: self.headers.clone(),
            body: self
                .body
                .as_ref()
                .map(|body| Bytes::copy_from_slice(body)),
        })
    }

    /// Human-readable inspection output
    pub fn dump<W: io::Write>(&self, out: &mut W) -> io::Result<()> {
        write!(out, "{}", self)
    }
}

fn check_header(name: &str, value: &str) -> Result<()> {
    if name.is_empty() {
        return Err(SipError::NullInput("header name"));
    }

    let problem = if name.contains(':') {
        "colon in header name"
    } else if name.contains("\r\n") || value.contains("\r\n") {
        "CRLF in header"
    } else if trim_spaces(name) != name {
        "spaces around header name"
    } else if trim_spaces(value) != value {
        "spaces around header value"
    } else {
        return Ok(());
    };

    Err(SipError::MalformedHeader(format!(
        "{}: {}: {}",
        problem,
        sanitize(name.as_bytes()),
        sanitize(value.as_bytes())
    )))
}

impl fmt::Display for SipMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.start_line {
            StartLine::Invalid => return writeln!(f, "Tried to dump invalid SIP message"),
            StartLine::Request(line) => {
                writeln!(f, "\n--- BEGIN SIP MESSAGE ---")?;
                writeln!(
                    f,
                    "SIP Request message: {} - URI: {}",
                    escape_control(line.method.as_bytes()),
                    escape_control(line.uri.as_bytes())
                )?;
            }
            StartLine::Response(line) => {
                writeln!(f, "\n--- BEGIN SIP MESSAGE ---")?;
                writeln!(
                    f,
                    "SIP Response message: {} - {}",
                    line.code,
                    escape_control(line.reason.as_bytes())
                )?;
            }
        }

        for (name, value) in self.headers.iter() {
            writeln!(
                f,
                "    {}: {}",
                escape_control(name.as_bytes()),
                escape_control(value.as_bytes())
            )?;
        }

        match &self.body {
            None => writeln!(f, "   --- NO BODY ---")?,
            Some(body) => {
                // Keep line breaks, escape other control characters
                for c in String::from_utf8_lossy(body).chars() {
                    if c.is_control() && !matches!(c, '\r' | '\n' | '\t') {
                        write!(f, "\\x{:02x}", c as u32)?;
                    } else {
                        write!(f, "{}", c)?;
                    }
                }
                writeln!(f)?;
            }
        }

        writeln!(f, "\n--- END SIP MESSAGE ---")
    }
}
