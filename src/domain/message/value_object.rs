//! SIP message value objects

use crate::domain::shared::{Result, SipError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Protocol version token used on every start line
pub const SIP_VERSION: &str = "SIP/2.0";

/// Lowest valid response code
pub const MIN_RESPONSE_CODE: u16 = 100;
/// Highest valid response code
pub const MAX_RESPONSE_CODE: u16 = 699;

/// Well-known header names, case as written on the wire
pub mod header_names {
    pub const CONTENT_LENGTH: &str = "Content-Length";
    pub const CONTENT_TYPE: &str = "Content-Type";
    pub const CSEQ: &str = "CSeq";
    pub const FROM: &str = "From";
    pub const TO: &str = "To";
    pub const CALL_ID: &str = "Call-ID";
    pub const VIA: &str = "Via";
    pub const CONTACT: &str = "Contact";
    pub const MAX_FORWARDS: &str = "Max-Forwards";
}

/// Message type discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageType {
    /// Cleared ground state, never handed out by the parser
    Invalid,
    Request,
    Response,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Invalid => "INVALID",
            MessageType::Request => "REQUEST",
            MessageType::Response => "RESPONSE",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// `METHOD SP URI SP SIP/2.0`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestLine {
    pub method: String,
    pub uri: String,
}

/// `SIP/2.0 SP CODE SP REASON`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResponseLine {
    pub code: u16,
    pub reason: String,
}

/// First line of a message
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum StartLine {
    #[default]
    Invalid,
    Request(RequestLine),
    Response(ResponseLine),
}

impl StartLine {
    pub fn request(method: &str, uri: &str) -> Result<Self> {
        if method.is_empty() {
            return Err(SipError::NullInput("request method"));
        }
        if uri.is_empty() {
            return Err(SipError::NullInput("request uri"));
        }

        Ok(StartLine::Request(RequestLine {
            method: method.to_string(),
            uri: uri.to_string(),
        }))
    }

    /// The reason phrase may be empty, the code may not leave 100..=699
    pub fn response(code: u16, reason: &str) -> Result<Self> {
        if !is_code_valid(code) {
            return Err(SipError::InvalidResponseCode(code));
        }

        Ok(StartLine::Response(ResponseLine {
            code,
            reason: reason.to_string(),
        }))
    }

    pub fn message_type(&self) -> MessageType {
        match self {
            StartLine::Invalid => MessageType::Invalid,
            StartLine::Request(_) => MessageType::Request,
            StartLine::Response(_) => MessageType::Response,
        }
    }
}

pub fn is_code_valid(code: u16) -> bool {
    (MIN_RESPONSE_CODE..=MAX_RESPONSE_CODE).contains(&code)
}

/// Parsed `CSeq` header: `<digits> <method>`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CSeq {
    pub sequence: u32,
    pub method: String,
}

impl CSeq {
    pub fn new(sequence: u32, method: impl Into<String>) -> Self {
        Self {
            sequence,
            method: method.into(),
        }
    }
}

impl FromStr for CSeq {
    type Err = SipError;

    fn from_str(value: &str) -> Result<Self> {
        let value = value.trim_start();
        let digits_end = value
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(value.len());

        if digits_end == 0 {
            return Err(SipError::MalformedHeader(format!(
                "CSeq has no sequence number: {}",
                value
            )));
        }

        let sequence = value[..digits_end].parse::<u32>().map_err(|e| {
            SipError::MalformedHeader(format!("CSeq sequence number invalid: {}", e))
        })?;

        let method = value[digits_end..].trim();
        if method.is_empty() {
            return Err(SipError::MalformedHeader(
                "CSeq has no method".to_string(),
            ));
        }

        Ok(Self::new(sequence, method))
    }
}

impl fmt::Display for CSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.sequence, self.method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::shared::ErrorKind;

    #[test]
    fn test_response_code_bounds() {
        assert!(!is_code_valid(99));
        assert!(is_code_valid(100));
        assert!(is_code_valid(699));
        assert!(!is_code_valid(700));
    }

    #[test]
    fn test_start_line_validation() {
        assert!(StartLine::request("INVITE", "sip:bob@example.com").is_ok());
        assert_eq!(
            StartLine::request("", "sip:bob@example.com").unwrap_err().kind(),
            ErrorKind::NullInput
        );
        assert_eq!(
            StartLine::request("INVITE", "").unwrap_err().kind(),
            ErrorKind::NullInput
        );
        assert_eq!(
            StartLine::response(99, "Too low").unwrap_err(),
            SipError::InvalidResponseCode(99)
        );
        assert!(StartLine::response(180, "").is_ok());
    }

    #[test]
    fn test_message_type_strings() {
        assert_eq!(MessageType::Invalid.to_string(), "INVALID");
        assert_eq!(MessageType::Request.as_str(), "REQUEST");
        assert_eq!(StartLine::default().message_type(), MessageType::Invalid);

        for ty in [MessageType::Invalid, MessageType::Request, MessageType::Response] {
            assert_eq!(serde_json::to_value(ty).unwrap(), ty.as_str());
        }
    }

    #[test]
    fn test_cseq_parse() {
        let cseq: CSeq = "314159 INVITE".parse().unwrap();
        assert_eq!(cseq.sequence, 314159);
        assert_eq!(cseq.method, "INVITE");

        let cseq: CSeq = "  7   ACK ".parse().unwrap();
        assert_eq!(cseq, CSeq::new(7, "ACK"));
    }

    #[test]
    fn test_cseq_parse_failures() {
        assert!("INVITE".parse::<CSeq>().is_err());
        assert!("12".parse::<CSeq>().is_err());
        assert!("12   ".parse::<CSeq>().is_err());
        assert!("".parse::<CSeq>().is_err());
        assert!("99999999999 INVITE".parse::<CSeq>().is_err());
    }

    #[test]
    fn test_cseq_display() {
        assert_eq!(CSeq::new(1, "REGISTER").to_string(), "1 REGISTER");
    }
}
