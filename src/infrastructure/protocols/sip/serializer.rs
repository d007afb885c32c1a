//! SIP message serializer
//!
//! Every message is validated and measured before the first byte is
//! written, so a failed call never leaves partial output behind.

use crate::domain::message::{is_code_valid, SipMessage, StartLine, SIP_VERSION};
use crate::domain::shared::{Result, SipError};
use bytes::{BufMut, BytesMut};

const CRLF: &[u8] = b"\r\n";
const HEADER_SEPARATOR: &[u8] = b": ";

/// Exact number of bytes `msg` renders to
pub fn serialized_len(msg: &SipMessage) -> Result<usize> {
    let start_line = match msg.start_line() {
        StartLine::Invalid => {
            return Err(SipError::InvalidMessage(
                "cannot serialize a cleared message".to_string(),
            ))
        }
        StartLine::Request(line) => {
            if line.method.is_empty() {
                return Err(SipError::NullInput("request method"));
            }
            if line.uri.is_empty() {
                return Err(SipError::NullInput("request uri"));
            }
            line.method.len() + 1 + line.uri.len() + 1 + SIP_VERSION.len()
        }
        StartLine::Response(line) => {
            if !is_code_valid(line.code) {
                return Err(SipError::InvalidResponseCode(line.code));
            }
            SIP_VERSION.len() + 1 + 3 + 1 + line.reason.len()
        }
    };

    let headers: usize = msg
        .headers()
        .iter()
        .map(|(name, value)| name.len() + HEADER_SEPARATOR.len() + value.len() + CRLF.len())
        .sum();

    let body = msg.body().map_or(0, |body| body.len());

    Ok(start_line + CRLF.len() + headers + CRLF.len() + body)
}

/// Render `msg` into `out`, which must have room for [`serialized_len`] bytes
pub fn write_message<B: BufMut>(msg: &SipMessage, out: &mut B) -> Result<()> {
    match msg.start_line() {
        StartLine::Invalid => {
            return Err(SipError::InvalidMessage(
                "cannot serialize a cleared message".to_string(),
            ))
        }
        StartLine::Request(line) => {
            out.put_slice(line.method.as_bytes());
            out.put_u8(b' ');
            out.put_slice(line.uri.as_bytes());
            out.put_u8(b' ');
            out.put_slice(SIP_VERSION.as_bytes());
        }
        StartLine::Response(line) => {
            out.put_slice(SIP_VERSION.as_bytes());
            out.put_slice(format!(" {:3} ", line.code).as_bytes());
            out.put_slice(line.reason.as_bytes());
        }
    }
    out.put_slice(CRLF);

    for (name, value) in msg.headers().iter() {
        out.put_slice(name.as_bytes());
        out.put_slice(HEADER_SEPARATOR);
        out.put_slice(value.as_bytes());
        out.put_slice(CRLF);
    }
    out.put_slice(CRLF);

    if let Some(body) = msg.body() {
        out.put_slice(body);
    }
    Ok(())
}

/// Append `msg` to a growable buffer; returns the number of bytes appended
pub fn encode(msg: &SipMessage, out: &mut BytesMut) -> Result<usize> {
    let len = serialized_len(msg)?;
    out.reserve(len);
    write_message(msg, out)?;
    Ok(len)
}

/// Render `msg` into a fixed slice; nothing is written if it does not fit
pub fn encode_into(msg: &SipMessage, out: &mut [u8]) -> Result<usize> {
    let required = serialized_len(msg)?;
    if required > out.len() {
        return Err(SipError::BufferTooSmall {
            required,
            available: out.len(),
        });
    }

    let mut cursor = &mut out[..required];
    write_message(msg, &mut cursor)?;
    Ok(required)
}
