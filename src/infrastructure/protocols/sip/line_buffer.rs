//! CRLF line assembly across arbitrary chunk boundaries

use crate::domain::shared::{Result, SipError};

/// Default line buffer size; a line plus the CR of its terminator must fit
pub const MAX_LINE_LENGTH: usize = 1000;

const CR: u8 = b'\r';
const LF: u8 = b'\n';

/// Outcome of feeding bytes into a [`LineBuffer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineState {
    /// A full line is available through [`LineBuffer::line`]
    Complete,
    /// Input exhausted before the line terminator
    Continue,
}

/// Accumulates bytes until a CRLF is seen.
///
/// The last accumulated byte survives between calls, so a CR at the end of
/// one chunk and an LF at the start of the next still terminate the line.
#[derive(Debug, Clone)]
pub struct LineBuffer {
    capacity: usize,
    line: Vec<u8>,
    complete: bool,
}

impl LineBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            line: Vec::with_capacity(capacity),
            complete: false,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Consume bytes from the front of `input` until a line is complete or
    /// `input` runs dry. A completed line is dropped on the next call.
    pub fn copy_line(&mut self, input: &mut &[u8]) -> Result<LineState> {
        if self.complete {
            self.reset();
        }

        while let Some((&byte, rest)) = input.split_first() {
            *input = rest;

            if byte == LF && self.line.last() == Some(&CR) {
                self.line.pop();
                self.complete = true;
                return Ok(LineState::Complete);
            }

            self.line.push(byte);
            if self.line.len() > self.capacity {
                return Err(SipError::LineTooLong {
                    limit: self.capacity,
                });
            }
        }

        Ok(LineState::Continue)
    }

    /// The completed line without its CRLF, or the partial line so far
    pub fn line(&self) -> &[u8] {
        &self.line
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Number of buffered bytes of the current line
    pub fn len(&self) -> usize {
        self.line.len()
    }

    pub fn is_empty(&self) -> bool {
        self.line.is_empty()
    }

    pub fn reset(&mut self) {
        self.line.clear();
        self.complete = false;
    }
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new(MAX_LINE_LENGTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_chunk_line() {
        let mut lb = LineBuffer::default();
        let mut input: &[u8] = b"INVITE sip:a SIP/2.0\r\nrest";

        assert_eq!(lb.copy_line(&mut input).unwrap(), LineState::Complete);
        assert_eq!(lb.line(), b"INVITE sip:a SIP/2.0");
        assert_eq!(input, b"rest");
    }

    #[test]
    fn test_partial_line_continues() {
        let mut lb = LineBuffer::default();
        let mut input: &[u8] = b"Via: SIP/2.0/U";
        assert_eq!(lb.copy_line(&mut input).unwrap(), LineState::Continue);
        assert!(input.is_empty());
        assert_eq!(lb.len(), 14);

        let mut input: &[u8] = b"DP host\r\n";
        assert_eq!(lb.copy_line(&mut input).unwrap(), LineState::Complete);
        assert_eq!(lb.line(), b"Via: SIP/2.0/UDP host");
    }

    #[test]
    fn test_crlf_split_across_chunks() {
        let mut lb = LineBuffer::default();
        let mut input: &[u8] = b"To: bob\r";
        assert_eq!(lb.copy_line(&mut input).unwrap(), LineState::Continue);

        let mut input: &[u8] = b"\nFrom";
        assert_eq!(lb.copy_line(&mut input).unwrap(), LineState::Complete);
        assert_eq!(lb.line(), b"To: bob");
        assert_eq!(input, b"From");
    }

    #[test]
    fn test_byte_by_byte() {
        let mut lb = LineBuffer::default();
        let data = b"CSeq: 1 INVITE\r\n";
        for (i, byte) in data.iter().enumerate() {
            let mut input: &[u8] = std::slice::from_ref(byte);
            let state = lb.copy_line(&mut input).unwrap();
            if i + 1 == data.len() {
                assert_eq!(state, LineState::Complete);
            } else {
                assert_eq!(state, LineState::Continue);
            }
        }
        assert_eq!(lb.line(), b"CSeq: 1 INVITE");
    }

    #[test]
    fn test_empty_line() {
        let mut lb = LineBuffer::default();
        let mut input: &[u8] = b"\r\n\r\n";
        assert_eq!(lb.copy_line(&mut input).unwrap(), LineState::Complete);
        assert!(lb.line().is_empty());
        assert_eq!(lb.copy_line(&mut input).unwrap(), LineState::Complete);
        assert!(input.is_empty());
    }

    #[test]
    fn test_bare_lf_is_content() {
        let mut lb = LineBuffer::default();
        let mut input: &[u8] = b"a\nb\r\n";
        assert_eq!(lb.copy_line(&mut input).unwrap(), LineState::Complete);
        assert_eq!(lb.line(), b"a\nb");
    }

    #[test]
    fn test_completed_line_dropped_on_next_call() {
        let mut lb = LineBuffer::default();
        let mut input: &[u8] = b"one\r\ntwo";
        lb.copy_line(&mut input).unwrap();
        assert!(lb.is_complete());
        assert_eq!(lb.copy_line(&mut input).unwrap(), LineState::Continue);
        assert_eq!(lb.line(), b"two");
        assert!(!lb.is_complete());
    }

    #[test]
    fn test_line_with_cr_at_capacity_is_accepted() {
        let mut lb = LineBuffer::new(16);
        let mut data = vec![b'x'; 15];
        data.extend_from_slice(b"\r\n");
        let mut input: &[u8] = &data;
        assert_eq!(lb.copy_line(&mut input).unwrap(), LineState::Complete);
        assert_eq!(lb.line().len(), 15);

        let mut lb = LineBuffer::new(16);
        let mut data = vec![b'x'; 16];
        data.extend_from_slice(b"\r\n");
        let mut input: &[u8] = &data;
        assert_eq!(
            lb.copy_line(&mut input).unwrap_err(),
            SipError::LineTooLong { limit: 16 }
        );
    }

    #[test]
    fn test_line_too_long() {
        let mut lb = LineBuffer::new(16);
        let data = vec![b'x'; 17];
        let mut input: &[u8] = &data;
        assert_eq!(
            lb.copy_line(&mut input).unwrap_err(),
            SipError::LineTooLong { limit: 16 }
        );

        let mut lb = LineBuffer::new(16);
        let mut data = vec![b'x'; 17];
        data.extend_from_slice(b"\r\n");
        let mut input: &[u8] = &data;
        assert!(lb.copy_line(&mut input).is_err());
    }

    #[test]
    fn test_reset() {
        let mut lb = LineBuffer::default();
        let mut input: &[u8] = b"partial\r";
        lb.copy_line(&mut input).unwrap();
        lb.reset();
        assert!(lb.is_empty());

        // The CR was dropped with the reset, so this LF is content
        let mut input: &[u8] = b"\nx\r\n";
        assert_eq!(lb.copy_line(&mut input).unwrap(), LineState::Complete);
        assert_eq!(lb.line(), b"\nx");
    }
}
