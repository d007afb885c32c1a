//! Bounded pool of cleared messages
//!
//! Owned by whoever drives a parser, typically one per connection. Messages
//! handed out are indistinguishable from freshly created ones.

use super::entity::SipMessage;
use super::value_object::StartLine;
use crate::domain::shared::Result;
use tracing::debug;

#[derive(Debug, Default)]
pub struct MessagePool {
    capacity: usize,
    free: Vec<SipMessage>,
}

impl MessagePool {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            free: Vec::with_capacity(capacity),
        }
    }

    pub fn request(&mut self, method: &str, uri: &str) -> Result<SipMessage> {
        let start_line = StartLine::request(method, uri)?;
        Ok(self.acquire(start_line))
    }

    pub fn response(&mut self, code: u16, reason: &str) -> Result<SipMessage> {
        let start_line = StartLine::response(code, reason)?;
        Ok(self.acquire(start_line))
    }

    /// Reuse a cached message or allocate a new one
    pub(crate) fn acquire(&mut self, start_line: StartLine) -> SipMessage {
        match self.free.pop() {
            Some(mut msg) => {
                msg.reinit(start_line);
                msg
            }
            None => SipMessage::from_start_line(start_line),
        }
    }

    /// Clear `msg` and keep it for reuse, or drop it if the pool is full
    pub fn release(&mut self, mut msg: SipMessage) {
        if self.free.len() >= self.capacity {
            debug!("Message pool full ({}), dropping message", self.capacity);
            return;
        }
        msg.clear();
        self.free.push(msg);
    }

    /// Number of cached messages
    pub fn len(&self) -> usize {
        self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.free.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
