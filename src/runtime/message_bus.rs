//! Deferred message delivery.
//!
//! The bus is a fixed-capacity ring of pre-built [`MessageEnvelope`]s. Enqueueing
//! writes into the next free slot (reusing the slot's key buffer), dequeueing
//! hands out a mutable borrow of the oldest slot, and the caller recycles the
//! envelope once it has been delivered with
//! [`Machine::send_message`](super::Machine::send_message):
//!
//! ```text
//! enqueue ──▶ [ slot | slot | slot | slot ] ──▶ dequeue_first ──▶ send_message ──▶ recycle
//!               ^head        ^head+len
//! ```
//!
//! The bus is not synchronized. Producers and consumers on different threads
//! must wrap it in their own lock.

use crate::Value;
use thiserror::Error;

/// An addressed message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageEnvelope {
    /// Matched exactly against the keys of a state's `@on` section.
    pub key: String,
    /// Identifier of the receiving context, chosen by the host. `None` once recycled.
    pub recipient: Option<usize>,
    pub value: Option<Value>,
}

impl MessageEnvelope {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into(), recipient: None, value: None }
    }

    pub fn with_recipient(mut self, recipient: usize) -> Self {
        self.recipient = Some(recipient);
        self
    }

    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Reset all fields so the envelope can go back into a pool. The key's
    /// buffer is kept.
    pub fn recycle(&mut self) {
        self.key.clear();
        self.recipient = None;
        self.value = None;
    }

    fn fill(&mut self, key: &str, recipient: Option<usize>, value: Option<Value>) {
        self.key.clear();
        self.key.push_str(key);
        self.recipient = recipient;
        self.value = value;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BusError {
    #[error("message bus is full (capacity {capacity}); construct it with a larger capacity")]
    Full { capacity: usize },
}

/// Fixed-capacity FIFO of pooled envelopes.
#[derive(Debug)]
pub struct MessageBus {
    envelopes: Vec<MessageEnvelope>,
    head: usize,
    len: usize,
}

impl MessageBus {
    pub fn new(capacity: usize) -> Self {
        Self { envelopes: vec![MessageEnvelope::default(); capacity], head: 0, len: 0 }
    }

    pub fn capacity(&self) -> usize {
        self.envelopes.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Store a message for later, in-order delivery.
    pub fn enqueue(&mut self, key: &str, recipient: usize, value: Option<Value>) -> Result<(), BusError> {
        let capacity = self.capacity();
        if self.len >= capacity {
            return Err(BusError::Full { capacity });
        }
        let slot = (self.head + self.len) % capacity;
        self.envelopes[slot].fill(key, Some(recipient), value);
        self.len += 1;
        Ok(())
    }

    /// Pop the oldest message, or `None` when the bus is empty.
    ///
    /// The envelope stays in the pool; it is not reset until the caller calls
    /// [`MessageEnvelope::recycle`] on it.
    pub fn dequeue_first(&mut self) -> Option<&mut MessageEnvelope> {
        if self.len == 0 {
            return None;
        }
        let slot = self.head;
        self.head = (self.head + 1) % self.capacity();
        self.len -= 1;
        Some(&mut self.envelopes[slot])
    }
}
