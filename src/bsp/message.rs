// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Per-vertex message queues (spec §4.A).
//!
//! A `Queue` is many-producer/single-consumer: `enqueue` must be safe under
//! concurrent callers, but iteration is not — a second concurrent call to
//! `messages` on the same queue would corrupt iterator state. This is
//! documented, not enforced by the type system, matching the reference
//! implementation.

use std::sync::Mutex;

use super::error::GraphError;

/// An opaque, tagged message queued for delivery to a specific vertex.
pub trait Message: Send + Sync {
    fn message_type(&self) -> &str;

    /// Produces an independent copy — used by `broadcast_to_neighbors` to
    /// hand every destination its own instance (spec invariant 3.1.a).
    fn clone_message(&self) -> Box<dyn Message>;
}

/// Iterates the messages drained from a [`Queue`] by a single call to
/// [`Queue::messages`]. Traversal order is not part of the contract; the
/// in-memory implementation below dequeues LIFO.
pub trait MessageIterator: Send {
    fn next(&mut self) -> bool;
    fn message(&mut self) -> Option<Box<dyn Message>>;
    fn error(&self) -> Option<&GraphError>;
}

/// A per-vertex inbox buffer.
pub trait Queue: Send + Sync {
    fn enqueue(&self, msg: Box<dyn Message>) -> Result<(), GraphError>;
    fn pending_messages(&self) -> bool;
    /// Drops any messages left over after a step — a no-op if `messages`
    /// already drained the buffer, a real discard if it was never called.
    fn discard_messages(&self) -> Result<(), GraphError>;
    /// Hands back an iterator over every message currently queued, removing
    /// them from the queue as part of the call.
    fn messages(&self) -> Box<dyn MessageIterator + '_>;
    fn close(&self) -> Result<(), GraphError>;
}

/// Builds fresh [`Queue`] instances; supplied once per [`super::GraphConfig`]
/// and invoked twice per vertex (one buffer per superstep parity).
pub type QueueFactory = Box<dyn Fn() -> Box<dyn Queue> + Send + Sync>;

/// The reference in-memory queue: an unbounded `Vec` guarded by a mutex,
/// drained tail-first.
#[derive(Default)]
pub struct InMemoryQueue {
    msgs: Mutex<Vec<Box<dyn Message>>>,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// A [`QueueFactory`] that returns fresh `InMemoryQueue` instances.
    pub fn factory() -> QueueFactory {
        Box::new(|| Box::new(InMemoryQueue::new()))
    }
}

impl Queue for InMemoryQueue {
    fn enqueue(&self, msg: Box<dyn Message>) -> Result<(), GraphError> {
        self.msgs.lock().unwrap().push(msg);
        Ok(())
    }

    fn pending_messages(&self) -> bool {
        !self.msgs.lock().unwrap().is_empty()
    }

    fn discard_messages(&self) -> Result<(), GraphError> {
        self.msgs.lock().unwrap().clear();
        Ok(())
    }

    fn messages(&self) -> Box<dyn MessageIterator + '_> {
        let drained = std::mem::take(&mut *self.msgs.lock().unwrap());
        Box::new(VecIterator {
            items: drained,
            current: None,
        })
    }

    fn close(&self) -> Result<(), GraphError> {
        Ok(())
    }
}

struct VecIterator {
    items: Vec<Box<dyn Message>>,
    current: Option<Box<dyn Message>>,
}

impl MessageIterator for VecIterator {
    fn next(&mut self) -> bool {
        match self.items.pop() {
            Some(msg) => {
                self.current = Some(msg);
                true
            }
            None => false,
        }
    }

    fn message(&mut self) -> Option<Box<dyn Message>> {
        self.current.take()
    }

    fn error(&self) -> Option<&GraphError> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ping;
    impl Message for Ping {
        fn message_type(&self) -> &str {
            "ping"
        }

        fn clone_message(&self) -> Box<dyn Message> {
            Box::new(Ping)
        }
    }

    #[derive(Debug, PartialEq, Eq)]
    struct Tagged(&'static str);
    impl Message for Tagged {
        fn message_type(&self) -> &str {
            self.0
        }

        fn clone_message(&self) -> Box<dyn Message> {
            Box::new(Tagged(self.0))
        }
    }

    #[test]
    fn drains_in_lifo_order() {
        let queue = InMemoryQueue::new();
        queue.enqueue(Box::new(Tagged("m1"))).unwrap();
        queue.enqueue(Box::new(Tagged("m2"))).unwrap();
        queue.enqueue(Box::new(Tagged("m3"))).unwrap();

        let mut order = Vec::new();
        let mut iter = queue.messages();
        while iter.next() {
            let msg = iter.message().unwrap();
            order.push(msg.message_type().to_string());
        }

        assert_eq!(order, vec!["m3", "m2", "m1"]);
        assert!(!queue.pending_messages());
        queue.discard_messages().unwrap();
    }

    #[test]
    fn pending_messages_reflects_queue_state() {
        let queue = InMemoryQueue::new();
        assert!(!queue.pending_messages());
        queue.enqueue(Box::new(Ping)).unwrap();
        assert!(queue.pending_messages());
    }
}
