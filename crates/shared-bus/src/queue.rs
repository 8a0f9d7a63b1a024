//! # Pending Queue
//!
//! Two-tier FIFO. Critical events wait in their own tier and are always
//! dequeued before anything else; within each tier order is arrival order.
//! Retried events jump to the head of the critical tier.

use crate::events::CrossSystemEvent;
use shared_types::{EventId, Priority};
use std::collections::VecDeque;
use std::sync::Arc;

/// Where a queued event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Published in this process; forwarded to the transport after delivery.
    Local,
    /// Received from the transport; never forwarded back.
    Remote,
}

/// A queued event and its delivery bookkeeping.
#[derive(Debug, Clone)]
pub struct Pending {
    pub event: Arc<CrossSystemEvent>,
    pub origin: Origin,
    /// Retries already performed.
    pub attempts: u32,
}

impl Pending {
    pub fn new(event: Arc<CrossSystemEvent>, origin: Origin) -> Self {
        Self {
            event,
            origin,
            attempts: 0,
        }
    }
}

#[derive(Debug, Default)]
pub struct PendingQueue {
    critical: VecDeque<Pending>,
    standard: VecDeque<Pending>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a newly published event.
    pub fn push(&mut self, pending: Pending) {
        if pending.event.priority == Priority::Critical {
            self.critical.push_back(pending);
        } else {
            self.standard.push_back(pending);
        }
    }

    /// Enqueue a retry ahead of everything else.
    pub fn push_retry(&mut self, pending: Pending) {
        self.critical.push_front(pending);
    }

    pub fn pop(&mut self) -> Option<Pending> {
        self.critical.pop_front().or_else(|| self.standard.pop_front())
    }

    pub fn len(&self) -> usize {
        self.critical.len() + self.standard.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids in dequeue order.
    pub fn ids(&self) -> Vec<EventId> {
        self.critical
            .iter()
            .chain(self.standard.iter())
            .map(|pending| pending.event.id)
            .collect()
    }

    /// Remove everything, in dequeue order.
    pub fn drain(&mut self) -> Vec<Pending> {
        let mut drained: Vec<Pending> = self.critical.drain(..).collect();
        drained.extend(self.standard.drain(..));
        drained
    }
}
