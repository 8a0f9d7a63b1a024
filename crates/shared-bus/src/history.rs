//! Bounded in-memory event history and correlation chains.

use crate::events::CrossSystemEvent;
use shared_types::EventId;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// Keeps the most recent `capacity` events.
///
/// Evicting an event also removes it from its correlation chain, so chains
/// only ever name retained events.
#[derive(Debug)]
pub struct EventHistory {
    capacity: usize,
    events: HashMap<EventId, Arc<CrossSystemEvent>>,
    order: VecDeque<EventId>,
    correlations: HashMap<String, Vec<EventId>>,
}

impl EventHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            events: HashMap::new(),
            order: VecDeque::new(),
            correlations: HashMap::new(),
        }
    }

    /// Record an event. Returns false if the id was already present.
    pub fn insert(&mut self, event: Arc<CrossSystemEvent>) -> bool {
        if self.events.contains_key(&event.id) {
            return false;
        }
        if let Some(correlation_id) = &event.correlation_id {
            self.correlations
                .entry(correlation_id.clone())
                .or_default()
                .push(event.id);
        }
        self.order.push_back(event.id);
        self.events.insert(event.id, event);

        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.evict(oldest);
            }
        }
        true
    }

    pub fn contains(&self, id: &EventId) -> bool {
        self.events.contains_key(id)
    }

    pub fn get(&self, id: &EventId) -> Option<Arc<CrossSystemEvent>> {
        self.events.get(id).cloned()
    }

    /// Ids sharing `correlation_id`, in publish order.
    pub fn correlation(&self, correlation_id: &str) -> Vec<EventId> {
        self.correlations
            .get(correlation_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    fn evict(&mut self, id: EventId) {
        let Some(event) = self.events.remove(&id) else {
            return;
        };
        let Some(correlation_id) = &event.correlation_id else {
            return;
        };
        if let Some(chain) = self.correlations.get_mut(correlation_id) {
            chain.retain(|member| *member != id);
            if chain.is_empty() {
                self.correlations.remove(correlation_id);
            }
        }
    }
}
