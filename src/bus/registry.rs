use std::collections::HashMap;

use crate::handler::{Callable, HandlerId, SubscribeOptions};

/// One registration of a handler on a topic.
#[derive(Debug, Clone)]
pub struct HandlerRecord {
    pub id: HandlerId,
    pub callable: Callable,
    pub options: SubscribeOptions,
}

/// Topic name → handlers in registration order.
///
/// A topic key only exists while it has at least one handler. The registry
/// holds no lock of its own; [`Bus`](super::Bus) guards it.
#[derive(Debug, Default)]
pub struct TopicRegistry {
    topics: HashMap<String, Vec<HandlerRecord>>,
}

impl TopicRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record to the end of the topic's list.
    pub fn insert(&mut self, topic: &str, record: HandlerRecord) {
        self.topics
            .entry(topic.to_string())
            .or_default()
            .push(record);
    }

    /// Remove the record with the given id, keeping the order of the rest.
    pub fn remove(&mut self, topic: &str, id: HandlerId) -> Option<HandlerRecord> {
        let handlers = self.topics.get_mut(topic)?;
        let position = handlers.iter().position(|record| record.id == id)?;
        let record = handlers.remove(position);
        if handlers.is_empty() {
            self.topics.remove(topic);
        }
        Some(record)
    }

    pub fn has_subscribers(&self, topic: &str) -> bool {
        self.topics
            .get(topic)
            .is_some_and(|handlers| !handlers.is_empty())
    }

    /// True if the registration with `id` is still on the topic.
    pub fn contains(&self, topic: &str, id: HandlerId) -> bool {
        self.topics
            .get(topic)
            .is_some_and(|handlers| handlers.iter().any(|record| record.id == id))
    }

    pub fn handler_count(&self, topic: &str) -> usize {
        self.topics.get(topic).map_or(0, Vec::len)
    }

    /// Topics with at least one handler, sorted.
    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.topics.keys().cloned().collect();
        topics.sort();
        topics
    }

    /// Snapshot the topic's handlers for one publish.
    ///
    /// Every `once` record in the snapshot is removed from the live list before
    /// the snapshot is returned, so a concurrent or later publish never sees it.
    pub fn take_for_dispatch(&mut self, topic: &str) -> Vec<HandlerRecord> {
        let Some(handlers) = self.topics.get_mut(topic) else {
            return Vec::new();
        };
        let snapshot = handlers.clone();
        handlers.retain(|record| !record.options.once);
        if handlers.is_empty() {
            self.topics.remove(topic);
        }
        snapshot
    }
}
