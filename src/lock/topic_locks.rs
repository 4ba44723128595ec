use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use super::{Ticket, TicketLock};

/// Lazily created [`TicketLock`]s keyed by topic.
///
/// Repeated lookups for the same topic return the same lock, so every
/// transactional handler on a topic queues behind the same line. A lock that
/// nobody holds a ticket or handle for is dropped the next time a ticket is
/// issued, so the map only holds topics with work in flight.
#[derive(Default)]
pub struct TopicLocks {
    locks: Mutex<HashMap<String, Arc<TicketLock>>>,
}

impl TopicLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get (or create) the lock for a topic.
    pub fn get_lock(&self, topic: &str) -> Arc<TicketLock> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks
            .entry(topic.to_string())
            .or_insert_with(|| Arc::new(TicketLock::new()))
            .clone()
    }

    /// Take the next ticket for a topic.
    pub fn ticket(&self, topic: &str) -> Ticket {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // Only the map refers to an idle lock; its line is empty.
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks
            .entry(topic.to_string())
            .or_insert_with(|| Arc::new(TicketLock::new()))
            .ticket()
    }

    /// Number of topics currently holding a lock.
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
