//! Per-topic ticket locks for transactional handlers.
//!
//! A transactional invocation takes a [`Ticket`] from its topic's
//! [`TicketLock`] at the moment it is scheduled, then its worker waits until
//! that ticket is served. Tickets are served strictly in the order they were
//! issued, so transactional work for one topic runs one at a time and in
//! publish order, whichever worker thread happens to start first.

mod ticket;
mod topic_locks;

pub use ticket::{Ticket, TicketLock};
pub use topic_locks::TopicLocks;
