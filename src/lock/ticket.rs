use std::collections::BTreeSet;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct Tickets {
    /// Next ticket number to hand out.
    next: u64,
    /// Ticket currently allowed to run.
    serving: u64,
    /// Tickets dropped before their turn came.
    abandoned: BTreeSet<u64>,
}

/// FIFO lock backed by `Mutex<Tickets>` + `Condvar`.
///
/// Unlike a plain mutex, waiters are admitted in the order their tickets were
/// issued rather than the order they started waiting.
#[derive(Default)]
pub struct TicketLock {
    state: Mutex<Tickets>,
    wake: Condvar,
}

impl TicketLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the next place in line.
    pub fn ticket(self: &Arc<Self>) -> Ticket {
        let mut state = self.state();
        let number = state.next;
        state.next += 1;
        Ticket {
            lock: Arc::clone(self),
            number,
        }
    }

    /// Number of tickets issued and not yet released.
    pub fn queued(&self) -> u64 {
        let state = self.state();
        state.next - state.serving - state.abandoned.len() as u64
    }

    fn wait_for(&self, number: u64) {
        let mut state = self.state();
        while state.serving != number {
            state = self
                .wake
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn release(&self, number: u64) {
        let mut state = self.state();
        if state.serving == number {
            state.serving += 1;
            loop {
                let serving = state.serving;
                if !state.abandoned.remove(&serving) {
                    break;
                }
                state.serving += 1;
            }
        } else {
            state.abandoned.insert(number);
        }
        self.wake.notify_all();
    }

    // The state is a pair of counters; a panicking holder cannot leave it torn.
    fn state(&self) -> MutexGuard<'_, Tickets> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A place in a [`TicketLock`]'s line.
///
/// Dropping the ticket releases it: if its turn has come the next ticket is
/// served, otherwise it is skipped when its turn arrives.
pub struct Ticket {
    lock: Arc<TicketLock>,
    number: u64,
}

impl Ticket {
    /// Block until this ticket is being served. The lock is held until the
    /// ticket is dropped.
    pub fn wait(&self) {
        self.lock.wait_for(self.number);
    }

    pub fn number(&self) -> u64 {
        self.number
    }
}

impl Drop for Ticket {
    fn drop(&mut self) {
        self.lock.release(self.number);
    }
}
