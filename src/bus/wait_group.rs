use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct Inner {
    pending: Mutex<usize>,
    idle: Condvar,
}

/// Counter of outstanding asynchronous invocations, backed by
/// `Mutex<usize>` + `Condvar`.
///
/// Clones share the same counter.
#[derive(Clone, Default)]
pub struct WaitGroup {
    inner: Arc<Inner>,
}

impl WaitGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more invocation. The returned guard counts it back down when
    /// dropped, even if the invocation panicked.
    pub fn add(&self) -> PendingGuard {
        *self.count() += 1;
        PendingGuard {
            group: self.clone(),
        }
    }

    pub fn pending(&self) -> usize {
        *self.count()
    }

    /// Block until the counter reaches zero.
    pub fn wait(&self) {
        let mut pending = self.count();
        while *pending > 0 {
            pending = self
                .inner
                .idle
                .wait(pending)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn done(&self) {
        let mut pending = self.count();
        *pending = pending.saturating_sub(1);
        if *pending == 0 {
            self.inner.idle.notify_all();
        }
    }

    fn count(&self) -> MutexGuard<'_, usize> {
        self.inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Decrements its [`WaitGroup`] on drop.
pub struct PendingGuard {
    group: WaitGroup,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.group.done();
    }
}

/// Handle returned by [`Bus::publish_and_track`](super::Bus::publish_and_track).
///
/// Every handle from the same bus waits on the same bus-wide counter: waiting
/// returns only once *all* asynchronous work the bus is tracking has finished,
/// including work scheduled by earlier untracked `publish` calls.
#[derive(Clone)]
pub struct WaitHandle {
    group: WaitGroup,
}

impl WaitHandle {
    pub(crate) fn new(group: WaitGroup) -> Self {
        Self { group }
    }

    /// Block until the bus has no pending asynchronous work. Safe to call
    /// repeatedly and from several threads at once.
    pub fn wait(&self) {
        self.group.wait();
    }

    pub fn pending(&self) -> usize {
        self.group.pending()
    }
}
