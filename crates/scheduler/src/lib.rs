//! Keyed debounce timers on a tokio runtime.
//!
//! Each key holds at most one pending task. Arming a key that is already armed
//! cancels the earlier task and replaces it, so only the most recently armed
//! task of a key can ever run.

use futures::future::{AbortHandle, abortable};
use loadfence_core::TrackerError;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::runtime::Handle;

/// Identifies one arming of a key. Later armings get larger tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArmToken(u64);

struct Pending {
    token: ArmToken,
    abort: AbortHandle,
}

struct Slots<K> {
    next_token: u64,
    pending: HashMap<K, Pending>,
}

pub struct DebounceScheduler<K> {
    runtime: Handle,
    slots: Arc<Mutex<Slots<K>>>,
}

fn lock<K>(slots: &Mutex<Slots<K>>) -> MutexGuard<'_, Slots<K>> {
    slots.lock().unwrap_or_else(|e| e.into_inner())
}

impl<K> DebounceScheduler<K>
where
    K: Copy + Eq + Hash + Debug + Send + Sync + 'static,
{
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            slots: Arc::new(Mutex::new(Slots {
                next_token: 0,
                pending: HashMap::new(),
            })),
        }
    }

    /// Binds to the runtime of the calling context.
    pub fn try_current() -> Result<Self, TrackerError> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|_| TrackerError::NoRuntime)
    }

    /// Runs `task` once `delay` has elapsed, unless `key` is re-armed or cancelled first.
    ///
    /// Never blocks; the wait happens on a spawned task. The spawned task only
    /// holds a weak reference to the scheduler, so dropping the scheduler
    /// silently discards everything still pending.
    pub fn arm<F>(&self, key: K, delay: Duration, task: F) -> ArmToken
    where
        F: FnOnce() + Send + 'static,
    {
        let weak = Arc::downgrade(&self.slots);
        let mut slots = lock(&self.slots);
        slots.next_token += 1;
        let token = ArmToken(slots.next_token);

        let (fire, abort) = abortable(async move {
            tokio::time::sleep(delay).await;
            if take_if_current(&weak, key, token) {
                task();
            }
        });

        if let Some(prev) = slots.pending.insert(key, Pending { token, abort }) {
            tracing::trace!(?key, replaced = prev.token.0, by = token.0, "re-armed");
            prev.abort.abort();
        }
        drop(slots);

        self.runtime.spawn(fire);
        token
    }

    /// Cancels the pending task of `key`. Returns whether one was pending.
    pub fn cancel(&self, key: K) -> bool {
        match lock(&self.slots).pending.remove(&key) {
            Some(pending) => {
                pending.abort.abort();
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&self) {
        for (_, pending) in lock(&self.slots).pending.drain() {
            pending.abort.abort();
        }
    }

    pub fn is_armed(&self, key: K) -> bool {
        lock(&self.slots).pending.contains_key(&key)
    }

    pub fn armed_count(&self) -> usize {
        lock(&self.slots).pending.len()
    }
}

/// Removes the slot for `key` if it still belongs to `token`.
fn take_if_current<K>(weak: &Weak<Mutex<Slots<K>>>, key: K, token: ArmToken) -> bool
where
    K: Eq + Hash,
{
    let Some(slots) = weak.upgrade() else {
        return false;
    };
    let mut slots = lock(&slots);
    match slots.pending.get(&key) {
        Some(pending) if pending.token == token => {
            slots.pending.remove(&key);
            true
        }
        _ => false,
    }
}

impl<K> Drop for DebounceScheduler<K> {
    fn drop(&mut self) {
        for (_, pending) in lock(&self.slots).pending.drain() {
            pending.abort.abort();
        }
    }
}
