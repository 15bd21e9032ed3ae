use loadfence_core::ViewId;
use std::sync::{Arc, Weak};

use crate::tracker::{Inner, LoadTracker};

/// The progress callback installed into a view's engine.
///
/// Only a [`LoadTracker`](crate::LoadTracker) can mint one, so progress
/// reported through it always reaches that tracker. It holds the tracker
/// weakly: once the tracker is dropped, reports are ignored.
#[derive(Clone)]
pub struct ProgressClient {
    view: ViewId,
    tracker: Weak<Inner>,
}

impl ProgressClient {
    pub(crate) fn new(tracker: &Arc<Inner>) -> Self {
        Self {
            view: tracker.view().id,
            tracker: Arc::downgrade(tracker),
        }
    }

    /// The view whose tracker minted this client.
    pub fn view(&self) -> ViewId {
        self.view
    }

    /// Whether reports through this client reach `tracker`. View ids can be
    /// cloned into other trackers, so this compares the tracker itself.
    pub(crate) fn routes_to(&self, tracker: &LoadTracker) -> bool {
        Weak::as_ptr(&self.tracker) == Arc::as_ptr(&tracker.inner)
    }

    pub fn on_progress_changed(&self, percent: i32) {
        if let Some(tracker) = self.tracker.upgrade() {
            tracker.on_progress_changed(percent);
        }
    }
}

impl std::fmt::Debug for ProgressClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressClient")
            .field("view", &self.view)
            .field("attached", &(self.tracker.strong_count() > 0))
            .finish()
    }
}
