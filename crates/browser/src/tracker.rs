//! Load-completion tracking.
//!
//! A [`LoadTracker`] turns the engine's two unreliable hints, progress
//! reaching 100% and frames being drawn, into a single debounced
//! "load finished" notification per navigation.
//!
//! Each hint arms a delayed completion signal tagged with the id of the
//! navigation that was current when it was armed. When the delay elapses the
//! signal resolves the navigation only if progress reached 100% and its id is
//! still current; otherwise it is dropped. Re-arming a signal kind replaces the
//! pending one, so bursts of frames collapse into one confirmation timed from
//! the last frame.

use loadfence_core::{
    LoadFinishListener, LoadFinished, NavigationKind, RequestId, RequestIdGenerator, Resolution,
    SignalKind, TrackerError, TrackerState, ViewIdentity,
};
use loadfence_scheduler::DebounceScheduler;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::runtime::Handle;
use tokio::sync::watch;

use crate::progress::ProgressClient;
use crate::shared::TrackerConfig;

/// Handle to a view's load tracker. Cloning shares the same tracker.
///
/// Completion signals are spawned on the tokio runtime the tracker was
/// created in. Dropping the last handle discards all pending signals.
#[derive(Clone)]
pub struct LoadTracker {
    pub(crate) inner: Arc<Inner>,
}

struct Core {
    state: TrackerState,
    ids: RequestIdGenerator,
}

pub(crate) struct Inner {
    view: ViewIdentity,
    config: TrackerConfig,
    core: Mutex<Core>,
    listener: Mutex<Option<Arc<dyn LoadFinishListener>>>,
    signals: DebounceScheduler<SignalKind>,
    finished: watch::Sender<bool>,
}

impl LoadTracker {
    /// Creates a tracker bound to the current tokio runtime.
    pub fn new(view: ViewIdentity, config: TrackerConfig) -> Result<Self, TrackerError> {
        let runtime = Handle::try_current().map_err(|_| TrackerError::NoRuntime)?;
        Self::with_runtime(view, config, runtime)
    }

    pub fn with_runtime(
        view: ViewIdentity,
        config: TrackerConfig,
        runtime: Handle,
    ) -> Result<Self, TrackerError> {
        config.validate()?;
        let (finished, _) = watch::channel(true);
        Ok(Self {
            inner: Arc::new(Inner {
                view,
                config,
                core: Mutex::new(Core {
                    state: TrackerState::idle(),
                    ids: RequestIdGenerator::new(),
                }),
                listener: Mutex::new(None),
                signals: DebounceScheduler::new(runtime),
                finished,
            }),
        })
    }

    pub fn view(&self) -> &ViewIdentity {
        &self.inner.view
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.inner.config
    }

    pub fn state(&self) -> TrackerState {
        self.inner.lock_core().state
    }

    pub fn is_load_finished(&self) -> bool {
        self.inner.lock_core().state.load_finished
    }

    /// Replaces the registered listener.
    pub fn set_listener(&self, listener: impl LoadFinishListener + 'static) {
        *self.inner.lock_listener() = Some(Arc::new(listener));
    }

    pub fn clear_listener(&self) {
        *self.inner.lock_listener() = None;
    }

    /// Starts tracking a new navigation, superseding any in flight.
    pub fn begin_navigation(&self, kind: NavigationKind) -> RequestId {
        self.inner.begin_navigation(kind)
    }

    /// Finishes the current navigation immediately, bypassing the delays.
    ///
    /// Returns `false` without notifying when no navigation is in flight.
    /// Unlike an engine-level stop, a stop while idle never reaches the
    /// listener, so it still hears at most once per navigation.
    pub fn cancel_navigation(&self) -> bool {
        self.inner.cancel_navigation()
    }

    pub fn on_progress_changed(&self, percent: i32) {
        self.inner.on_progress_changed(percent);
    }

    pub fn on_frame_drawn(&self) {
        self.inner.on_frame_drawn();
    }

    /// Mints the progress client the engine must report progress through.
    pub fn progress_client(&self) -> ProgressClient {
        ProgressClient::new(&self.inner)
    }

    pub(crate) fn subscribe_finished(&self) -> watch::Receiver<bool> {
        self.inner.finished.subscribe()
    }

    #[cfg(test)]
    pub(crate) fn pending_signals(&self) -> usize {
        self.inner.signals.armed_count()
    }

    /// Fires a signal as if its delay had just elapsed.
    #[cfg(test)]
    pub(crate) fn fire_signal(&self, kind: SignalKind, request: RequestId) {
        self.inner.resolve(kind, request);
    }
}

impl Inner {
    pub(crate) fn view(&self) -> &ViewIdentity {
        &self.view
    }

    fn lock_core(&self) -> MutexGuard<'_, Core> {
        self.core.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_listener(&self) -> MutexGuard<'_, Option<Arc<dyn LoadFinishListener>>> {
        self.listener.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn begin_navigation(&self, kind: NavigationKind) -> RequestId {
        let mut core = self.lock_core();
        let superseded = core.state.current_request;
        let request = core.ids.next_id();
        core.state.begin(request);
        // Stale signals would be fenced out by id anyway.
        self.signals.cancel_all();
        self.finished.send_replace(false);
        drop(core);

        tracing::debug!(view = %self.view, %request, %superseded, ?kind, "navigation started");
        request
    }

    fn cancel_navigation(&self) -> bool {
        let mut core = self.lock_core();
        if !core.state.in_flight() {
            tracing::trace!(view = %self.view, "stop with no navigation in flight");
            return false;
        }
        let request = core.state.finish();
        self.signals.cancel_all();
        self.finished.send_replace(true);
        drop(core);

        self.dispatch(request, Resolution::Stopped);
        true
    }

    pub(crate) fn on_progress_changed(self: &Arc<Self>, percent: i32) {
        if percent != 100 {
            tracing::trace!(view = %self.view, percent, "progress");
            return;
        }
        let mut core = self.lock_core();
        if !core.state.in_flight() {
            tracing::trace!(view = %self.view, "progress complete with no navigation in flight");
            return;
        }
        core.state.progress_complete = true;
        let request = core.state.current_request;
        self.arm(SignalKind::Default, request);
        drop(core);

        tracing::debug!(view = %self.view, %request, "progress complete");
    }

    fn on_frame_drawn(self: &Arc<Self>) {
        let core = self.lock_core();
        if !core.state.in_flight() || !core.state.progress_complete {
            return;
        }
        let request = core.state.current_request;
        self.arm(SignalKind::DrawConfirm, request);
    }

    /// Arms `kind` for `request`. Called with the core lock held so the id
    /// captured by the signal is the one current at arming time.
    fn arm(self: &Arc<Self>, kind: SignalKind, request: RequestId) {
        let delay = self.config.delay_for(kind);
        let owner = Arc::downgrade(self);
        let token = self.signals.arm(kind, delay, move || {
            if let Some(inner) = owner.upgrade() {
                inner.resolve(kind, request);
            }
        });
        tracing::trace!(
            view = %self.view,
            %request,
            kind = kind.name(),
            ?delay,
            ?token,
            "signal armed"
        );
    }

    fn resolve(&self, kind: SignalKind, request: RequestId) {
        let mut core = self.lock_core();
        if !core.state.accepts(request) {
            tracing::trace!(
                view = %self.view,
                %request,
                current = %core.state.current_request,
                kind = kind.name(),
                "stale signal dropped"
            );
            return;
        }
        let request = core.state.finish();
        self.signals.cancel_all();
        self.finished.send_replace(true);
        drop(core);

        self.dispatch(request, kind.into());
    }

    fn dispatch(&self, request: RequestId, resolution: Resolution) {
        tracing::debug!(view = %self.view, %request, ?resolution, "load finished");
        let listener = self.lock_listener().clone();
        if let Some(listener) = listener {
            listener.on_load_finish(&LoadFinished {
                view: self.view.clone(),
                request,
                resolution,
            });
        }
    }
}
