use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Identifier of a single navigation.
///
/// Ids are only ever compared for equality against the tracker's current id;
/// `RequestId::IDLE` stands for "no navigation in flight".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(u64);

impl RequestId {
    pub const IDLE: RequestId = RequestId(0);

    pub fn is_idle(self) -> bool {
        self == Self::IDLE
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_idle() {
            write!(f, "idle")
        } else {
            write!(f, "#{}", self.0)
        }
    }
}

/// Mints strictly increasing request ids. Never returns `RequestId::IDLE`.
#[derive(Debug, Default)]
pub struct RequestIdGenerator {
    last: u64,
}

impl RequestIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> RequestId {
        self.last += 1;
        RequestId(self.last)
    }
}

/// The two kinds of delayed completion signal, one per raw source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    /// Armed when progress reaches 100%, fires after the long default delay.
    Default,
    /// Armed on every frame drawn after progress reached 100%, fires after the short delay.
    DrawConfirm,
}

impl SignalKind {
    pub fn name(self) -> &'static str {
        match self {
            SignalKind::Default => "default",
            SignalKind::DrawConfirm => "draw_confirm",
        }
    }
}

/// The host entry point that started a navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationKind {
    LoadData,
    LoadDataWithBaseUrl,
    LoadUrl,
    LoadUrlWithHeaders,
    Reload,
}

/// What ended a navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Default,
    DrawConfirm,
    /// The host stopped loading explicitly.
    Stopped,
}

impl From<SignalKind> for Resolution {
    fn from(kind: SignalKind) -> Self {
        match kind {
            SignalKind::Default => Resolution::Default,
            SignalKind::DrawConfirm => Resolution::DrawConfirm,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewId(Uuid);

impl ViewId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ViewId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Identity of the view a tracker belongs to, handed to the listener on every finish.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ViewIdentity {
    pub id: ViewId,
    /// Free-form label supplied by the host, e.g. the concrete view type.
    pub description: String,
}

impl ViewIdentity {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            id: ViewId::new(),
            description: description.into(),
        }
    }
}

impl fmt::Display for ViewIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.description.is_empty() {
            write!(f, "{}", self.id)
        } else {
            write!(f, "{} ({})", self.description, self.id)
        }
    }
}

/// Completion state of the tracked view.
///
/// `load_finished` implies `current_request` is idle. All three fields are
/// read and written together under the tracker's lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerState {
    pub load_finished: bool,
    pub progress_complete: bool,
    pub current_request: RequestId,
}

impl Default for TrackerState {
    fn default() -> Self {
        Self::idle()
    }
}

impl TrackerState {
    pub const fn idle() -> Self {
        Self {
            load_finished: true,
            progress_complete: false,
            current_request: RequestId::IDLE,
        }
    }

    pub fn in_flight(&self) -> bool {
        !self.current_request.is_idle()
    }

    /// Resets the flags for a freshly minted navigation id.
    pub fn begin(&mut self, request: RequestId) {
        self.load_finished = false;
        self.progress_complete = false;
        self.current_request = request;
    }

    /// Whether a delayed signal captured for `request` may resolve the navigation now.
    pub fn accepts(&self, request: RequestId) -> bool {
        self.progress_complete && request == self.current_request && !request.is_idle()
    }

    /// Marks the current navigation finished and returns its id.
    pub fn finish(&mut self) -> RequestId {
        let request = self.current_request;
        self.load_finished = true;
        self.current_request = RequestId::IDLE;
        request
    }
}

/// Emitted exactly once when a navigation resolves or is stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadFinished {
    pub view: ViewIdentity,
    pub request: RequestId,
    pub resolution: Resolution,
}

/// Receiver of load-finished notifications. At most one is registered per tracker.
///
/// Called outside the tracker's lock, so implementations may call back into the tracker.
pub trait LoadFinishListener: Send + Sync {
    fn on_load_finish(&self, event: &LoadFinished);
}

impl<F> LoadFinishListener for F
where
    F: Fn(&LoadFinished) + Send + Sync,
{
    fn on_load_finish(&self, event: &LoadFinished) {
        self(event)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// A progress client minted for another view was installed. Progress would
    /// bypass this view's tracker and its load would never be reported finished.
    #[error("progress client belongs to view {actual}, expected one minted for view {expected}")]
    ForeignProgressClient { expected: ViewId, actual: ViewId },

    #[error("no tokio runtime available to schedule completion signals")]
    NoRuntime,

    #[error("page load did not finish within {timeout:?}")]
    LoadTimeout { timeout: Duration },

    #[error("invalid configuration value for {key}: {value:?}")]
    InvalidConfig { key: String, value: String },
}

impl TrackerError {
    pub fn invalid_config(key: impl Into<String>, value: impl Into<String>) -> Self {
        TrackerError::InvalidConfig {
            key: key.into(),
            value: value.into(),
        }
    }
}
