//! Reliable "page load finished" detection for embedded browser views.
//!
//! Browser engines report loading through two unreliable hints: a progress
//! callback that may reach 100% before the page has settled, and a draw
//! callback that fires on every frame. [`LoadTracker`] correlates the two into
//! one debounced notification per navigation, and [`TrackedView`] wires a
//! tracker between a host application and its [`Engine`].
//!
//! ```ignore
//! let mut view = TrackedView::new(engine, "article", TrackerConfig::default())?;
//! view.set_load_finish_listener(|event: &LoadFinished| {
//!     println!("{} finished ({:?})", event.view, event.resolution);
//! });
//! view.load_url("https://example.com");
//! // the engine reports progress through its ProgressClient,
//! // the host calls view.on_draw() after every frame.
//! ```

pub mod progress;
pub mod shared;
pub mod tracker;
pub mod view;
mod wait;

pub use loadfence_core::{
    LoadFinishListener, LoadFinished, NavigationKind, RequestId, Resolution, SignalKind,
    TrackerError, TrackerState, ViewId, ViewIdentity,
};
pub use progress::ProgressClient;
pub use shared::TrackerConfig;
pub use tracker::LoadTracker;
pub use view::{Engine, TrackedView};
