use loadfence_core::{LoadFinishListener, NavigationKind, TrackerError, ViewIdentity};
use std::collections::HashMap;

use crate::progress::ProgressClient;
use crate::shared::TrackerConfig;
use crate::tracker::LoadTracker;

/// The browser engine behind a [`TrackedView`].
///
/// Rendering, fetching and URL policy all stay inside the engine. The view
/// only needs to start and stop loads and to hand over the client the engine
/// reports progress through.
pub trait Engine {
    fn load_data(&mut self, data: &str, mime_type: Option<&str>, encoding: Option<&str>);

    fn load_data_with_base_url(
        &mut self,
        base_url: Option<&str>,
        data: &str,
        mime_type: Option<&str>,
        encoding: Option<&str>,
        history_url: Option<&str>,
    );

    fn load_url(&mut self, url: &str);

    fn load_url_with_headers(&mut self, url: &str, headers: &HashMap<String, String>);

    fn reload(&mut self);

    fn stop_loading(&mut self);

    /// Installs the callback the engine must report load progress to.
    fn set_progress_client(&mut self, client: ProgressClient);
}

/// A browser view whose loads are tracked to completion.
///
/// Every load entry point resets the tracker before handing the request to the
/// engine, and the engine reports progress through a client minted by this
/// view's tracker. The host forwards frame draws to [`TrackedView::on_draw`].
pub struct TrackedView<E: Engine> {
    engine: E,
    tracker: LoadTracker,
}

impl<E: Engine> TrackedView<E> {
    pub fn new(
        mut engine: E,
        description: impl Into<String>,
        config: TrackerConfig,
    ) -> Result<Self, TrackerError> {
        let tracker = LoadTracker::new(ViewIdentity::new(description), config)?;
        engine.set_progress_client(tracker.progress_client());
        tracing::debug!(view = %tracker.view(), "tracked view created");
        Ok(Self { engine, tracker })
    }

    pub fn identity(&self) -> &ViewIdentity {
        self.tracker.view()
    }

    pub fn description(&self) -> &str {
        &self.tracker.view().description
    }

    pub fn tracker(&self) -> &LoadTracker {
        &self.tracker
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn is_load_finished(&self) -> bool {
        self.tracker.is_load_finished()
    }

    pub fn set_load_finish_listener(&self, listener: impl LoadFinishListener + 'static) {
        self.tracker.set_listener(listener);
    }

    /// Replaces the engine's progress client.
    ///
    /// Only clients minted by this view's own tracker are accepted, even if
    /// another tracker carries the same view identity. Any other client would
    /// keep progress from reaching the tracker and the view would never report
    /// its load finished.
    pub fn set_progress_client(&mut self, client: ProgressClient) -> Result<(), TrackerError> {
        if !client.routes_to(&self.tracker) {
            return Err(TrackerError::ForeignProgressClient {
                expected: self.identity().id,
                actual: client.view(),
            });
        }
        self.engine.set_progress_client(client);
        Ok(())
    }

    pub fn load_data(&mut self, data: &str, mime_type: Option<&str>, encoding: Option<&str>) {
        self.tracker.begin_navigation(NavigationKind::LoadData);
        self.engine.load_data(data, mime_type, encoding);
    }

    pub fn load_data_with_base_url(
        &mut self,
        base_url: Option<&str>,
        data: &str,
        mime_type: Option<&str>,
        encoding: Option<&str>,
        history_url: Option<&str>,
    ) {
        self.tracker.begin_navigation(NavigationKind::LoadDataWithBaseUrl);
        self.engine
            .load_data_with_base_url(base_url, data, mime_type, encoding, history_url);
    }

    pub fn load_url(&mut self, url: &str) {
        self.tracker.begin_navigation(NavigationKind::LoadUrl);
        self.engine.load_url(url);
    }

    pub fn load_url_with_headers(&mut self, url: &str, headers: &HashMap<String, String>) {
        self.tracker.begin_navigation(NavigationKind::LoadUrlWithHeaders);
        self.engine.load_url_with_headers(url, headers);
    }

    pub fn reload(&mut self) {
        self.tracker.begin_navigation(NavigationKind::Reload);
        self.engine.reload();
    }

    /// Stops the engine, then reports the current navigation finished.
    pub fn stop_loading(&mut self) {
        self.engine.stop_loading();
        self.tracker.cancel_navigation();
    }

    /// Frame-drawn hook, called by the host after every render pass.
    pub fn on_draw(&self) {
        self.tracker.on_frame_drawn();
    }
}
