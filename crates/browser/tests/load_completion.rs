use loadfence_browser::{
    Engine, LoadFinished, ProgressClient, RequestId, Resolution, TrackedView, TrackerConfig,
    TrackerState,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{Instant, sleep};

#[derive(Default)]
struct FakeEngine {
    client: Option<ProgressClient>,
}

impl Engine for FakeEngine {
    fn load_data(&mut self, _: &str, _: Option<&str>, _: Option<&str>) {}
    fn load_data_with_base_url(
        &mut self,
        _: Option<&str>,
        _: &str,
        _: Option<&str>,
        _: Option<&str>,
        _: Option<&str>,
    ) {
    }
    fn load_url(&mut self, _: &str) {}
    fn load_url_with_headers(&mut self, _: &str, _: &HashMap<String, String>) {}
    fn reload(&mut self) {}
    fn stop_loading(&mut self) {}
    fn set_progress_client(&mut self, client: ProgressClient) {
        self.client = Some(client);
    }
}

#[derive(Debug, Clone, Copy)]
struct Seen {
    request: RequestId,
    resolution: Resolution,
    at: Instant,
}

struct Harness {
    view: TrackedView<FakeEngine>,
    progress: ProgressClient,
    seen: Arc<Mutex<Vec<Seen>>>,
    start: Instant,
}

impl Harness {
    fn new() -> Self {
        let view = TrackedView::new(FakeEngine::default(), "harness", TrackerConfig::default())
            .expect("tracked view");
        let progress = view.engine().client.clone().expect("progress client installed");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        view.set_load_finish_listener(move |event: &LoadFinished| {
            sink.lock().unwrap().push(Seen {
                request: event.request,
                resolution: event.resolution,
                at: Instant::now(),
            });
        });
        Self {
            view,
            progress,
            seen,
            start: Instant::now(),
        }
    }

    fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }

    fn since_start(&self, seen: &Seen) -> Duration {
        seen.at - self.start
    }
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn assert_around(actual: Duration, expected: Duration) {
    assert!(
        actual >= expected && actual <= expected + ms(5),
        "expected ~{expected:?}, got {actual:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn fresh_view_reports_finished() {
    let h = Harness::new();
    assert!(h.view.is_load_finished());
    assert_eq!(h.view.tracker().state(), TrackerState::idle());
}

#[tokio::test(start_paused = true)]
async fn starting_a_load_resets_finished() {
    let mut h = Harness::new();
    h.view.load_url("https://example.test");
    assert!(!h.view.is_load_finished());

    sleep(ms(5000)).await;
    assert!(!h.view.is_load_finished(), "no progress was reported");
    assert!(h.seen().is_empty());
}

#[tokio::test(start_paused = true)]
async fn progress_complete_finishes_after_default_delay() {
    let mut h = Harness::new();
    h.view.load_url("https://example.test");
    let request = h.view.tracker().state().current_request;
    h.progress.on_progress_changed(40);
    h.progress.on_progress_changed(100);

    sleep(ms(990)).await;
    assert!(h.seen().is_empty());
    assert!(!h.view.is_load_finished());

    sleep(ms(20)).await;
    let seen = h.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].request, request);
    assert_eq!(seen[0].resolution, Resolution::Default);
    assert_around(h.since_start(&seen[0]), ms(1000));
    assert!(h.view.is_load_finished());
    assert!(h.view.tracker().state().current_request.is_idle());
}

#[tokio::test(start_paused = true)]
async fn frame_after_progress_confirms_early() {
    let mut h = Harness::new();
    h.view.load_data("<p>hello</p>", Some("text/html"), Some("utf-8"));
    h.progress.on_progress_changed(100);
    h.view.on_draw();

    sleep(ms(105)).await;
    let seen = h.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].resolution, Resolution::DrawConfirm);
    assert_around(h.since_start(&seen[0]), ms(100));
    assert!(h.view.is_load_finished());

    // The default delay passing must not notify a second time.
    sleep(ms(2000)).await;
    assert_eq!(h.seen().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn superseded_navigation_never_finishes() {
    let mut h = Harness::new();
    h.view.load_url("https://first.test");
    let first = h.view.tracker().state().current_request;
    h.progress.on_progress_changed(100);

    sleep(ms(500)).await;
    h.view.load_url("https://second.test");
    let second = h.view.tracker().state().current_request;
    assert!(second > first);

    sleep(ms(700)).await;
    assert!(h.seen().is_empty(), "signal for {first} must be fenced out");
    assert!(!h.view.is_load_finished());

    h.progress.on_progress_changed(100);
    sleep(ms(1001)).await;
    let seen = h.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].request, second);
}

#[tokio::test(start_paused = true)]
async fn signals_without_navigation_are_ignored() {
    let h = Harness::new();
    h.progress.on_progress_changed(100);
    h.view.on_draw();
    h.view.on_draw();
    assert_eq!(h.view.tracker().state(), TrackerState::idle());

    sleep(ms(5000)).await;
    assert!(h.seen().is_empty());
    assert!(h.view.is_load_finished());
}

#[tokio::test(start_paused = true)]
async fn stop_finishes_immediately() {
    let mut h = Harness::new();
    h.view.reload();
    let request = h.view.tracker().state().current_request;
    h.view.stop_loading();

    let seen = h.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].request, request);
    assert_eq!(seen[0].resolution, Resolution::Stopped);
    assert_eq!(h.since_start(&seen[0]), Duration::ZERO);
    assert!(h.view.is_load_finished());

    // Late signals of the stopped navigation change nothing.
    h.progress.on_progress_changed(100);
    h.view.on_draw();
    sleep(ms(2000)).await;
    assert_eq!(h.seen().len(), 1);
    assert!(h.view.is_load_finished());
}

#[tokio::test(start_paused = true)]
async fn stop_after_progress_discards_pending_signals() {
    let mut h = Harness::new();
    h.view.load_url("https://example.test");
    h.progress.on_progress_changed(100);
    h.view.on_draw();
    h.view.stop_loading();

    sleep(ms(2000)).await;
    let seen = h.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].resolution, Resolution::Stopped);
}

#[tokio::test(start_paused = true)]
async fn frame_bursts_collapse_into_one_confirmation() {
    let mut h = Harness::new();
    h.view.load_url("https://example.test");
    h.progress.on_progress_changed(100);

    h.view.on_draw();
    sleep(ms(50)).await;
    h.view.on_draw();
    sleep(ms(50)).await;
    h.view.on_draw();

    sleep(ms(50)).await;
    assert!(h.seen().is_empty(), "earlier draws were re-armed");

    sleep(ms(60)).await;
    let seen = h.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].resolution, Resolution::DrawConfirm);
    // Timed from the last draw.
    assert_around(h.since_start(&seen[0]), ms(200));

    sleep(ms(2000)).await;
    assert_eq!(h.seen().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn each_navigation_notifies_once() {
    let mut h = Harness::new();
    for round in 0..3u64 {
        h.view.load_url("https://example.test");
        h.progress.on_progress_changed(100);
        h.view.on_draw();
        sleep(ms(150)).await;
        assert_eq!(h.seen().len() as u64, round + 1);
    }
    let seen = h.seen();
    assert!(seen.windows(2).all(|w| w[0].request < w[1].request));
}

#[tokio::test(start_paused = true)]
async fn waiting_host_sees_completion() {
    let mut h = Harness::new();
    h.view.load_url("https://example.test");
    h.progress.on_progress_changed(100);
    h.view.on_draw();

    h.view.tracker().wait_for_load_finish(ms(500)).await.unwrap();
    assert_eq!(h.seen().len(), 1);
}
