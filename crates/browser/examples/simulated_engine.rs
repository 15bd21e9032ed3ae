use loadfence_browser::{Engine, LoadFinished, ProgressClient, TrackedView, TrackerConfig};
use std::collections::HashMap;
use tokio::time::{Duration, sleep};
use tracing_subscriber::EnvFilter;

/// Pretends to load pages: progress climbs in steps on a background task.
struct ScriptedEngine {
    client: Option<ProgressClient>,
    step: Duration,
}

impl ScriptedEngine {
    fn new(step: Duration) -> Self {
        Self { client: None, step }
    }

    fn start(&self, what: &str) {
        println!("engine: loading {}", what);
        let Some(client) = self.client.clone() else {
            return;
        };
        let step = self.step;
        tokio::spawn(async move {
            for percent in [10, 35, 70, 100] {
                sleep(step).await;
                client.on_progress_changed(percent);
            }
        });
    }
}

impl Engine for ScriptedEngine {
    fn load_data(&mut self, data: &str, _: Option<&str>, _: Option<&str>) {
        self.start(&format!("{} bytes of inline data", data.len()));
    }

    fn load_data_with_base_url(
        &mut self,
        base_url: Option<&str>,
        data: &str,
        _: Option<&str>,
        _: Option<&str>,
        _: Option<&str>,
    ) {
        self.start(&format!(
            "{} bytes of inline data based at {}",
            data.len(),
            base_url.unwrap_or("about:blank")
        ));
    }

    fn load_url(&mut self, url: &str) {
        self.start(url);
    }

    fn load_url_with_headers(&mut self, url: &str, headers: &HashMap<String, String>) {
        self.start(&format!("{} with {} extra headers", url, headers.len()));
    }

    fn reload(&mut self) {
        self.start("reload");
    }

    fn stop_loading(&mut self) {
        println!("engine: stop");
    }

    fn set_progress_client(&mut self, client: ProgressClient) {
        self.client = Some(client);
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("loadfence=debug")),
        )
        .init();

    let config = TrackerConfig::try_from_env()?;
    let mut view = TrackedView::new(ScriptedEngine::new(Duration::from_millis(80)), "demo", config)?;
    view.set_load_finish_listener(|event: &LoadFinished| match serde_json::to_string(event) {
        Ok(line) => println!("finished: {}", line),
        Err(e) => eprintln!("failed to encode event: {}", e),
    });

    // A load that is left alone until a frame confirms it.
    view.load_url("https://example.com");
    draw_frames(&view, Duration::from_millis(600)).await;

    // A load superseded halfway through by a reload.
    view.load_data("<h1>hello</h1>", Some("text/html"), Some("utf-8"));
    sleep(Duration::from_millis(150)).await;
    view.reload();
    view.tracker()
        .wait_for_load_finish(Duration::from_secs(3))
        .await?;

    // A load stopped by the host.
    view.load_url("https://example.org/slow");
    sleep(Duration::from_millis(100)).await;
    view.stop_loading();

    println!("done, finished={}", view.is_load_finished());
    Ok(())
}

/// Simulates the host's render loop at roughly 60 fps.
async fn draw_frames(view: &TrackedView<ScriptedEngine>, total: Duration) {
    let frame = Duration::from_millis(16);
    let mut elapsed = Duration::ZERO;
    while elapsed < total {
        view.on_draw();
        sleep(frame).await;
        elapsed += frame;
    }
}
