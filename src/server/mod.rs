mod routes;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;

use crate::audio::features::DisplaySettings;
use crate::render::html::PageOptions;
use crate::templates::loader::Shell;

pub use routes::make_app;

/// Everything a request handler needs; shared read-only across requests.
#[derive(Clone)]
pub struct ServerState {
    pub defaults: DisplaySettings,
    pub seed: Option<u64>,
    /// Pause applied before answering an Analyze request.
    pub latency: Duration,
    pub page: PageOptions,
    pub max_upload_bytes: usize,
    pub shell: Arc<Shell>,
}

impl ServerState {
    /// Fixed seed: every pass reproduces the same values. Otherwise each pass is fresh.
    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }
}

pub async fn run(state: ServerState, bind: &str) -> Result<()> {
    let app = make_app(state);
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    log::info!("Dashboard listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await.context("HTTP server failed")?;
    Ok(())
}
