use anyhow::{Context, Result};
use mutation_coordinator::TracingNotifier;
use session_gate::{MemoryNavigator, Navigator, SessionState};
use snapgram_client::{init_tracing, AppContext, ClientConfig};
use std::sync::Arc;
use tracing::{info, warn};

/// Headless session: run the startup check and load the first feed page
#[tokio::main]
async fn main() -> Result<()> {
    let config = ClientConfig::from_env().context("Failed to load configuration")?;
    init_tracing(config.app.json_logs)?;

    info!("Starting snapgram-client");

    let navigator = Arc::new(MemoryNavigator::default());
    let ctx = AppContext::from_config(config, navigator.clone(), Arc::new(TracingNotifier))?;

    match ctx.initialize().await {
        SessionState::Authenticated => {
            let pages = ctx.feed.pages().await.context("Failed to load feed")?;
            info!(
                posts = pages.items().len(),
                has_next_page = pages.has_next_page(),
                "Feed loaded"
            );

            match ctx.queries.recent_posts().await {
                Ok(recent) => info!(count = recent.value.len(), "Recent posts loaded"),
                Err(e) => warn!(error = %e, "Failed to load recent posts"),
            }
        }
        state => info!(?state, route = %navigator.current(), "No active session"),
    }

    ctx.shutdown();
    Ok(())
}
