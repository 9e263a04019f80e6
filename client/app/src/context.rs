//! Application root wiring
//!
//! Owns the one query cache and the one session gate of the process and
//! hands them to the components that need them.

use anyhow::{Context, Result};
use feed_pagination::FeedPager;
use mutation_coordinator::{MutationCoordinator, MutationResult, Notifier};
use prometheus::Registry;
use query_cache::{CacheMetrics, QueryCache};
use remote_ops::{HttpPlatform, Platform, RemoteOps};
use session_gate::{
    FileSessionFlagStore, MemorySessionFlagStore, Navigator, SessionFlagStore, SessionGate,
    SessionState,
};
use std::sync::Arc;
use tracing::info;

use crate::config::ClientConfig;
use crate::queries::Queries;

pub struct AppContext {
    pub config: ClientConfig,
    pub ops: RemoteOps,
    pub cache: QueryCache,
    pub queries: Queries,
    pub feed: Arc<FeedPager>,
    pub gate: Arc<SessionGate>,
    pub mutations: Arc<MutationCoordinator>,
    pub registry: Registry,
}

impl AppContext {
    /// Wire everything against the hosted platform over HTTP
    pub fn from_config(
        config: ClientConfig,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let platform = HttpPlatform::new(config.platform.clone())
            .context("Failed to create platform client")?;
        Self::with_platform(config, Arc::new(platform), navigator, notifier)
    }

    pub fn with_platform(
        config: ClientConfig,
        platform: Arc<dyn Platform>,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let registry = Registry::new();
        let metrics = CacheMetrics::new();
        if config.app.metrics_enabled {
            CacheMetrics::register(&registry).context("Failed to register cache metrics")?;
        }

        let ops = RemoteOps::new(platform);
        let cache = QueryCache::with_metrics(metrics);

        let flags: Arc<dyn SessionFlagStore> = match &config.session.flag_path {
            Some(path) => Arc::new(FileSessionFlagStore::new(path.clone())),
            None => Arc::new(MemorySessionFlagStore::new()),
        };
        let gate = Arc::new(SessionGate::new(Arc::new(ops.clone()), navigator, flags));

        let feed = Arc::new(FeedPager::with_config(
            Arc::new(ops.clone()),
            cache.clone(),
            config.feed.pager_config(),
        ));
        let mutations = Arc::new(MutationCoordinator::new(
            ops.clone(),
            cache.clone(),
            gate.clone(),
            notifier,
        ));
        let queries = Queries::new(ops.clone(), cache.clone());

        info!(
            env = %config.app.env,
            page_size = config.feed.page_size,
            "Application context ready"
        );

        Ok(Self {
            config,
            ops,
            cache,
            queries,
            feed,
            gate,
            mutations,
            registry,
        })
    }

    /// Startup session check; runs once per process
    pub async fn initialize(&self) -> SessionState {
        let state = self.gate.initialize().await;
        info!(?state, "Client initialized");
        state
    }

    /// Sign out and drop everything cached for the previous account
    pub async fn sign_out(&self) -> MutationResult<()> {
        self.mutations.sign_out().await?;
        self.feed.reset();
        self.cache.clear();
        Ok(())
    }

    pub fn shutdown(&self) {
        self.gate.shutdown();
        let stats = self.mutations.stats().snapshot();
        info!(
            succeeded = stats.succeeded,
            failed = stats.failed,
            rolled_back = stats.rolled_back,
            cached_entries = self.cache.stats().entries,
            "Client shut down"
        );
    }
}
