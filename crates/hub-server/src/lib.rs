//! # hub-server
//!
//! Process wiring for the identity federation hub.
//!
//! Builds the shared store (Redis when `REDIS_URL` is set, process memory
//! otherwise), the validation pipeline, the session state machine and the
//! matching service health checker, then serves the operations endpoints
//! and runs the health loop until a shutdown signal arrives.
//!
//! ## Usage
//!
//! ```ignore
//! use hub_server::{Server, ServerConfig};
//!
//! let config = ServerConfig::from_env()?;
//! let server = Server::new(config).await?;
//! server.run().await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod federation;
pub mod health_client;
pub mod router;
pub mod state;

pub use config::ServerConfig;
pub use federation::FederationFile;
pub use health_client::HttpHealthClient;
pub use router::create_router;
pub use state::AppState;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use hub_cache::{MemoryStore, SharedStoreRef, StoreReplayCache};
use hub_cache_redis::{RedisConfig, RedisStore};
use hub_health::{HealthChecker, MatchingServiceEndpoint};
use hub_policy::PolicyStateMachine;
use hub_saml::ValidationPipeline;
use tokio::net::TcpListener;
use tokio::sync::watch;

const PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// The hub service.
pub struct Server {
    config: ServerConfig,
    state: AppState,
    matching_services: Vec<MatchingServiceEndpoint>,
    memory_store: Option<Arc<MemoryStore>>,
}

impl Server {
    /// Creates a new server instance.
    ///
    /// Connects to Redis if configured and loads the federation file.
    pub async fn new(config: ServerConfig) -> anyhow::Result<Self> {
        let (store, memory_store) = match &config.redis_url {
            Some(url) => {
                let redis = RedisStore::new(
                    RedisConfig::from_url(url.clone()).key_prefix(config.redis_key_prefix.clone()),
                )
                .await?;
                tracing::info!("Redis store connected");
                let store: SharedStoreRef = Arc::new(redis);
                (store, None)
            }
            None => {
                tracing::warn!("REDIS_URL not set, keeping hub state in process memory");
                let memory = Arc::new(MemoryStore::new());
                let store: SharedStoreRef = memory.clone();
                (store, Some(memory))
            }
        };

        let federation = match &config.federation_file {
            Some(path) => FederationFile::load(path)?,
            None => {
                tracing::warn!("HUB_FEDERATION_FILE not set, starting with an empty federation");
                FederationFile::default()
            }
        };
        tracing::info!(
            transactions = federation.transactions.len(),
            identity_providers = federation.identity_providers.len(),
            countries = federation.countries.len(),
            matching_services = federation.matching_services.len(),
            "federation loaded"
        );

        let pipeline = ValidationPipeline::new(
            config.hub.clone(),
            Arc::new(federation.metadata()?),
            federation::decryption_keys(&config.encryption_keys)?,
            Arc::new(StoreReplayCache::new(
                store.clone(),
                "request",
                Duration::from_secs(config.hub.request_replay_window_secs),
            )),
            Arc::new(StoreReplayCache::new(
                store.clone(),
                "assertion",
                Duration::from_secs(config.hub.assertion_replay_window_secs),
            )),
        );

        let machine = PolicyStateMachine::new(store, Arc::new(federation.config_service()), &config.hub);
        let client = HttpHealthClient::new(config.health_request_timeout())?;
        let health = HealthChecker::new(Arc::new(client), Arc::new(pipeline));

        Ok(Self {
            state: AppState::new(Arc::new(machine), Arc::new(health)),
            matching_services: federation.matching_services,
            memory_store,
            config,
        })
    }

    /// Runs the server.
    ///
    /// This starts the HTTP server and the health loop and blocks until it
    /// receives a shutdown signal.
    pub async fn run(self) -> anyhow::Result<()> {
        let (stop_tx, stop_rx) = watch::channel(false);

        let health = Arc::clone(&self.state.health);
        let endpoints = self.matching_services.clone();
        let health_loop = tokio::spawn({
            let stop = stopped(stop_rx.clone());
            async move { health.run(&endpoints, stop).await }
        });

        let purge_loop = self.memory_store.clone().map(|memory| {
            let stop = stopped(stop_rx.clone());
            tokio::spawn(async move {
                tokio::pin!(stop);
                let mut ticker = tokio::time::interval(PURGE_INTERVAL);
                loop {
                    tokio::select! {
                        () = &mut stop => return,
                        _ = ticker.tick() => {
                            let purged = memory.purge_expired();
                            tracing::debug!(purged, "expired entries purged");
                        }
                    }
                }
            })
        });

        let app = create_router(self.state.clone());
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port).parse()?;
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Server listening on http://{}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        let _ = stop_tx.send(true);
        health_loop.await?;
        if let Some(purge_loop) = purge_loop {
            purge_loop.await?;
        }

        tracing::info!("Server shutdown complete");
        Ok(())
    }

    /// Returns the server configuration.
    #[must_use]
    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Creates a router without starting the server.
    pub fn test_router(&self) -> Router {
        create_router(self.state.clone())
    }
}

async fn stopped(mut rx: watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}

/// Waits for a shutdown signal.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
