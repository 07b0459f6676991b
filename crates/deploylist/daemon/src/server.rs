//! Server setup and lifecycle management

use crate::api::{create_router, rest::AppState};
use crate::config::DaemonConfig;
use crate::error::{DaemonError, DaemonResult};
use crate::scheduler::Scheduler;
use crate::storage::{load_manifests, FileStatusStore};
use deploylist_controller::{
    CredentialResolver, DirectorySecrets, GithubClientFactory, InMemoryObjectStore,
    InMemorySecrets, ObjectStore, Reconciler,
};
use deploylist_types::ListGithubDeployments;
use std::sync::Arc;
use tokio::net::TcpListener;

/// deploylist daemon server
pub struct Server {
    config: DaemonConfig,
    store: Arc<dyn ObjectStore>,
    scheduler: Arc<Scheduler>,
}

impl Server {
    /// Create a new server and apply the configured manifests
    pub async fn new(config: DaemonConfig) -> DaemonResult<Self> {
        let store: Arc<dyn ObjectStore> = match &config.storage.status_dir {
            Some(dir) => {
                tracing::info!(status_dir = %dir.display(), "Mirroring status to disk");
                Arc::new(FileStatusStore::new(
                    Arc::new(InMemoryObjectStore::new()),
                    dir.clone(),
                ))
            }
            None => Arc::new(InMemoryObjectStore::new()),
        };

        let credentials: Arc<dyn CredentialResolver> = match &config.secrets.dir {
            Some(dir) => Arc::new(DirectorySecrets::new(dir.clone())),
            None => {
                tracing::warn!("No secrets directory configured, tokenRef cannot be resolved");
                Arc::new(InMemorySecrets::new())
            }
        };

        let reconciler = Arc::new(Reconciler::new(
            ListGithubDeployments::object_kind(),
            store.clone(),
            credentials,
            Arc::new(GithubClientFactory::new(config.github.client_config())),
        ));
        let scheduler = Scheduler::new(config.scheduler.clone(), reconciler);

        for object in load_manifests(&config.storage.manifests).await? {
            let applied = store.apply(object).await?;
            tracing::info!(object = %applied.key(), "Applied manifest");
        }

        Ok(Self {
            config,
            store,
            scheduler,
        })
    }

    /// Run the server until a shutdown signal arrives
    pub async fn run(self) -> DaemonResult<()> {
        let addr = self.config.server.listen_addr;

        let state = AppState::new(self.store.clone(), self.scheduler.clone());
        let app = create_router(state, self.config.server.enable_cors);

        let listener = TcpListener::bind(addr).await?;
        tracing::info!("deploylist daemon listening on {}", addr);

        // Start scheduler in background
        let scheduler = tokio::spawn(self.scheduler.clone().start());

        // Run server with graceful shutdown
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| DaemonError::Server(e.to_string()))?;

        tracing::info!("deploylist daemon shutting down");

        // Stop scheduler and wait for in-flight passes
        self.scheduler.stop();
        scheduler
            .await
            .map_err(|e| DaemonError::Server(format!("scheduler task failed: {}", e)))?;

        Ok(())
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
