//! Main controller implementation.
//!
//! This module contains the `Controller` struct that builds the Kubernetes
//! client, starts the ConfigMap and Pod watchers, waits for both caches to
//! sync and then runs until a shutdown signal arrives.

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::handlers::Handlers;
use crate::watcher::{StreamState, Watcher};
use configmap_refs::{NotificationSink, ResourceKind, ReverseIndex, TracingSink};
use k8s_openapi::api::core::v1::{ConfigMap, Pod};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

type WatcherHandle = JoinHandle<Result<(), ControllerError>>;

/// Main controller for ConfigMap reference tracking.
pub struct Controller {
    handlers: Arc<Handlers>,
    config_map_watcher: WatcherHandle,
    pod_watcher: WatcherHandle,
    config_map_state: watch::Receiver<StreamState>,
    pod_state: watch::Receiver<StreamState>,
    shutdown: watch::Sender<bool>,
    cache_sync_timeout: Duration,
}

impl Controller {
    /// Creates a new controller instance and starts both watchers.
    pub async fn new(config: ControllerConfig) -> Result<Self, ControllerError> {
        info!("Initializing ConfigMap Watch Controller");

        let client = build_client(config.kubeconfig.as_deref()).await?;
        let sink: Arc<dyn NotificationSink> = Arc::new(TracingSink);

        Ok(Self::start(client, &config, sink))
    }

    fn start(client: Client, config: &ControllerConfig, sink: Arc<dyn NotificationSink>) -> Self {
        let (config_map_api, pod_api): (Api<ConfigMap>, Api<Pod>) =
            match config.namespace.as_deref() {
                Some(ns) => (Api::namespaced(client.clone(), ns), Api::namespaced(client, ns)),
                None => (Api::all(client.clone()), Api::all(client)),
            };

        let handlers = Arc::new(Handlers::new(Arc::new(ReverseIndex::new()), sink));
        let (shutdown, shutdown_rx) = watch::channel(false);

        let (mut config_map_watcher, config_map_state) = Watcher::<ConfigMap>::new(
            ResourceKind::ConfigMap,
            Arc::<Handlers>::clone(&handlers),
            config.resync_period,
        );
        let (mut pod_watcher, pod_state) =
            Watcher::<Pod>::new(ResourceKind::Pod, Arc::<Handlers>::clone(&handlers), config.resync_period);
        config_map_watcher.sync_with(pod_watcher.readiness());
        pod_watcher.sync_with(config_map_watcher.readiness());

        info!("Starting informers...");
        let config_map_watcher =
            tokio::spawn(config_map_watcher.run(config_map_api, shutdown_rx.clone()));
        let pod_watcher = tokio::spawn(pod_watcher.run(pod_api, shutdown_rx));

        Self {
            handlers,
            config_map_watcher,
            pod_watcher,
            config_map_state,
            pod_state,
            shutdown,
            cache_sync_timeout: config.cache_sync_timeout,
        }
    }

    /// Runs the controller until shutdown.
    ///
    /// Fails if either cache does not sync in time or a watcher exits on its
    /// own.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        let signal = shutdown_signal();
        tokio::pin!(signal);

        let synced = tokio::select! {
            () = &mut signal => false,
            result = wait_for_sync(
                [
                    (ResourceKind::ConfigMap, &mut self.config_map_state),
                    (ResourceKind::Pod, &mut self.pod_state),
                ],
                self.cache_sync_timeout,
            ) => {
                result?;
                true
            }
        };

        if synced {
            info!("Informers running");
            tokio::select! {
                () = &mut signal => {}
                result = &mut self.config_map_watcher => {
                    return joined(ResourceKind::ConfigMap, result);
                }
                result = &mut self.pod_watcher => {
                    return joined(ResourceKind::Pod, result);
                }
            }
        }

        info!("Shutdown signal received");
        self.shutdown.send_replace(true);
        let (config_maps, pods) = tokio::join!(self.config_map_watcher, self.pod_watcher);
        joined(ResourceKind::ConfigMap, config_maps)?;
        joined(ResourceKind::Pod, pods)?;

        let index = self.handlers.index();
        info!(
            pods = index.len(),
            config_maps = index.key_count(),
            "Controller stopped"
        );
        Ok(())
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("config_map_state", &*self.config_map_state.borrow())
            .field("pod_state", &*self.pod_state.borrow())
            .field("cache_sync_timeout", &self.cache_sync_timeout)
            .finish_non_exhaustive()
    }
}

/// Builds a client from an explicit kubeconfig, or the default chain
/// (in-cluster service account, then `KUBECONFIG`).
async fn build_client(kubeconfig: Option<&Path>) -> Result<Client, ControllerError> {
    match kubeconfig {
        Some(path) => {
            info!("Loading kubeconfig from {}", path.display());
            let kubeconfig = Kubeconfig::read_from(path)?;
            let options = KubeConfigOptions::default();
            let config = kube::Config::from_custom_kubeconfig(kubeconfig, &options).await?;
            Ok(Client::try_from(config)?)
        }
        None => Ok(Client::try_default().await?),
    }
}

/// Waits until every stream reports `Running`, sharing one deadline.
///
/// A watcher task that exits drops its state sender, which fails the wait.
async fn wait_for_sync<const N: usize>(
    streams: [(ResourceKind, &mut watch::Receiver<StreamState>); N],
    timeout: Duration,
) -> Result<(), ControllerError> {
    let deadline = tokio::time::Instant::now() + timeout;
    for (kind, state) in streams {
        tokio::time::timeout_at(deadline, state.wait_for(|s| *s == StreamState::Running))
            .await
            .map_err(|_elapsed| ControllerError::CacheSync { kind, timeout })?
            .map_err(|_closed| {
                ControllerError::Watch(format!("{kind} watcher stopped before its cache synced"))
            })?;
    }
    Ok(())
}

fn joined(
    kind: ResourceKind,
    result: Result<Result<(), ControllerError>, tokio::task::JoinError>,
) -> Result<(), ControllerError> {
    result.map_err(|e| ControllerError::Watch(format!("{kind} watcher panicked: {e}")))?
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
