//! Kubernetes resource watchers.
//!
//! One `Watcher` runs per resource kind. It drives a `kube_runtime::watcher`
//! stream through an [`Informer`] and dispatches the resulting notifications
//! to the handlers one at a time, so ordering within a kind is preserved.
//! The two kinds run as independent tasks that share the reverse index and
//! a sync barrier: after its own initial list a stream waits for its peers'
//! stores before it enters `Running` and dispatches live events.

use crate::error::ControllerError;
use crate::handlers::{Dispatch, deliver};
use crate::informer::Informer;
use configmap_refs::ResourceKind;
use futures::future::{self, BoxFuture};
use futures::{FutureExt, Stream, StreamExt};
use kube::{Api, Resource};
use kube_runtime::{WatchStreamExt, watcher};
use serde::de::DeserializeOwned;
use std::fmt::{Debug, Display};
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Lifecycle of a single watch stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Task created, watch not yet opened
    NotStarted,
    /// Initial list-and-replay in progress, or waiting for peer streams
    Syncing,
    /// Every cache synced, dispatching live events
    Running,
    /// Terminal; reached only through shutdown
    Stopped,
}

/// Resolves to `true` once a store has completed its first list, or to
/// `false` if its writer was dropped before that.
pub type Readiness = BoxFuture<'static, bool>;

enum Step<E> {
    Shutdown,
    Resync,
    Next(Option<E>),
}

/// Watches one resource kind and feeds its handler.
pub struct Watcher<K>
where
    K: Resource + Clone + 'static,
    K::DynamicType: Eq + Hash + Clone,
{
    kind: ResourceKind,
    handler: Arc<dyn Dispatch<K>>,
    informer: Informer<K>,
    peers: Vec<Readiness>,
    resync_period: Option<Duration>,
    state: watch::Sender<StreamState>,
}

impl<K> Watcher<K>
where
    K: Resource + Clone + DeserializeOwned + Debug + Send + Sync + 'static,
    K::DynamicType: Default + Eq + Hash + Clone + Send + Sync,
{
    /// Creates a watcher. The receiver tracks its [`StreamState`].
    pub fn new(
        kind: ResourceKind,
        handler: Arc<dyn Dispatch<K>>,
        resync_period: Option<Duration>,
    ) -> (Self, watch::Receiver<StreamState>) {
        let (state, state_rx) = watch::channel(StreamState::NotStarted);
        (
            Self {
                kind,
                handler,
                informer: Informer::new(kind),
                peers: Vec::new(),
                resync_period,
                state,
            },
            state_rx,
        )
    }

    /// Readiness of this watcher's store, for peers to wait on
    pub fn readiness(&self) -> Readiness {
        let store = self.informer.store();
        async move { store.wait_until_ready().await.is_ok() }.boxed()
    }

    /// Holds this stream in `Syncing` until `peer` is ready as well.
    pub fn sync_with(&mut self, peer: Readiness) {
        self.peers.push(peer);
    }

    /// Watches `api` until `shutdown` flips to true.
    ///
    /// Watch errors are retried with the watcher's default backoff.
    pub async fn run(
        self,
        api: Api<K>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<(), ControllerError> {
        info!("Starting {} watcher", self.kind);
        let stream = watcher(api, watcher::Config::default())
            .default_backoff()
            .boxed();
        self.drive(stream, shutdown).await
    }

    /// Consumes a watch event stream until shutdown.
    ///
    /// Each event is fully dispatched before the next one is polled, so a
    /// shutdown request never interrupts a handler. Events still queued in
    /// the stream are not drained. A stream that ends on its own is an error
    /// and leaves the state where it was.
    pub async fn drive<S, E>(
        mut self,
        mut stream: S,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), ControllerError>
    where
        S: Stream<Item = Result<watcher::Event<K>, E>> + Unpin,
        E: Display,
    {
        self.state.send_replace(StreamState::Syncing);
        let mut resync = self.resync_period.map(resync_interval);

        loop {
            let running = *self.state.borrow() == StreamState::Running;
            let step = tokio::select! {
                biased;
                _ = shutdown.wait_for(|stop| *stop) => Step::Shutdown,
                () = tick(&mut resync), if running => Step::Resync,
                next = stream.next() => Step::Next(next),
            };

            match step {
                Step::Shutdown => break,
                Step::Resync => {
                    let notifications = self.informer.resync();
                    debug!(kind = %self.kind, count = notifications.len(), "Resyncing cache");
                    for notification in notifications {
                        deliver(self.handler.as_ref(), self.kind, notification);
                    }
                }
                Step::Next(Some(Ok(event))) => {
                    let init_done = matches!(event, watcher::Event::InitDone);
                    for notification in self.informer.observe(event) {
                        deliver(self.handler.as_ref(), self.kind, notification);
                    }
                    if init_done && !running {
                        if !self.wait_for_peers(&mut shutdown).await? {
                            break;
                        }
                        info!(
                            kind = %self.kind,
                            objects = self.informer.len(),
                            "{} cache synced",
                            self.kind
                        );
                        self.state.send_replace(StreamState::Running);
                    }
                }
                Step::Next(Some(Err(e))) => {
                    warn!(kind = %self.kind, "{} watch error (will retry): {}", self.kind, e);
                }
                Step::Next(None) => {
                    return Err(ControllerError::Watch(format!(
                        "{} watch stream ended unexpectedly",
                        self.kind
                    )));
                }
            }
        }

        self.state.send_replace(StreamState::Stopped);
        info!("{} watcher stopped", self.kind);
        Ok(())
    }

    /// Waits for every peer store. Returns `false` if shutdown came first.
    async fn wait_for_peers(
        &mut self,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<bool, ControllerError> {
        if self.peers.is_empty() {
            return Ok(true);
        }
        debug!(kind = %self.kind, "Waiting for peer caches to sync");
        let peers = future::join_all(std::mem::take(&mut self.peers));

        tokio::select! {
            biased;
            _ = shutdown.wait_for(|stop| *stop) => Ok(false),
            ready = peers => {
                if ready.into_iter().all(|synced| synced) {
                    Ok(true)
                } else {
                    Err(ControllerError::Watch(format!(
                        "{} watcher cannot run: a peer stopped before its cache synced",
                        self.kind
                    )))
                }
            }
        }
    }
}

impl<K> Debug for Watcher<K>
where
    K: Resource + Clone + 'static,
    K::DynamicType: Eq + Hash + Clone,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watcher")
            .field("kind", &self.kind)
            .field("peers", &self.peers.len())
            .field("resync_period", &self.resync_period)
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

fn resync_interval(period: Duration) -> Interval {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
