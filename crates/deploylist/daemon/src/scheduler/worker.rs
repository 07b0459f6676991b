//! Worker tasks and the scheduler that owns them

use crate::config::SchedulerConfig;
use deploylist_controller::{ReconcileError, ReconcileResult, Reconciler};
use deploylist_types::ObjectKey;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Handle to a running worker
struct Worker {
    trigger: Arc<Notify>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl Worker {
    fn is_live(&self) -> bool {
        !self.task.is_finished()
    }
}

/// Scheduler state
///
/// Each object gets its own worker, so an object is never reconciled
/// concurrently with itself while distinct objects progress in parallel.
pub struct Scheduler {
    config: SchedulerConfig,
    reconciler: Arc<Reconciler>,
    workers: RwLock<HashMap<ObjectKey, Worker>>,
    shutdown: CancellationToken,
}

impl Scheduler {
    /// Create a new scheduler
    pub fn new(config: SchedulerConfig, reconciler: Arc<Reconciler>) -> Arc<Self> {
        Arc::new(Self {
            config,
            reconciler,
            workers: RwLock::new(HashMap::new()),
            shutdown: CancellationToken::new(),
        })
    }

    /// Make sure a worker runs for `key`; returns whether one was spawned
    pub async fn ensure_worker(&self, key: &ObjectKey) -> bool {
        let mut workers = self.workers.write().await;
        if workers.get(key).is_some_and(Worker::is_live) {
            return false;
        }
        self.spawn_worker(&mut workers, key)
    }

    /// Reconcile `key` as soon as possible
    ///
    /// Wakes the running worker, or starts one, which reconciles right away.
    pub async fn trigger(&self, key: &ObjectKey) -> bool {
        let mut workers = self.workers.write().await;
        match workers.get(key) {
            Some(worker) if worker.is_live() => {
                tracing::debug!(object = %key, "Triggering reconcile");
                worker.trigger.notify_one();
                true
            }
            _ => self.spawn_worker(&mut workers, key),
        }
    }

    /// Stop the worker for `key`
    pub async fn forget(&self, key: &ObjectKey) -> bool {
        match self.workers.write().await.remove(key) {
            Some(worker) => {
                worker.cancel.cancel();
                tracing::debug!(object = %key, "Stopped worker");
                true
            }
            None => false,
        }
    }

    /// Number of running workers
    pub async fn worker_count(&self) -> usize {
        self.workers
            .read()
            .await
            .values()
            .filter(|w| w.is_live())
            .count()
    }

    /// Align workers with the objects in the store
    ///
    /// Starts workers for objects without one and stops workers whose object
    /// is gone. Returns the number of workers started.
    pub async fn resync(&self) -> ReconcileResult<usize> {
        let keys: HashSet<ObjectKey> = self
            .reconciler
            .store()
            .list()
            .await
            .map_err(ReconcileError::Load)?
            .into_iter()
            .map(|object| object.key())
            .collect();

        let mut workers = self.workers.write().await;
        workers.retain(|key, worker| {
            let keep = keys.contains(key) && worker.is_live();
            if !keep {
                worker.cancel.cancel();
            }
            keep
        });

        let mut spawned = 0;
        for key in &keys {
            if !workers.contains_key(key) && self.spawn_worker(&mut workers, key) {
                spawned += 1;
            }
        }
        Ok(spawned)
    }

    /// Run the resync loop until [`Scheduler::stop`] is called, then wait for
    /// every worker to finish
    pub async fn start(self: Arc<Self>) {
        tracing::info!(
            resync_interval_secs = self.config.resync_interval().as_secs(),
            "Scheduler started"
        );

        let mut interval = tokio::time::interval(self.config.resync_interval());
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = interval.tick() => match self.resync().await {
                    Ok(0) => {}
                    Ok(spawned) => tracing::info!(spawned, "Started workers"),
                    Err(e) => tracing::error!(error = %e, "Resync failed"),
                },
            }
        }

        let tasks: Vec<_> = self
            .workers
            .write()
            .await
            .drain()
            .map(|(_, worker)| worker.task)
            .collect();
        futures_util::future::join_all(tasks).await;

        tracing::info!("Scheduler stopped");
    }

    /// Stop the scheduler and all workers
    pub fn stop(&self) {
        self.shutdown.cancel();
    }

    fn spawn_worker(&self, workers: &mut HashMap<ObjectKey, Worker>, key: &ObjectKey) -> bool {
        if self.shutdown.is_cancelled() {
            return false;
        }

        let trigger = Arc::new(Notify::new());
        let cancel = self.shutdown.child_token();
        let task = tokio::spawn(run_worker(
            self.reconciler.clone(),
            key.clone(),
            trigger.clone(),
            cancel.clone(),
            self.config.persist_retry(),
        ));

        tracing::debug!(object = %key, "Started worker");
        workers.insert(
            key.clone(),
            Worker {
                trigger,
                cancel,
                task,
            },
        );
        true
    }
}

/// Reconcile `key` until it disappears or the worker is cancelled
async fn run_worker(
    reconciler: Arc<Reconciler>,
    key: ObjectKey,
    trigger: Arc<Notify>,
    cancel: CancellationToken,
    retry: Duration,
) {
    loop {
        let delay = match reconciler.reconcile(&key, &cancel).await {
            Ok(Some(delay)) => delay,
            Ok(None) => {
                tracing::info!(object = %key, "Object deleted, stopping worker");
                return;
            }
            Err(ReconcileError::Cancelled) => return,
            Err(e) => {
                tracing::error!(
                    object = %key,
                    error = %e,
                    retry_secs = retry.as_secs(),
                    "Reconcile failed"
                );
                retry
            }
        };

        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = trigger.notified() => {}
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deploylist_controller::testing::{deployment, ScriptedLister, StaticListerFactory};
    use deploylist_controller::{InMemoryObjectStore, InMemorySecrets, ObjectStore};
    use deploylist_types::{Interval, ListDeploymentsSpec, ListGithubDeployments};
    use tokio::time::Instant;

    struct Fixture {
        store: Arc<InMemoryObjectStore>,
        lister: Arc<ScriptedLister>,
        scheduler: Arc<Scheduler>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryObjectStore::new());
        let lister = Arc::new(ScriptedLister::new((1..=3).map(deployment).collect()));
        let reconciler = Arc::new(Reconciler::new(
            ListGithubDeployments::object_kind(),
            store.clone(),
            Arc::new(InMemorySecrets::new()),
            Arc::new(StaticListerFactory::new(lister.clone())),
        ));
        let scheduler = Scheduler::new(SchedulerConfig::default(), reconciler);
        Fixture {
            store,
            lister,
            scheduler,
        }
    }

    async fn apply(store: &InMemoryObjectStore, name: &str, interval: Duration) -> ObjectKey {
        let spec = ListDeploymentsSpec {
            interval: Interval::from(interval),
            ..ListDeploymentsSpec::new("acme", name)
        };
        store
            .apply(ListGithubDeployments::new("ci", name, spec))
            .await
            .unwrap()
            .key()
    }

    async fn wait_for_calls(lister: &ScriptedLister, calls: usize) {
        for _ in 0..1000 {
            if lister.call_count() >= calls {
                return;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("expected {} calls, saw {}", calls, lister.call_count());
    }

    async fn wait_until_ready(store: &InMemoryObjectStore, key: &ObjectKey) {
        for _ in 0..1000 {
            let object = store.get(key).await.unwrap();
            if object.is_some_and(|o| o.status.ready().is_some()) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("{} never became ready", key);
    }

    #[tokio::test]
    async fn test_worker_reconciles_immediately() {
        let f = fixture();
        let key = apply(&f.store, "shop", Duration::from_secs(3600)).await;

        assert!(f.scheduler.ensure_worker(&key).await);
        assert!(!f.scheduler.ensure_worker(&key).await);

        wait_until_ready(&f.store, &key).await;
        let object = f.store.get(&key).await.unwrap().unwrap();
        assert_eq!(object.status.records.len(), 3);
        assert_eq!(f.scheduler.worker_count().await, 1);
    }

    #[tokio::test]
    async fn test_trigger_wakes_sleeping_worker() {
        let f = fixture();
        let key = apply(&f.store, "shop", Duration::from_secs(3600)).await;

        f.scheduler.ensure_worker(&key).await;
        wait_for_calls(&f.lister, 1).await;

        assert!(f.scheduler.trigger(&key).await);
        wait_for_calls(&f.lister, 2).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_worker_requeues_after_interval() {
        let f = fixture();
        let key = apply(&f.store, "shop", Duration::from_secs(30)).await;

        f.scheduler.ensure_worker(&key).await;
        wait_for_calls(&f.lister, 1).await;
        let first = Instant::now();

        wait_for_calls(&f.lister, 2).await;
        assert!(first.elapsed() >= Duration::from_secs(29));
    }

    #[tokio::test]
    async fn test_worker_stops_when_object_deleted() {
        let f = fixture();
        let key = apply(&f.store, "shop", Duration::from_secs(3600)).await;

        f.scheduler.ensure_worker(&key).await;
        wait_until_ready(&f.store, &key).await;

        f.store.delete(&key).await.unwrap();
        f.scheduler.trigger(&key).await;

        for _ in 0..1000 {
            if f.scheduler.worker_count().await == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(f.scheduler.worker_count().await, 0);
    }

    #[tokio::test]
    async fn test_resync_aligns_workers_with_store() {
        let f = fixture();
        let shop = apply(&f.store, "shop", Duration::from_secs(3600)).await;
        let blog = apply(&f.store, "blog", Duration::from_secs(3600)).await;

        assert_eq!(f.scheduler.resync().await.unwrap(), 2);
        assert_eq!(f.scheduler.resync().await.unwrap(), 0);
        wait_until_ready(&f.store, &shop).await;
        wait_until_ready(&f.store, &blog).await;

        f.store.delete(&blog).await.unwrap();
        assert_eq!(f.scheduler.resync().await.unwrap(), 0);
        assert_eq!(f.scheduler.worker_count().await, 1);
    }

    #[tokio::test]
    async fn test_forget_and_stop() {
        let f = fixture();
        let key = apply(&f.store, "shop", Duration::from_secs(3600)).await;

        let scheduler = f.scheduler.clone();
        let running = tokio::spawn(scheduler.start());
        wait_until_ready(&f.store, &key).await;

        assert!(f.scheduler.forget(&key).await);
        assert!(!f.scheduler.forget(&key).await);

        f.scheduler.stop();
        running.await.unwrap();
        assert_eq!(f.scheduler.worker_count().await, 0);
        assert!(!f.scheduler.ensure_worker(&key).await);
    }
}
