// Rust guideline compliant 2026-10-16

//! Shared work-scheduling facility.
//!
//! [`OperationQueue`] runs enqueued operations on a tokio runtime, bounded by a
//! semaphore, and hands out the [`MainQueue`] their continuations run on.
//! Configuration via [`QueueConfig::builder`].

use std::fmt;
use std::sync::{Arc, Weak};

use domain::OperationId;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tracing::Instrument as _;

use crate::MainQueue;

// ---------------------------------------------------------------------------
// QueueError
// ---------------------------------------------------------------------------

/// Errors raised while setting up the scheduling facility.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// The supplied configuration is invalid.
    #[error("invalid queue configuration: {reason}")]
    InvalidConfig {
        /// Human-readable description of the problem.
        reason: String,
    },
    /// The continuation thread could not be created.
    #[error("failed to spawn continuation thread: {source}")]
    Spawn {
        /// The underlying OS error.
        #[from]
        source: std::io::Error,
    },
    /// No tokio runtime is running on the calling thread.
    #[error("no tokio runtime available: {source}")]
    NoRuntime {
        /// The underlying runtime lookup error.
        #[from]
        source: tokio::runtime::TryCurrentError,
    },
}

// ---------------------------------------------------------------------------
// QueueConfig + builder
// ---------------------------------------------------------------------------

/// Runtime configuration for an [`OperationQueue`].
///
/// Construct via [`QueueConfig::builder`].
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Upper bound on operations executing at the same time (range: `>= 1`).
    pub max_concurrent_operations: usize,
    /// Label attached to every log line emitted for this queue.
    pub name: String,
}

/// Builder for [`QueueConfig`].
///
/// Obtain via [`QueueConfig::builder`]; finalize with [`build`](Self::build).
#[derive(Debug)]
pub struct QueueConfigBuilder {
    max_concurrent_operations: usize,
    name: String,
}

impl QueueConfig {
    /// Create a builder. `max_concurrent_operations` is the only required parameter.
    ///
    /// Default values: `name = "data"`.
    #[must_use]
    pub fn builder(max_concurrent_operations: usize) -> QueueConfigBuilder {
        QueueConfigBuilder { max_concurrent_operations, name: "data".to_owned() }
    }
}

impl QueueConfigBuilder {
    /// Override the queue label.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Validate and build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::InvalidConfig`] when `max_concurrent_operations`
    /// is zero or the name is empty.
    #[must_use = "the Result must be checked; use ? or unwrap"]
    pub fn build(self) -> Result<QueueConfig, QueueError> {
        if self.max_concurrent_operations == 0 {
            return Err(QueueError::InvalidConfig {
                reason: "max_concurrent_operations must be >= 1".to_owned(),
            });
        }
        if self.name.is_empty() {
            return Err(QueueError::InvalidConfig { reason: "name must not be empty".to_owned() });
        }
        Ok(QueueConfig {
            max_concurrent_operations: self.max_concurrent_operations,
            name: self.name,
        })
    }
}

// ---------------------------------------------------------------------------
// Seams
// ---------------------------------------------------------------------------

/// Anything that can be asked to stop.
///
/// Used for non-owning links: the model-to-network back-reference and the
/// queue's bookkeeping both hold `Weak<dyn Cancellable>`.
pub trait Cancellable: Send + Sync {
    fn id(&self) -> OperationId;

    /// Request cancellation; `true` if this call performed the transition.
    fn cancel(&self) -> bool;

    fn is_cancelled(&self) -> bool;

    fn is_finished(&self) -> bool;
}

/// An operation the queue knows how to run.
pub trait Executable: Cancellable + 'static {
    /// Run the operation to a terminal state.
    fn execute(self: Arc<Self>) -> BoxFuture<'static, ()>;
}

// ---------------------------------------------------------------------------
// OperationQueue
// ---------------------------------------------------------------------------

struct Shared {
    config: QueueConfig,
    permits: Arc<Semaphore>,
    runtime: Handle,
    main: MainQueue,
    tracked: Mutex<Vec<Weak<dyn Cancellable>>>,
}

/// Executes enqueued operations on a shared worker pool.
///
/// Each call to [`add_operation`](Self::add_operation) runs the operation at
/// most once; an operation cancelled before a worker picks it up is skipped
/// entirely. The queue keeps operations alive until they run; it only tracks
/// them weakly afterwards.
#[derive(Clone)]
pub struct OperationQueue {
    shared: Arc<Shared>,
}

impl OperationQueue {
    /// Create a queue on the runtime of the calling thread.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::NoRuntime`] when called outside a tokio runtime.
    pub fn new(config: QueueConfig, main: MainQueue) -> Result<Self, QueueError> {
        Ok(Self::with_runtime(config, Handle::try_current()?, main))
    }

    /// Create a queue that spawns onto `runtime`.
    #[must_use]
    pub fn with_runtime(config: QueueConfig, runtime: Handle, main: MainQueue) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent_operations));
        Self {
            shared: Arc::new(Shared {
                config,
                permits,
                runtime,
                main,
                tracked: Mutex::new(vec![]),
            }),
        }
    }

    /// Context continuations of operations built for this queue run on.
    #[must_use]
    pub fn main_queue(&self) -> &MainQueue {
        &self.shared.main
    }

    #[must_use]
    pub fn config(&self) -> &QueueConfig {
        &self.shared.config
    }

    /// Schedule `operation` for execution.
    pub fn add_operation<E: Executable>(&self, operation: Arc<E>) {
        let id = operation.id();
        {
            let link = Arc::downgrade(&operation) as Weak<dyn Cancellable>;
            let mut tracked = self.shared.tracked.lock();
            tracked.retain(|op| op.upgrade().is_some_and(|op| !op.is_finished()));
            // Re-adding a tracked operation must not count it twice.
            if !tracked.iter().filter_map(Weak::upgrade).any(|op| op.id() == id) {
                tracked.push(link);
            }
        }

        let permits = Arc::clone(&self.shared.permits);
        let span = tracing::debug_span!("queue", name = %self.shared.config.name, operation_id = %id);
        tracing::debug!(operation_id = %id, queue = %self.shared.config.name, "queue.operation.added");

        self.shared.runtime.spawn(
            async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    return;
                };
                if operation.is_finished() {
                    tracing::debug!("queue.operation.skipped");
                    return;
                }
                operation.execute().await;
            }
            .instrument(span),
        );
    }

    /// Number of enqueued operations that have not reached a terminal state.
    #[must_use]
    pub fn operation_count(&self) -> usize {
        self.shared
            .tracked
            .lock()
            .iter()
            .filter_map(Weak::upgrade)
            .filter(|op| !op.is_finished())
            .count()
    }

    /// Request cancellation of every enqueued, unfinished operation.
    pub fn cancel_all_operations(&self) {
        let live: Vec<Arc<dyn Cancellable>> =
            self.shared.tracked.lock().drain(..).filter_map(|op| op.upgrade()).collect();
        tracing::info!(queue = %self.shared.config.name, count = live.len(), "queue.cancel_all");
        for operation in live {
            operation.cancel();
        }
    }
}

impl fmt::Debug for OperationQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationQueue")
            .field("config", &self.shared.config)
            .field("available_permits", &self.shared.permits.available_permits())
            .field("main", &self.shared.main)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::{Cancellable, Executable, OperationQueue, QueueConfig, QueueError};
    use crate::MainQueue;
    use domain::OperationId;
    use futures::future::BoxFuture;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    // ------------------------------------------------------------------
    // Mock operation
    // ------------------------------------------------------------------

    /// Counts executions; optionally parks until released.
    struct CountingOperation {
        id: OperationId,
        runs: AtomicUsize,
        cancelled: AtomicBool,
        finished: AtomicBool,
        release: Option<Arc<Notify>>,
        running: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    impl CountingOperation {
        fn new() -> Arc<Self> {
            Self::gated(None, Arc::default(), Arc::default())
        }

        fn gated(
            release: Option<Arc<Notify>>,
            running: Arc<AtomicUsize>,
            peak: Arc<AtomicUsize>,
        ) -> Arc<Self> {
            Arc::new(Self {
                id: OperationId::new(),
                runs: AtomicUsize::new(0),
                cancelled: AtomicBool::new(false),
                finished: AtomicBool::new(false),
                release,
                running,
                peak,
            })
        }
    }

    impl Cancellable for CountingOperation {
        fn id(&self) -> OperationId {
            self.id
        }

        fn cancel(&self) -> bool {
            !self.finished.swap(true, Ordering::SeqCst) && !self.cancelled.swap(true, Ordering::SeqCst)
        }

        fn is_cancelled(&self) -> bool {
            self.cancelled.load(Ordering::SeqCst)
        }

        fn is_finished(&self) -> bool {
            self.finished.load(Ordering::SeqCst)
        }
    }

    impl Executable for CountingOperation {
        fn execute(self: Arc<Self>) -> BoxFuture<'static, ()> {
            Box::pin(async move {
                self.runs.fetch_add(1, Ordering::SeqCst);
                let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
                self.peak.fetch_max(now, Ordering::SeqCst);
                if let Some(release) = &self.release {
                    release.notified().await;
                }
                self.running.fetch_sub(1, Ordering::SeqCst);
                self.finished.store(true, Ordering::SeqCst);
            })
        }
    }

    fn make_queue(max: usize) -> OperationQueue {
        let config = QueueConfig::builder(max).name("test").build().unwrap();
        OperationQueue::new(config, MainQueue::new().unwrap()).unwrap()
    }

    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    // ------------------------------------------------------------------
    // QueueConfig validation
    // ------------------------------------------------------------------

    #[test]
    fn config_rejects_zero_concurrency() {
        let result = QueueConfig::builder(0).build();
        assert!(matches!(result, Err(QueueError::InvalidConfig { .. })));
    }

    #[test]
    fn config_rejects_empty_name() {
        let result = QueueConfig::builder(1).name("").build();
        assert!(matches!(result, Err(QueueError::InvalidConfig { .. })));
    }

    #[test]
    fn builder_defaults_name() {
        let config = QueueConfig::builder(4).build().unwrap();
        assert_eq!(config.name, "data");
        assert_eq!(config.max_concurrent_operations, 4);
    }

    #[test]
    fn new_outside_runtime_fails() {
        let config = QueueConfig::builder(1).build().unwrap();
        let result = OperationQueue::new(config, MainQueue::new().unwrap());
        assert!(matches!(result, Err(QueueError::NoRuntime { .. })));
    }

    // ------------------------------------------------------------------
    // Execution
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn enqueued_operation_runs_once() {
        let queue = make_queue(2);
        let operation = CountingOperation::new();

        queue.add_operation(Arc::clone(&operation));
        settle().await;

        assert_eq!(operation.runs.load(Ordering::SeqCst), 1);
        assert_eq!(queue.operation_count(), 0);
    }

    #[tokio::test]
    async fn cancelled_before_execution_is_skipped() {
        let queue = make_queue(1);
        let operation = CountingOperation::new();
        operation.cancel();

        queue.add_operation(Arc::clone(&operation));
        settle().await;

        assert_eq!(operation.runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn concurrency_is_bounded() {
        let queue = make_queue(2);
        let release = Arc::new(Notify::new());
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let operations: Vec<_> = (0..5)
            .map(|_| {
                CountingOperation::gated(
                    Some(Arc::clone(&release)),
                    Arc::clone(&running),
                    Arc::clone(&peak),
                )
            })
            .collect();

        for operation in &operations {
            queue.add_operation(Arc::clone(operation));
        }
        settle().await;
        assert_eq!(running.load(Ordering::SeqCst), 2);
        assert_eq!(queue.operation_count(), 5);

        for _ in 0..50 {
            release.notify_waiters();
            tokio::time::sleep(Duration::from_millis(1)).await;
            if operations.iter().all(|op| op.is_finished()) {
                break;
            }
        }
        assert!(operations.iter().all(|op| op.runs.load(Ordering::SeqCst) == 1));
        assert_eq!(peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn re_adding_an_operation_tracks_it_once() {
        let queue = make_queue(1);
        let release = Arc::new(Notify::new());
        let operation =
            CountingOperation::gated(Some(Arc::clone(&release)), Arc::default(), Arc::default());

        queue.add_operation(Arc::clone(&operation));
        queue.add_operation(Arc::clone(&operation));
        settle().await;

        assert_eq!(queue.operation_count(), 1);
        operation.cancel();
        assert_eq!(queue.operation_count(), 0);
        release.notify_waiters();
    }

    #[tokio::test]
    async fn cancel_all_operations_skips_waiting_work() {
        let queue = make_queue(1);
        let release = Arc::new(Notify::new());
        let blocker =
            CountingOperation::gated(Some(Arc::clone(&release)), Arc::default(), Arc::default());
        let waiting = CountingOperation::new();

        queue.add_operation(Arc::clone(&blocker));
        queue.add_operation(Arc::clone(&waiting));
        settle().await;

        queue.cancel_all_operations();
        release.notify_waiters();
        settle().await;

        assert!(waiting.is_cancelled());
        assert_eq!(waiting.runs.load(Ordering::SeqCst), 0);
        assert_eq!(queue.operation_count(), 0);
    }
}
