// Rust guideline compliant 2026-10-16

//! Serial continuation context.
//!
//! Every continuation and every transfer derivation runs here, one job at a
//! time, in submission order, on a dedicated OS thread that is never one of
//! the worker threads. Consumers may touch caller-owned state from a
//! continuation without additional locking against other continuations.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, ThreadId};

use tokio::sync::{mpsc, oneshot};

use crate::QueueError;

type Job = Box<dyn FnOnce() + Send>;

/// Handle to the serial continuation context.
///
/// Cheap to clone; all clones feed the same thread. The thread exits once the
/// last handle is dropped and the backlog is drained.
#[derive(Debug, Clone)]
pub struct MainQueue {
    jobs: mpsc::UnboundedSender<Job>,
    thread_id: ThreadId,
    name: Arc<str>,
}

impl MainQueue {
    /// Spawn a continuation thread named `"main-queue"`.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Spawn`] if the OS refuses to create the thread.
    pub fn new() -> Result<Self, QueueError> {
        Self::named("main-queue")
    }

    /// Spawn a continuation thread with a custom name.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Spawn`] if the OS refuses to create the thread.
    pub fn named(name: &str) -> Result<Self, QueueError> {
        let (jobs, mut backlog) = mpsc::unbounded_channel::<Job>();
        let thread_name: Arc<str> = Arc::from(name);
        let log_name = Arc::clone(&thread_name);

        let handle = thread::Builder::new().name(name.to_owned()).spawn(move || {
            // blocking_recv is fine: this thread never enters a runtime.
            while let Some(job) = backlog.blocking_recv() {
                if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                    tracing::error!(queue = %log_name, "main_queue.job.panicked");
                }
            }
            tracing::debug!(queue = %log_name, "main_queue.stopped");
        })?;

        Ok(Self { jobs, thread_id: handle.thread().id(), name: thread_name })
    }

    /// Name of the backing thread.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `true` when called from this queue's thread.
    #[must_use]
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    /// Schedule `job` after everything already enqueued.
    ///
    /// Never runs `job` synchronously, even when called from the queue itself.
    pub fn enqueue<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.jobs.send(Box::new(job)).is_err() {
            tracing::warn!(queue = %self.name, "main_queue.closed: job dropped");
        }
    }

    /// Resolve once every job enqueued before this call has run.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        self.enqueue(move || {
            let _ = done.send(());
        });
        // A closed channel means the thread is gone; nothing left to wait for.
        let _ = wait.await;
    }
}
