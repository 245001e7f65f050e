// Rust guideline compliant 2026-10-16

//! An operation wrapping exactly one remote call.

use std::fmt;
use std::sync::Arc;

use domain::{NetworkError, OperationId, OperationState};
use futures::future::BoxFuture;
use parking_lot::Mutex;

use crate::queue::{Cancellable, Executable};
use crate::{MainQueue, Operation, Outcome, Payload};

/// The remote call a [`NetworkOperation`] is bound to.
pub type RemoteCall<R> = BoxFuture<'static, Result<R, NetworkError>>;

/// Performs one remote call and records its outcome.
///
/// Built by the API client, bound to its call at construction, and run by the
/// [`OperationQueue`](crate::OperationQueue). The result is never a success
/// for a cancelled operation.
pub struct NetworkOperation<R: Payload> {
    operation: Operation<R>,
    description: String,
    /// Taken exactly once, by the first `start`.
    call: Mutex<Option<RemoteCall<R>>>,
}

impl<R: Payload> NetworkOperation<R> {
    /// Bind a new pending operation to `call`.
    ///
    /// `description` names the call in logs (e.g. `"GET /api/v1/regions/1/weather"`).
    pub fn new<F>(context: MainQueue, description: impl Into<String>, call: F) -> Arc<Self>
    where
        F: Future<Output = Result<R, NetworkError>> + Send + 'static,
    {
        Arc::new(Self {
            operation: Operation::new(context),
            description: description.into(),
            call: Mutex::new(Some(Box::pin(call))),
        })
    }

    /// Run the remote call to a terminal state.
    ///
    /// `Pending -> Executing`, then `Completed` with the call's result. A
    /// cancellation observed while the call is in flight abandons the call and
    /// leaves the operation `Cancelled`. Calling `start` on an operation that
    /// already left `Pending` does nothing.
    pub async fn start(&self) {
        let id = self.operation.id();
        if !self.operation.begin() {
            tracing::debug!(operation_id = %id, state = %self.state(), "network_operation.start.skipped");
            return;
        }
        let Some(call) = self.call.lock().take() else {
            return;
        };
        tracing::debug!(operation_id = %id, call = %self.description, "network_operation.started");

        let mut state = self.operation.subscribe();
        tokio::select! {
            result = call => {
                let outcome = match result {
                    Ok(payload) => Outcome::Success(payload),
                    Err(error) => {
                        tracing::warn!(
                            operation_id = %id,
                            call = %self.description,
                            cause = %error.cause(),
                            error = %error,
                            "network_operation.failed"
                        );
                        Outcome::Failure(error)
                    }
                };
                if !self.operation.finish(outcome) {
                    tracing::debug!(operation_id = %id, "network_operation.result.discarded");
                }
            }
            _ = state.wait_for(|s| s.is_terminal()) => {
                tracing::debug!(operation_id = %id, call = %self.description, "network_operation.abandoned");
            }
        }
    }

    /// Human-readable name of the bound call.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn id(&self) -> OperationId {
        self.operation.id()
    }

    #[must_use]
    pub fn state(&self) -> OperationState {
        self.operation.state()
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.operation.is_cancelled()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.operation.is_finished()
    }

    /// See [`Operation::cancel`].
    pub fn cancel(&self) -> bool {
        let cancelled = self.operation.cancel();
        if cancelled {
            tracing::debug!(operation_id = %self.id(), call = %self.description, "network_operation.cancelled");
        }
        cancelled
    }

    /// See [`Operation::on_completion`].
    pub fn on_completion<F>(&self, callback: F)
    where
        F: FnOnce(&Outcome<R>) + Send + 'static,
    {
        self.operation.on_completion(callback);
    }

    /// The recorded result, if terminal.
    #[must_use]
    pub fn try_outcome(&self) -> Option<Outcome<R>>
    where
        R: Clone,
    {
        self.operation.try_outcome()
    }

    /// See [`Operation::finished`].
    pub async fn finished(&self) -> Outcome<R>
    where
        R: Clone,
    {
        self.operation.finished().await
    }
}

impl<R: Payload> Cancellable for NetworkOperation<R> {
    fn id(&self) -> OperationId {
        self.operation.id()
    }

    fn cancel(&self) -> bool {
        NetworkOperation::cancel(self)
    }

    fn is_cancelled(&self) -> bool {
        self.operation.is_cancelled()
    }

    fn is_finished(&self) -> bool {
        self.operation.is_finished()
    }
}

impl<R: Payload> Executable for NetworkOperation<R> {
    fn execute(self: Arc<Self>) -> BoxFuture<'static, ()> {
        Box::pin(async move { self.start().await })
    }
}

impl<R: Payload> fmt::Debug for NetworkOperation<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkOperation")
            .field("description", &self.description)
            .field("operation", &self.operation)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::NetworkOperation;
    use crate::{MainQueue, Outcome};
    use domain::{NetworkError, OperationState};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::oneshot;

    /// Sets its flag when dropped; lets a test see an abandoned call.
    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn successful_call_completes_with_payload() {
        let queue = MainQueue::new().unwrap();
        let operation = NetworkOperation::new(queue, "GET /ok", async { Ok(5_u32) });

        operation.start().await;

        assert_eq!(operation.state(), OperationState::Completed);
        assert_eq!(operation.try_outcome(), Some(Outcome::Success(5)));
    }

    #[tokio::test]
    async fn failing_call_completes_with_failure() {
        let queue = MainQueue::new().unwrap();
        let error = NetworkError::Transport { reason: "unreachable".to_owned() };
        let expected = error.clone();
        let operation =
            NetworkOperation::<u32>::new(queue, "GET /down", async move { Err(error) });

        operation.start().await;

        assert_eq!(operation.state(), OperationState::Completed);
        assert_eq!(operation.finished().await, Outcome::Failure(expected));
    }

    #[tokio::test]
    async fn cancel_before_start_skips_the_call() {
        let queue = MainQueue::new().unwrap();
        let called = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&called);
        let operation = NetworkOperation::new(queue, "GET /never", async move {
            flag.store(true, Ordering::SeqCst);
            Ok(1_u32)
        });

        operation.cancel();
        operation.start().await;

        assert!(!called.load(Ordering::SeqCst));
        assert_eq!(operation.try_outcome(), Some(Outcome::Cancelled));
    }

    #[tokio::test]
    async fn cancel_in_flight_abandons_the_call() {
        let queue = MainQueue::new().unwrap();
        let (respond, response) = oneshot::channel::<u32>();
        let abandoned = Arc::new(AtomicBool::new(false));
        let guard = DropFlag(Arc::clone(&abandoned));
        let operation = NetworkOperation::new(queue, "GET /slow", async move {
            let _guard = guard;
            response.await.map_err(|e| NetworkError::Transport { reason: e.to_string() })
        });

        let runner = Arc::clone(&operation);
        let task = tokio::spawn(async move { runner.start().await });
        while operation.state() != OperationState::Executing {
            tokio::task::yield_now().await;
        }

        operation.cancel();
        task.await.unwrap();

        assert!(abandoned.load(Ordering::SeqCst), "in-flight call must be dropped");
        assert_eq!(operation.try_outcome(), Some(Outcome::Cancelled));
        // Late response goes nowhere.
        assert!(respond.send(9).is_err());
    }

    #[tokio::test]
    async fn start_runs_the_call_at_most_once() {
        let queue = MainQueue::new().unwrap();
        let operation = NetworkOperation::new(queue, "GET /once", async { Ok(1_u32) });

        operation.start().await;
        operation.start().await;

        assert_eq!(operation.try_outcome(), Some(Outcome::Success(1)));
    }
}
