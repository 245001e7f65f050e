// Rust guideline compliant 2026-10-16

//! An operation wrapping a derived, application-level result.
//!
//! A [`ModelOperation`] never drives itself: its outcome is written by the
//! transfer linkage (see [`transfer`](crate::transfer)) or by cancellation.
//! There is one generic type for every domain; domain crates only pick `T`.

use std::fmt;
use std::sync::{Arc, Weak};

use domain::{NetworkError, OperationId, OperationState};
use parking_lot::Mutex;

use crate::queue::Cancellable;
use crate::{MainQueue, Operation, Outcome, Payload};

/// Processed result of a remote call, observed by the caller.
///
/// The caller's `Arc` is the only owner. Dropping the last handle before the
/// operation finishes cancels it, and with it the network call behind it.
pub struct ModelOperation<T: Payload> {
    operation: Operation<T>,
    /// Non-owning link to the network operation, for cancellation forwarding only.
    api_operation: Mutex<Option<Weak<dyn Cancellable>>>,
}

impl<T: Payload> ModelOperation<T> {
    /// Create a pending model operation whose continuations run on `context`.
    #[must_use]
    pub fn new(context: MainQueue) -> Arc<Self> {
        Arc::new(Self { operation: Operation::new(context), api_operation: Mutex::new(None) })
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

    /// Cancel this operation and the network operation it is linked to.
    ///
    /// Returns `true` if this call moved the model operation to `Cancelled`.
    /// The request is forwarded even when this operation is already terminal;
    /// a finished network operation ignores it.
    pub fn cancel(&self) -> bool {
        let cancelled = self.operation.cancel();
        if cancelled {
            tracing::debug!(operation_id = %self.id(), "model_operation.cancelled");
        }
        let api_operation = self.api_operation.lock().as_ref().and_then(Weak::upgrade);
        if let Some(api_operation) = api_operation {
            api_operation.cancel();
        }
        cancelled
    }

    /// Register a continuation; see [`Operation::on_completion`].
    pub fn on_completion<F>(&self, callback: F)
    where
        F: FnOnce(&Outcome<T>) + Send + 'static,
    {
        self.operation.on_completion(callback);
    }

    /// Register a continuation that receives the finished operation.
    ///
    /// The operation is held weakly until then: if every handle is dropped
    /// first, the operation is cancelled and `callback` never runs.
    pub fn then<F>(self: &Arc<Self>, callback: F)
    where
        F: FnOnce(&Self) + Send + 'static,
    {
        let this = Arc::downgrade(self);
        self.operation.on_completion(move |_| {
            if let Some(this) = this.upgrade() {
                callback(&this);
            }
        });
    }

    /// The terminal outcome: the derived payload, the failure, or cancellation.
    ///
    /// # Panics
    ///
    /// Panics when read before the operation is finished. Reading early is a
    /// programmer error; gate reads on [`is_finished`](Self::is_finished) or use
    /// [`try_payload`](Self::try_payload).
    #[must_use]
    #[track_caller]
    pub fn payload(&self) -> Outcome<T>
    where
        T: Clone,
    {
        match self.operation.try_outcome() {
            Some(outcome) => outcome,
            None => panic!("payload of model operation {} read before it finished", self.id()),
        }
    }

    /// The terminal outcome, or `None` while still pending.
    #[must_use]
    pub fn try_payload(&self) -> Option<Outcome<T>>
    where
        T: Clone,
    {
        self.operation.try_outcome()
    }

    /// See [`Operation::finished`].
    pub async fn finished(&self) -> Outcome<T>
    where
        T: Clone,
    {
        self.operation.finished().await
    }

    /// `true` while the linked network operation is still alive.
    #[must_use]
    pub fn has_live_api_operation(&self) -> bool {
        self.api_operation.lock().as_ref().is_some_and(|op| op.strong_count() > 0)
    }

    pub(crate) fn link(&self, api_operation: Weak<dyn Cancellable>) {
        *self.api_operation.lock() = Some(api_operation);
    }

    pub(crate) fn complete(&self, payload: T) -> bool {
        self.operation.finish(Outcome::Success(payload))
    }

    pub(crate) fn fail(&self, error: NetworkError) -> bool {
        self.operation.finish(Outcome::Failure(error))
    }
}

impl<T: Payload> Drop for ModelOperation<T> {
    fn drop(&mut self) {
        if !self.operation.is_finished() {
            tracing::debug!(operation_id = %self.id(), "model_operation.dropped: cancelling");
            self.cancel();
        }
    }
}

impl<T: Payload> Cancellable for ModelOperation<T> {
    fn id(&self) -> OperationId {
        self.operation.id()
    }

    fn cancel(&self) -> bool {
        ModelOperation::cancel(self)
    }

    fn is_cancelled(&self) -> bool {
        self.operation.is_cancelled()
    }

    fn is_finished(&self) -> bool {
        self.operation.is_finished()
    }
}

impl<T: Payload> fmt::Debug for ModelOperation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelOperation")
            .field("operation", &self.operation)
            .field("linked", &self.has_live_api_operation())
            .finish_non_exhaustive()
    }
}
