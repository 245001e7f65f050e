// Rust guideline compliant 2026-10-16

//! Base unit of cancellable asynchronous work.
//!
//! [`Operation`] is a small state machine plus a queue of pending
//! continuations. The queue is drained on the terminal transition, or at
//! registration time when the operation is already terminal; both paths go
//! through the same dispatch onto the operation's [`MainQueue`].

use std::fmt;
use std::sync::Arc;

use domain::{NetworkError, OperationId, OperationState};
use parking_lot::Mutex;
use tokio::sync::{oneshot, watch};

use crate::MainQueue;

/// Bound shared by every value that flows through an operation.
pub trait Payload: Send + Sync + 'static {}

impl<T: Send + Sync + 'static> Payload for T {}

/// Terminal outcome of an operation, as observed by continuations.
///
/// The three variants are the three distinguishable results a caller can see:
/// a payload, a failure with its cause, or cancellation.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Success(T),
    Failure(NetworkError),
    Cancelled,
}

impl<T> Outcome<T> {
    /// The payload, if this is a success.
    #[must_use]
    pub fn success(&self) -> Option<&T> {
        match self {
            Self::Success(value) => Some(value),
            Self::Failure(_) | Self::Cancelled => None,
        }
    }

    /// The failure, if this is one.
    #[must_use]
    pub fn failure(&self) -> Option<&NetworkError> {
        match self {
            Self::Failure(error) => Some(error),
            Self::Success(_) | Self::Cancelled => None,
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Convert into a `Result`, mapping cancellation to `None`.
    ///
    /// # Errors
    ///
    /// Returns the failure carried by [`Outcome::Failure`].
    pub fn into_result(self) -> Result<Option<T>, NetworkError> {
        match self {
            Self::Success(value) => Ok(Some(value)),
            Self::Failure(error) => Err(error),
            Self::Cancelled => Ok(None),
        }
    }
}

type Continuation<T> = Box<dyn FnOnce(&Outcome<T>) + Send>;

/// Mutable part of an operation; always accessed under one lock.
struct Inner<T> {
    state: OperationState,
    /// `Some` exactly when `state` is terminal.
    outcome: Option<Arc<Outcome<T>>>,
    continuations: Vec<Continuation<T>>,
}

/// A cancellable unit of asynchronous work with an observable terminal outcome.
///
/// Built only inside this crate, as the core of [`NetworkOperation`](crate::NetworkOperation)
/// and [`ModelOperation`](crate::ModelOperation).
///
/// Dropping a non-terminal operation cancels it, so registered continuations
/// are never silently lost.
pub struct Operation<T: Payload> {
    id: OperationId,
    context: MainQueue,
    inner: Mutex<Inner<T>>,
    /// Mirrors `inner.state` for async observers; only written under `inner`.
    state_tx: watch::Sender<OperationState>,
}

impl<T: Payload> Operation<T> {
    /// Create a pending operation whose continuations run on `context`.
    #[must_use]
    pub(crate) fn new(context: MainQueue) -> Self {
        let (state_tx, _) = watch::channel(OperationState::Pending);
        Self {
            id: OperationId::new(),
            context,
            inner: Mutex::new(Inner {
                state: OperationState::Pending,
                outcome: None,
                continuations: vec![],
            }),
            state_tx,
        }
    }

    #[must_use]
    pub fn id(&self) -> OperationId {
        self.id
    }

    #[must_use]
    pub fn state(&self) -> OperationState {
        self.inner.lock().state
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.state() == OperationState::Cancelled
    }

    /// `true` once the operation is `Completed` or `Cancelled`.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state().is_terminal()
    }

    /// Context that continuations of this operation run on.
    #[must_use]
    pub fn context(&self) -> &MainQueue {
        &self.context
    }

    /// Request cancellation.
    ///
    /// Idempotent. Returns `true` only for the call that performed the
    /// transition; a no-op (returning `false`) once the operation is terminal.
    pub fn cancel(&self) -> bool {
        self.settle(OperationState::Cancelled, Outcome::Cancelled)
    }

    /// Register `callback` to run once the operation is terminal.
    ///
    /// Callbacks fire on the operation's context in registration order. If
    /// the operation is already terminal the callback is scheduled right away,
    /// never invoked synchronously in the caller.
    pub fn on_completion<F>(&self, callback: F)
    where
        F: FnOnce(&Outcome<T>) + Send + 'static,
    {
        let mut inner = self.inner.lock();
        if let Some(outcome) = inner.outcome.clone() {
            self.dispatch(&outcome, vec![Box::new(callback)]);
        } else {
            inner.continuations.push(Box::new(callback));
        }
    }

    /// Terminal outcome, if any.
    #[must_use]
    pub fn try_outcome(&self) -> Option<Outcome<T>>
    where
        T: Clone,
    {
        self.inner.lock().outcome.as_deref().cloned()
    }

    /// Wait for the terminal outcome.
    ///
    /// Resolves after every continuation registered before this call has run.
    pub async fn finished(&self) -> Outcome<T>
    where
        T: Clone,
    {
        let (tx, rx) = oneshot::channel();
        self.on_completion(move |outcome| {
            let _ = tx.send(outcome.clone());
        });
        match rx.await {
            Ok(outcome) => outcome,
            // The continuation was dropped undelivered: the context is gone,
            // but the outcome is already recorded.
            Err(_) => self.try_outcome().unwrap_or(Outcome::Cancelled),
        }
    }

    /// `Pending -> Executing`. Returns `false` if the operation already left `Pending`.
    pub(crate) fn begin(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.state != OperationState::Pending {
            return false;
        }
        inner.state = OperationState::Executing;
        self.state_tx.send_replace(OperationState::Executing);
        true
    }

    /// Record a success or failure. First terminal transition wins.
    pub(crate) fn finish(&self, outcome: Outcome<T>) -> bool {
        debug_assert!(!outcome.is_cancelled(), "cancellation goes through cancel()");
        self.settle(OperationState::Completed, outcome)
    }

    /// Watch the state; used to observe cancellation while a call is in flight.
    pub(crate) fn subscribe(&self) -> watch::Receiver<OperationState> {
        self.state_tx.subscribe()
    }

    fn settle(&self, state: OperationState, outcome: Outcome<T>) -> bool {
        let mut inner = self.inner.lock();
        if inner.state.is_terminal() {
            return false;
        }
        let outcome = Arc::new(outcome);
        inner.state = state;
        inner.outcome = Some(Arc::clone(&outcome));
        self.state_tx.send_replace(state);

        let continuations = std::mem::take(&mut inner.continuations);
        tracing::debug!(
            operation_id = %self.id,
            state = %state,
            continuations = continuations.len(),
            "operation.settled"
        );
        // Dispatch under the lock: a registration racing this transition must
        // be enqueued after the drained list to keep registration order.
        self.dispatch(&outcome, continuations);
        true
    }

    fn dispatch(&self, outcome: &Arc<Outcome<T>>, continuations: Vec<Continuation<T>>) {
        // One job per continuation so a panicking callback cannot starve the rest.
        for continuation in continuations {
            let outcome = Arc::clone(outcome);
            self.context.enqueue(move || continuation(&outcome));
        }
    }
}

impl<T: Payload> Drop for Operation<T> {
    fn drop(&mut self) {
        if self.cancel() {
            tracing::debug!(operation_id = %self.id, "operation.dropped_before_finish");
        }
    }
}

impl<T: Payload> fmt::Debug for Operation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Operation")
            .field("id", &self.id)
            .field("state", &inner.state)
            .field("continuations", &inner.continuations.len())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
