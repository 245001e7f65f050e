// Rust guideline compliant 2026-10-16

//! Transfer linkage between a network operation and its model operation.
//!
//! The linkage is two non-owning references: the network operation's
//! completion continuation holds the model operation weakly, and the model
//! operation holds the network operation weakly for cancellation forwarding.
//! Neither side keeps the other alive.

use std::sync::{Arc, Weak};

use domain::NetworkError;

use crate::queue::Cancellable;
use crate::{ModelOperation, NetworkOperation, Outcome, Payload};

/// Link `network` to `model`.
///
/// When `network` finishes, on the main queue:
/// - success: `model` completes with `derive(&raw)`, or with the derivation's
///   failure;
/// - failure: `model` completes with the same failure, verbatim;
/// - cancellation: `model` is cancelled.
///
/// Cancelling or dropping `model` cancels `network`. If the caller has already
/// dropped `model` when `network` finishes, the result is discarded.
pub fn transfer<R, T, F>(network: &Arc<NetworkOperation<R>>, model: &Arc<ModelOperation<T>>, derive: F)
where
    R: Payload,
    T: Payload,
    F: FnOnce(&R) -> Result<T, NetworkError> + Send + 'static,
{
    let api_operation = Arc::downgrade(network) as Weak<dyn Cancellable>;
    model.link(api_operation);

    let model_id = model.id();
    let network_id = network.id();
    let model = Arc::downgrade(model);
    network.on_completion(move |outcome| {
        let Some(model) = model.upgrade() else {
            tracing::debug!(
                network_id = %network_id,
                model_id = %model_id,
                "transfer.discarded: model operation dropped"
            );
            return;
        };
        match outcome {
            Outcome::Success(raw) => match derive(raw) {
                Ok(payload) => {
                    model.complete(payload);
                }
                Err(error) => {
                    tracing::warn!(model_id = %model_id, cause = %error.cause(), error = %error, "transfer.derive.failed");
                    model.fail(error);
                }
            },
            Outcome::Failure(error) => {
                model.fail(error.clone());
            }
            Outcome::Cancelled => {
                model.cancel();
            }
        }
        tracing::debug!(network_id = %network_id, model_id = %model_id, state = %model.state(), "transfer.applied");
    });
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
