// Rust guideline compliant 2026-10-16

//! Asynchronous operation pipeline.
//!
//! A remote call runs as a [`NetworkOperation`] on the shared [`OperationQueue`];
//! its result is transferred into a [`ModelOperation`] by [`transfer`], and
//! callers observe the model operation through continuations that run on the
//! serial [`MainQueue`].
//!
//! Entry points: [`transfer`], [`OperationQueue::add_operation`],
//! [`ModelOperation::on_completion`]. Configuration via [`QueueConfig::builder`].

mod main_queue;
mod model;
mod network;
mod operation;
mod queue;
mod transfer;

pub use main_queue::MainQueue;
pub use model::ModelOperation;
pub use network::{NetworkOperation, RemoteCall};
pub use operation::{Operation, Outcome, Payload};
pub use queue::{
    Cancellable, Executable, OperationQueue, QueueConfig, QueueConfigBuilder, QueueError,
};
pub use transfer::transfer;
