// Rust guideline compliant 2026-10-16

//! Adapters (secondary ports) for the transit demo binary.
//!
//! Each sub-module implements a port trait defined in the `domain` crate.

pub mod demo_transport;
