//! Integration test suite for epsync
//!
//! End-to-end scenarios against a local HTTP server standing in for the file
//! host that publishes the episode.
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **fetch**: Downloads, retries, and payload checks
//! - **pipeline**: Full update runs (fresh install, preserving update,
//!   idempotence, unsafe archives)
//! - **locking**: The single-run lock and cancellation
//! - **cli**: The `epsync` binary

#[path = "../common/mod.rs"]
mod common;

mod cli;
mod fetch;
mod locking;
mod pipeline;
