//! Core types and trait definitions for the Reconcile C.A.R.E. case store.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! The revision-chain resolver and the lifecycle state machine live here so
//! their correctness is testable without network or storage mocking.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod case;
pub mod chain;
pub mod draft;
pub mod error;
pub mod lifecycle;
pub mod store;
pub mod summary;

pub use error::{Error, Result};
