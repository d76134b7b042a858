//! SQLite backend for the case store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! pool without blocking the async runtime. Lifecycle transitions run inside
//! SQLite transactions with status-guarded updates, so a release lands both
//! of its rows or neither.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
