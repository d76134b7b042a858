//! JSON REST API for the case-management core.
//!
//! Exposes axum [`Router`]s backed by any store implementing both
//! [`reconcile_core::store::CaseStore`] and
//! [`reconcile_core::draft::DraftStore`]. Auth, TLS, and transport concerns
//! are the caller's responsibility; in particular the attorney router
//! assumes the caller has already authenticated the principal as an
//! attorney and only exposes released-or-closed reads.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", reconcile_api::api_router(store.clone()))
//! .nest("/attorney", reconcile_api::attorney_router(store.clone()))
//! ```

pub mod cases;
pub mod drafts;
pub mod error;
pub mod exports;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post, put},
};
use reconcile_core::{draft::DraftStore, store::CaseStore};

pub use error::ApiError;

/// Build the full case-manager API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: CaseStore + DraftStore + Send + Sync + 'static,
  <S as CaseStore>::Error: std::error::Error + Send + Sync + 'static,
  <S as DraftStore>::Error: std::error::Error + Send + Sync + 'static,
{
  Router::new()
    // Cases
    .route("/cases", post(cases::create::<S>))
    .route("/cases/{id}", get(cases::get_one::<S>))
    .route("/cases/{id}/chain", get(cases::chain::<S>))
    .route("/cases/{id}/summary", put(cases::update_summary::<S>))
    // Lifecycle
    .route("/cases/{id}/mark-ready", post(cases::mark_ready::<S>))
    .route("/cases/{id}/release", post(cases::release::<S>))
    .route("/cases/{id}/revise", post(cases::revise::<S>))
    .route("/cases/{id}/close", post(cases::close::<S>))
    // Resolution
    .route("/cases/{id}/resolved", get(cases::resolved::<S>))
    // Staged assessment drafts
    .route(
      "/cases/{id}/drafts/{kind}",
      get(drafts::get_one::<S>)
        .put(drafts::put_one::<S>)
        .delete(drafts::delete_one::<S>),
    )
    .route("/cases/{id}/drafts/commit", post(drafts::commit::<S>))
    // Export audit
    .route("/exports", post(exports::create::<S>).get(exports::list::<S>))
    .with_state(store)
}

/// Build the attorney-facing router: resolved snapshots and export audit
/// only. Editable rows are unreachable through these routes even when the
/// chain contains them.
pub fn attorney_router<S>(store: Arc<S>) -> Router<()>
where
  S: CaseStore + DraftStore + Send + Sync + 'static,
  <S as CaseStore>::Error: std::error::Error + Send + Sync + 'static,
  <S as DraftStore>::Error: std::error::Error + Send + Sync + 'static,
{
  Router::new()
    .route("/cases/{id}/resolved", get(cases::resolved::<S>))
    .route("/exports", post(exports::create::<S>).get(exports::list::<S>))
    .with_state(store)
}
