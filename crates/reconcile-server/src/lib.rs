//! HTTP server for the case-management API.
//!
//! Mounts the JSON API twice over one store: `/api` for RN and supervisor
//! principals, `/attorney` for attorney principals. The attorney mount only
//! carries the resolved-snapshot and export routes, so unreleased clinical
//! data is unreachable from it regardless of handler behaviour.

pub mod auth;
pub mod error;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  extract::{Request, State},
  middleware::{self, Next},
  response::{IntoResponse, Response},
};
use reconcile_core::{draft::DraftStore, store::CaseStore};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use auth::{AuthConfig, Principal, verify_auth};
use error::Error;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
  pub principals: Vec<Principal>,
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the axum [`Router`] serving both mounts.
pub fn router<S>(store: Arc<S>, auth: Arc<AuthConfig>) -> Router
where
  S: CaseStore + DraftStore + Send + Sync + 'static,
  <S as CaseStore>::Error: std::error::Error + Send + Sync + 'static,
  <S as DraftStore>::Error: std::error::Error + Send + Sync + 'static,
{
  let staff = reconcile_api::api_router(store.clone())
    .layer(middleware::from_fn_with_state(auth.clone(), require_staff));

  let attorney = reconcile_api::attorney_router(store)
    .layer(middleware::from_fn_with_state(auth, require_principal));

  Router::new()
    .nest("/api", staff)
    .nest("/attorney", attorney)
    .layer(TraceLayer::new_for_http())
}

/// Gate for the `/api` mount: any authenticated staff principal.
async fn require_staff(
  State(auth): State<Arc<AuthConfig>>,
  req: Request,
  next: Next,
) -> Response {
  match authenticate(&req, &auth) {
    Ok(p) if p.role.is_staff() => next.run(req).await,
    Ok(_) => Error::Forbidden.into_response(),
    Err(e) => e.into_response(),
  }
}

/// Gate for the `/attorney` mount: any authenticated principal.
async fn require_principal(
  State(auth): State<Arc<AuthConfig>>,
  req: Request,
  next: Next,
) -> Response {
  match authenticate(&req, &auth) {
    Ok(_) => next.run(req).await,
    Err(e) => e.into_response(),
  }
}

fn authenticate(req: &Request, auth: &AuthConfig) -> Result<Principal, Error> {
  verify_auth(req.headers(), auth)
}

// ─── Integration tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use base64::Engine as _;
  use base64::engine::general_purpose::STANDARD as B64;
  use rand_core::OsRng;
  use reconcile_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;

  use crate::auth::Role;

  async fn make_router() -> Router {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let hash = |password: &str| {
      let salt = SaltString::generate(&mut OsRng);
      Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .unwrap()
        .to_string()
    };
    let auth = AuthConfig {
      principals: vec![
        Principal {
          username:      "nurse".into(),
          password_hash: hash("rn-secret"),
          role:          Role::Rn,
        },
        Principal {
          username:      "counsel".into(),
          password_hash: hash("atty-secret"),
          role:          Role::Attorney,
        },
      ],
    };
    router(Arc::new(store), Arc::new(auth))
  }

  fn basic(user: &str, pass: &str) -> String {
    format!("Basic {}", B64.encode(format!("{user}:{pass}")))
  }

  fn rn() -> String { basic("nurse", "rn-secret") }
  fn attorney() -> String { basic("counsel", "atty-secret") }

  async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    auth: Option<&str>,
    body: Option<Value>,
  ) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(a) = auth {
      builder = builder.header(header::AUTHORIZATION, a);
    }
    let req = match body {
      Some(v) => builder
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(v.to_string()))
        .unwrap(),
      None => builder.body(Body::empty()).unwrap(),
    };

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
  }

  // ── Auth and role gating ───────────────────────────────────────────────────

  #[tokio::test]
  async fn unauthenticated_requests_get_401() {
    let app = make_router().await;
    let (status, _) = send(&app, "POST", "/api/cases", None, Some(json!({}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn attorney_cannot_use_staff_mount() {
    let app = make_router().await;
    let (status, _) =
      send(&app, "POST", "/api/cases", Some(&attorney()), Some(json!({}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
  }

  #[tokio::test]
  async fn staff_mount_has_no_route_on_attorney_prefix() {
    // The attorney mount simply does not carry editable-case routes.
    let app = make_router().await;
    let (status, _) =
      send(&app, "POST", "/attorney/cases", Some(&attorney()), Some(json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  // ── Lifecycle over HTTP ────────────────────────────────────────────────────

  async fn create_case(app: &Router) -> String {
    let (status, body) = send(
      app,
      "POST",
      "/api/cases",
      Some(&rn()),
      Some(json!({ "case_type": "motor vehicle accident", "jurisdiction": "NY" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["case_id"].as_str().unwrap().to_string()
  }

  #[tokio::test]
  async fn resolved_is_null_before_release() {
    let app = make_router().await;
    let id = create_case(&app).await;

    let (status, body) = send(
      &app,
      "GET",
      &format!("/attorney/cases/{id}/resolved"),
      Some(&attorney()),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["snapshot"].is_null());
  }

  #[tokio::test]
  async fn release_before_mark_ready_is_conflict() {
    let app = make_router().await;
    let id = create_case(&app).await;

    let (status, body) = send(
      &app,
      "POST",
      &format!("/api/cases/{id}/release"),
      Some(&rn()),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("draft"));
  }

  #[tokio::test]
  async fn full_release_cycle_reaches_attorney() {
    let app = make_router().await;
    let id = create_case(&app).await;

    let (status, _) = send(
      &app,
      "POST",
      &format!("/api/cases/{id}/mark-ready"),
      Some(&rn()),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, outcome) = send(
      &app,
      "POST",
      &format!("/api/cases/{id}/release"),
      Some(&rn()),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let released_id = outcome["released"]["case_id"].as_str().unwrap();
    let draft_id = outcome["draft"]["case_id"].as_str().unwrap();
    assert_ne!(released_id, draft_id);
    assert_eq!(outcome["draft"]["status"], "draft");
    assert!(outcome["draft"]["released_at"].is_null());

    // The attorney resolves the released version from any chain member.
    for probe in [&id, &released_id.to_string(), &draft_id.to_string()] {
      let (status, body) = send(
        &app,
        "GET",
        &format!("/attorney/cases/{probe}/resolved"),
        Some(&attorney()),
        None,
      )
      .await;
      assert_eq!(status, StatusCode::OK);
      assert_eq!(body["snapshot"]["case_id"], released_id);
      assert_eq!(body["snapshot"]["status"], "released");
    }
  }

  #[tokio::test]
  async fn chain_endpoint_lists_all_versions() {
    let app = make_router().await;
    let id = create_case(&app).await;
    send(&app, "POST", &format!("/api/cases/{id}/mark-ready"), Some(&rn()), None).await;
    send(&app, "POST", &format!("/api/cases/{id}/release"), Some(&rn()), None).await;

    let (status, body) = send(
      &app,
      "GET",
      &format!("/api/cases/{id}/chain"),
      Some(&rn()),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 3);
  }

  // ── Staged drafts over HTTP ────────────────────────────────────────────────

  #[tokio::test]
  async fn draft_fragments_commit_into_summary() {
    let app = make_router().await;
    let id = create_case(&app).await;

    let fragment = json!({
      "dimensions": [
        { "id": "physical", "score": 2, "note": null },
        { "id": "psychological", "score": 4, "note": null }
      ],
      "overall": 2,
      "narrative": "untreated pain"
    });
    let (status, _) = send(
      &app,
      "PUT",
      &format!("/api/cases/{id}/drafts/four_ps"),
      Some(&rn()),
      Some(fragment),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(
      &app,
      "POST",
      &format!("/api/cases/{id}/drafts/commit"),
      Some(&rn()),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"]["four_ps"]["overall"], 2);

    // Fragments are consumed by the commit.
    let (status, _) = send(
      &app,
      "GET",
      &format!("/api/cases/{id}/drafts/four_ps"),
      Some(&rn()),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn unknown_draft_kind_is_bad_request() {
    let app = make_router().await;
    let id = create_case(&app).await;

    let (status, _) = send(
      &app,
      "GET",
      &format!("/api/cases/{id}/drafts/vibes"),
      Some(&rn()),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  // ── Export audit over HTTP ─────────────────────────────────────────────────

  #[tokio::test]
  async fn attorney_logs_and_lists_exports() {
    let app = make_router().await;
    let id = create_case(&app).await;
    send(&app, "POST", &format!("/api/cases/{id}/mark-ready"), Some(&rn()), None).await;
    let (_, outcome) =
      send(&app, "POST", &format!("/api/cases/{id}/release"), Some(&rn()), None).await;
    let released_id = outcome["released"]["case_id"].as_str().unwrap().to_string();

    let (status, audit) = send(
      &app,
      "POST",
      "/attorney/exports",
      Some(&attorney()),
      Some(json!({
        "case_id": released_id,
        "action": "print",
        "format": "pdf",
        "exported_by": "counsel"
      })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(audit["chain_root_id"], id);
    assert!(audit["label"].as_str().unwrap().ends_with(".pdf"));

    let (status, list) = send(
      &app,
      "GET",
      &format!("/attorney/exports?case_id={released_id}"),
      Some(&attorney()),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);
  }
}
