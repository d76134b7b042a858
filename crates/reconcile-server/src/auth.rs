//! HTTP Basic-auth verification with per-principal roles.
//!
//! Roles decide which mount a principal may use: RN and supervisor
//! principals get the full `/api` surface, attorneys only the `/attorney`
//! mount, which is restricted to released-or-closed reads by construction.

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::http::HeaderMap;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use serde::Deserialize;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
  Rn,
  Attorney,
  Supervisor,
}

impl Role {
  /// Staff roles may edit cases and drive the lifecycle.
  pub fn is_staff(self) -> bool { matches!(self, Role::Rn | Role::Supervisor) }
}

/// One login accepted by this server instance.
#[derive(Debug, Clone, Deserialize)]
pub struct Principal {
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
  pub role:          Role,
}

/// Credentials accepted as valid for this server instance.
#[derive(Clone)]
pub struct AuthConfig {
  pub principals: Vec<Principal>,
}

/// Verify Basic credentials against the configured principals and return
/// the matching principal.
pub fn verify_auth(headers: &HeaderMap, config: &AuthConfig) -> Result<Principal, Error> {
  let header_val = headers
    .get(axum::http::header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(Error::Unauthorized)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(Error::Unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| Error::Unauthorized)?;
  let creds = std::str::from_utf8(&decoded).map_err(|_| Error::Unauthorized)?;

  let (username, password) = creds.split_once(':').ok_or(Error::Unauthorized)?;

  let principal = config
    .principals
    .iter()
    .find(|p| p.username == username)
    .ok_or(Error::Unauthorized)?;

  let parsed_hash =
    PasswordHash::new(&principal.password_hash).map_err(|_| Error::Unauthorized)?;

  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .map_err(|_| Error::Unauthorized)?;

  Ok(principal.clone())
}

#[cfg(test)]
mod tests {
  use super::*;
  use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
  use axum::http::header;
  use rand_core::OsRng;

  fn hash(password: &str) -> String {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .unwrap()
      .to_string()
  }

  fn config() -> AuthConfig {
    AuthConfig {
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
    }
  }

  fn headers(user: &str, pass: &str) -> HeaderMap {
    let mut h = HeaderMap::new();
    let encoded = B64.encode(format!("{user}:{pass}"));
    h.insert(
      header::AUTHORIZATION,
      format!("Basic {encoded}").parse().unwrap(),
    );
    h
  }

  #[test]
  fn correct_credentials_return_principal_role() {
    let cfg = config();
    let p = verify_auth(&headers("nurse", "rn-secret"), &cfg).unwrap();
    assert_eq!(p.role, Role::Rn);
    let p = verify_auth(&headers("counsel", "atty-secret"), &cfg).unwrap();
    assert_eq!(p.role, Role::Attorney);
  }

  #[test]
  fn wrong_password_rejected() {
    let cfg = config();
    assert!(matches!(
      verify_auth(&headers("nurse", "wrong"), &cfg),
      Err(Error::Unauthorized)
    ));
  }

  #[test]
  fn unknown_user_rejected() {
    let cfg = config();
    assert!(matches!(
      verify_auth(&headers("stranger", "rn-secret"), &cfg),
      Err(Error::Unauthorized)
    ));
  }

  #[test]
  fn missing_header_rejected() {
    let cfg = config();
    assert!(matches!(
      verify_auth(&HeaderMap::new(), &cfg),
      Err(Error::Unauthorized)
    ));
  }

  #[test]
  fn invalid_base64_rejected() {
    let cfg = config();
    let mut h = HeaderMap::new();
    h.insert(header::AUTHORIZATION, "Basic !!!not-base64!!!".parse().unwrap());
    assert!(matches!(verify_auth(&h, &cfg), Err(Error::Unauthorized)));
  }
}
