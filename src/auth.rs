//! Credential checks and bearer sessions.
//!
//! Passwords are stored as Argon2 PHC strings. Sessions are random UUID
//! tokens kept in the store with an expiry; the `AuthUser` extractor reads
//! `Authorization: Bearer <token>` and rejects with 401.

use std::sync::Arc;

use argon2::{
  password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
  Argon2,
};
use axum::{
  extract::FromRequestParts,
  http::{header::AUTHORIZATION, request::Parts},
};
use chrono::{Duration, NaiveDateTime};
use rand_core::OsRng;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::UserId;
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::store::{Session, Store};

/// Ten years; keeps the expiry arithmetic in range.
const MAX_SESSION_TTL_HOURS: i64 = 24 * 365 * 10;

pub fn hash_password(password: &str) -> AppResult<String> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|h| h.to_string())
    .map_err(|e| AppError::Persistence(format!("password hashing failed: {e}")))
}

/// False for a wrong password and for a malformed stored hash.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
  match PasswordHash::new(stored_hash) {
    Ok(parsed) => Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok(),
    Err(e) => {
      warn!(target: "auth", error = %e, "Stored password hash is malformed");
      false
    }
  }
}

pub async fn issue_session(store: &Store, user_id: UserId, ttl_hours: i64, now: NaiveDateTime) -> String {
  let token = Uuid::new_v4().to_string();
  let expires_at = now + Duration::hours(ttl_hours.clamp(1, MAX_SESSION_TTL_HOURS));
  store.insert_session(token.clone(), Session { user_id, expires_at }, now).await;
  debug!(target: "auth", user_id, %expires_at, "Session issued");
  token
}

/// Resolve a token to its user. Expired sessions are dropped.
pub async fn resolve_session(store: &Store, token: &str, now: NaiveDateTime) -> AppResult<UserId> {
  let session = store
    .session(token)
    .await
    .ok_or_else(|| AppError::Auth("invalid token".into()))?;
  if session.expires_at <= now {
    store.remove_session(token).await;
    return Err(AppError::Auth("token expired".into()));
  }
  Ok(session.user_id)
}

fn bearer_token(parts: &Parts) -> AppResult<&str> {
  let header = parts
    .headers
    .get(AUTHORIZATION)
    .ok_or_else(|| AppError::Auth("missing authorization header".into()))?
    .to_str()
    .map_err(|_| AppError::Auth("malformed authorization header".into()))?;
  let token = header
    .strip_prefix("Bearer ")
    .map(str::trim)
    .filter(|t| !t.is_empty())
    .ok_or_else(|| AppError::Auth("expected a bearer token".into()))?;
  Ok(token)
}

/// The authenticated caller.
#[derive(Clone, Copy, Debug)]
pub struct AuthUser {
  pub user_id: UserId,
}

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
  type Rejection = AppError;

  async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
    let token = bearer_token(parts)?;
    let user_id = resolve_session(&state.store, token, crate::clock::now()).await?;
    Ok(AuthUser { user_id })
  }
}
