//! HTTP Basic authentication against argon2 password hashes.
//!
//! A successful check resolves the caller to a [`UserId`] (the configured
//! username) and inserts it as a request extension for the API handlers.

use std::sync::Arc;

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use axum::{
  extract::{Request, State},
  http::{HeaderMap, header},
  middleware::Next,
  response::Response,
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use rand_core::OsRng;
use serde::Deserialize;
use wrench_core::UserId;

use crate::error::Error;

/// One account allowed to use the server.
#[derive(Clone, Debug, Deserialize)]
pub struct UserCredentials {
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
}

/// Credentials accepted as valid for this server instance.
#[derive(Clone, Debug, Default)]
pub struct AuthConfig {
  pub users: Vec<UserCredentials>,
}

/// Verify Basic credentials in `headers` and return the caller's id.
pub fn verify_auth(headers: &HeaderMap, config: &AuthConfig) -> Result<UserId, Error> {
  let header_val = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(Error::Unauthorized)?;

  let encoded = header_val.strip_prefix("Basic ").ok_or(Error::Unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| Error::Unauthorized)?;
  let creds = std::str::from_utf8(&decoded).map_err(|_| Error::Unauthorized)?;

  let (username, password) = creds.split_once(':').ok_or(Error::Unauthorized)?;

  let account = config
    .users
    .iter()
    .find(|u| u.username == username)
    .ok_or(Error::Unauthorized)?;

  let parsed_hash = PasswordHash::new(&account.password_hash).map_err(|_| {
    tracing::warn!(username, "configured password hash is not a valid PHC string");
    Error::Unauthorized
  })?;

  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .map_err(|_| Error::Unauthorized)?;

  Ok(UserId::new(username))
}

/// Hash `password` into an argon2id PHC string with a fresh salt.
pub fn hash_password(password: &str) -> Result<String, Error> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| Error::Hash(e.to_string()))
}

/// Middleware: reject unauthenticated requests with 401, otherwise attach the
/// caller's [`UserId`].
pub async fn require_auth(
  State(auth): State<Arc<AuthConfig>>,
  mut request: Request,
  next: Next,
) -> Result<Response, Error> {
  let user = verify_auth(request.headers(), &auth).inspect_err(|_| {
    tracing::debug!(uri = %request.uri(), "rejected unauthenticated request");
  })?;
  request.extensions_mut().insert(user);
  Ok(next.run(request).await)
}
