//! Staff authentication.
//!
//! A single credential pair comes from the environment; a successful login
//! mints a random bearer token persisted in the sessions table. This is a
//! thin layer by design: the dashboard is an internal tool, not an identity
//! system.

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::storage::Storage;

/// The staff credential pair, loaded once at startup.
#[derive(Clone)]
pub struct StaffCredentials {
    pub username: String,
    password: String,
}

impl StaffCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn matches(&self, username: &str, password: &str) -> bool {
        self.username == username && self.password == password
    }
}

/// Extract the bearer token from an Authorization header, if present.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Verify credentials and mint a session token.
///
/// Returns `None` (with no state change) when the credentials are wrong.
pub async fn login(
    storage: &Storage,
    credentials: &StaffCredentials,
    username: &str,
    password: &str,
    now: DateTime<Utc>,
) -> anyhow::Result<Option<String>> {
    if !credentials.matches(username, password) {
        return Ok(None);
    }

    let token = Uuid::new_v4().simple().to_string();
    storage.create_session(&token, username, now).await?;
    Ok(Some(token))
}

/// Whether the request carries a live session token.
pub async fn is_authenticated(storage: &Storage, headers: &HeaderMap) -> anyhow::Result<bool> {
    match bearer_token(headers) {
        Some(token) => storage.session_exists(token).await,
        None => Ok(false),
    }
}
