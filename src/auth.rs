use crate::AppState;
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    response::Redirect,
};
use axum_extra::extract::CookieJar;
use password_hash::{PasswordHash, SaltString};
use rand::RngCore;
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "session_id";

// ── Password hashing ───────────────────────────────────────────────────────

/// Hash the admin password into a PHC string with Argon2id and a random salt.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let mut salt_bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| anyhow::anyhow!("failed to encode password salt: {e}"))?;

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("failed to hash admin password: {e}"))?;

    Ok(hash.to_string())
}

/// Check a login attempt against the stored PHC hash.
pub fn verify_password(password: &str, phc: &str) -> bool {
    match PasswordHash::new(phc) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::error!("Stored admin password hash is invalid: {}", e);
            false
        }
    }
}

// ── Session Store ──────────────────────────────────────────────────────────

/// In-memory session store mapping a token (UUID) to the instant it was
/// issued. Tokens expire after `session_duration`.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Instant>>,
    pub session_duration: Duration,
}

impl SessionStore {
    pub fn new(session_duration_hours: u64) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            session_duration: Duration::from_secs(session_duration_hours.saturating_mul(3600)),
        }
    }

    /// Issue a new session and return its token.
    pub async fn create(&self) -> String {
        let token = Uuid::new_v4().to_string();
        let mut sessions = self.sessions.write().await;
        // Prune expired sessions on every login
        sessions.retain(|_, issued_at| issued_at.elapsed() < self.session_duration);
        sessions.insert(token.clone(), Instant::now());
        token
    }

    pub async fn is_valid(&self, token: &str) -> bool {
        let sessions = self.sessions.read().await;
        sessions
            .get(token)
            .is_some_and(|issued_at| issued_at.elapsed() < self.session_duration)
    }

    /// Invalidate a session (logout).
    pub async fn remove(&self, token: &str) {
        self.sessions.write().await.remove(token);
    }
}

// ── AuthUser extractor ─────────────────────────────────────────────────────

/// Gate for admin handlers. Succeeds when the request carries a live
/// session cookie, otherwise redirects to the login page before the handler
/// runs.
pub struct AuthUser;

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Arc<AppState>: FromRef<S>,
{
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = Arc::<AppState>::from_ref(state);
        let jar = CookieJar::from_headers(&parts.headers);

        let valid = match jar.get(SESSION_COOKIE) {
            Some(cookie) => state.sessions.is_valid(cookie.value()).await,
            None => false,
        };

        if valid {
            Ok(AuthUser)
        } else {
            Err(Redirect::to("/admin/login"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_round_trip() {
        let phc = hash_password("s3cret").unwrap();
        assert!(phc.starts_with("$argon2id$"));
        assert!(verify_password("s3cret", &phc));
        assert!(!verify_password("wrong", &phc));
        assert!(!verify_password("s3cret", "not-a-phc-string"));
    }

    #[tokio::test]
    async fn sessions_expire_and_can_be_revoked() {
        let store = SessionStore::new(1);
        let token = store.create().await;
        assert!(store.is_valid(&token).await);
        assert!(!store.is_valid("unknown").await);

        store.remove(&token).await;
        assert!(!store.is_valid(&token).await);

        let expired = SessionStore::new(0);
        let token = expired.create().await;
        assert!(!expired.is_valid(&token).await);
    }
}
