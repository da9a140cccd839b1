//! CSRF protection for the Glass web interface
//!
//! Provides Cross-Site Request Forgery protection using session-based tokens.

use crate::error::WebError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tower_sessions::Session;
use tracing::debug;
use uuid::Uuid;

/// CSRF token store, keyed by session id
#[derive(Clone, Debug, Default)]
pub struct CsrfStore {
    tokens: Arc<RwLock<HashMap<String, String>>>,
}

impl CsrfStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a new CSRF token for the session
    pub fn generate_token(&self, session_id: &str) -> String {
        let token = Uuid::new_v4().to_string();
        let mut tokens = self.tokens.write().unwrap_or_else(PoisonError::into_inner);
        tokens.insert(session_id.to_string(), token.clone());
        token
    }

    /// The token already issued to the session, if any
    pub fn existing_token(&self, session_id: &str) -> Option<String> {
        let tokens = self.tokens.read().unwrap_or_else(PoisonError::into_inner);
        tokens.get(session_id).cloned()
    }

    /// Validate a CSRF token for the session
    pub fn validate_token(&self, session_id: &str, token: &str) -> bool {
        let tokens = self.tokens.read().unwrap_or_else(PoisonError::into_inner);
        tokens.get(session_id).is_some_and(|stored| stored == token)
    }

    /// Forget the token of a session that is going away
    pub fn revoke(&self, session_id: &str) {
        let mut tokens = self.tokens.write().unwrap_or_else(PoisonError::into_inner);
        tokens.remove(session_id);
    }
}

/// Get or create a CSRF token for the current session
pub async fn get_csrf_token(session: &Session, csrf_store: &CsrfStore) -> Result<String, WebError> {
    // A fresh session has no id until it is stored once
    let session_id = match session.id() {
        Some(id) => id.to_string(),
        None => {
            debug!("Creating new session");
            session.insert("initialized", true).await?;
            session.save().await?;
            session
                .id()
                .map(|id| id.to_string())
                .ok_or(WebError::MissingSession)?
        }
    };

    if let Some(existing_token) = csrf_store.existing_token(&session_id) {
        return Ok(existing_token);
    }

    debug!("Generating new CSRF token for session {}", session_id);
    Ok(csrf_store.generate_token(&session_id))
}

/// Check `token` against the one issued to this session
pub fn validate_csrf_token(session: &Session, csrf_store: &CsrfStore, token: &str) -> bool {
    match session.id() {
        Some(id) => csrf_store.validate_token(&id.to_string(), token),
        None => false,
    }
}

/// Form data wrapper that includes CSRF token validation
#[derive(Debug, Deserialize, Serialize)]
pub struct CsrfProtectedForm<T> {
    #[serde(default)]
    pub csrf_token: String,
    #[serde(flatten)]
    pub data: T,
}

impl<T> CsrfProtectedForm<T> {
    /// Validate the CSRF token
    pub fn validate(&self, session: &Session, csrf_store: &CsrfStore) -> bool {
        validate_csrf_token(session, csrf_store, &self.csrf_token)
    }
}
