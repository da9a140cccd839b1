//! Session login for the Glass web interface.
//!
//! The session holds the username of the logged-in user and nothing else;
//! the user record is loaded from storage on every request so role and
//! profile changes apply immediately.

use crate::csrf::{get_csrf_token, validate_csrf_token, CsrfProtectedForm};
use crate::error::WebError;
use crate::templates::{LoginTemplate, Nav};
use crate::AppState;
use axum::{
    extract::{Form, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use glass::forum::{ForumStorage, User};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, warn};

/// Session key holding the logged-in username.
const USER_KEY: &str = "username";

/// Longest accepted password, to bound hashing work.
const MAX_PASSWORD_SIZE: usize = 1024;

const LOGIN_FAILED: &str = "Please enter a correct username and password.";

/// The logged-in user, if any.
///
/// A session naming a user that no longer exists counts as anonymous.
pub async fn current_user(session: &Session, storage: &ForumStorage) -> Result<Option<User>, WebError> {
    let Some(username) = session.get::<String>(USER_KEY).await? else {
        return Ok(None);
    };
    let user = storage.get_user(&username)?;
    if user.is_none() {
        warn!(username = %username, "Session names an unknown user");
    }
    Ok(user)
}

/// Navigation data for the current request, creating the CSRF token if needed.
pub async fn nav(session: &Session, app_state: &AppState, user: Option<&User>) -> Result<Nav, WebError> {
    let csrf_token = get_csrf_token(session, &app_state.csrf_store).await?;
    Ok(Nav::new(user.map(|u| u.username.as_str()), csrf_token))
}

/// Redirect to the login page, coming back to `next` afterwards.
pub fn login_redirect(next: &str) -> Response {
    Redirect::to(&format!("/accounts/login/?next={}", safe_next(Some(next)))).into_response()
}

/// Only local absolute paths are followed after login.
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path
        }
        _ => "/",
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub next: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct LogoutForm {
    #[serde(default)]
    pub csrf_token: String,
}

/// Login page
pub async fn login_page(
    State(app_state): State<AppState>,
    session: Session,
    Query(query): Query<LoginQuery>,
) -> Result<Html<String>, WebError> {
    let user = current_user(&session, &app_state.storage).await?;
    let template = LoginTemplate {
        nav: nav(&session, &app_state, user.as_ref()).await?,
        next: safe_next(query.next.as_deref()).to_string(),
        username: String::new(),
        error: String::new(),
        has_error: false,
    };
    Ok(Html(template.to_string()))
}

/// Login handler
pub async fn login_handler(
    State(app_state): State<AppState>,
    session: Session,
    Form(form): Form<CsrfProtectedForm<LoginForm>>,
) -> Result<Response, WebError> {
    if !form.validate(&session, &app_state.csrf_store) {
        warn!("CSRF validation failed for login");
        return Ok(Redirect::to("/accounts/login/").into_response());
    }

    let data = form.data;
    let next = safe_next(Some(&data.next)).to_string();

    let user = if data.password.len() > MAX_PASSWORD_SIZE {
        None
    } else {
        let storage = app_state.storage.clone();
        let (username, password) = (data.username.clone(), data.password);
        tokio::task::spawn_blocking(move || storage.authenticate(&username, &password)).await??
    };

    match user {
        Some(user) => {
            let old_id = session.id().map(|id| id.to_string());
            session.cycle_id().await?;
            session.insert(USER_KEY, &user.username).await?;
            if let Some(old_id) = old_id {
                app_state.csrf_store.revoke(&old_id);
            }
            info!(username = %user.username, "User logged in");
            Ok(Redirect::to(&next).into_response())
        }
        None => {
            warn!(username = %data.username, "Failed login");
            let template = LoginTemplate {
                nav: nav(&session, &app_state, None).await?,
                next,
                username: data.username,
                error: LOGIN_FAILED.to_string(),
                has_error: true,
            };
            Ok(Html(template.to_string()).into_response())
        }
    }
}

/// Logout handler
pub async fn logout_handler(
    State(app_state): State<AppState>,
    session: Session,
    Form(form): Form<LogoutForm>,
) -> Result<Response, WebError> {
    if !validate_csrf_token(&session, &app_state.csrf_store, &form.csrf_token) {
        warn!("CSRF validation failed for logout");
        return Ok(Redirect::to("/").into_response());
    }
    if let Some(id) = session.id() {
        app_state.csrf_store.revoke(&id.to_string());
    }
    let username = session.remove::<String>(USER_KEY).await?;
    session.flush().await?;
    info!(username = ?username, "User logged out");
    Ok(Redirect::to("/").into_response())
}
