//! Web server binary for Glass - serves the forum pages and the AJAX endpoints.

use axum::http::{header, HeaderValue};
use axum::{
    routing::{get, post},
    Router,
};
use glass::cli::utils::open_storage;
use glass::forum::ForumStorage;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tower_sessions::{MemoryStore, SessionManagerLayer};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod auth;
mod config;
mod csrf;
mod error;
mod forum_handlers;
mod templates;

use config::Config;
use csrf::CsrfStore;

/// Name of the session cookie.
const SESSION_COOKIE: &str = "glass-session";

/// State shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<ForumStorage>,
    pub csrf_store: CsrfStore,
}

impl AppState {
    pub fn new(storage: Arc<ForumStorage>) -> Self {
        Self {
            storage,
            csrf_store: CsrfStore::new(),
        }
    }
}

/// Builds the application router with sessions, static files and security headers.
pub fn build_router(app_state: AppState, config: &Config) -> Router {
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(config.secure_cookies)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_name(SESSION_COOKIE)
        .with_http_only(true);

    Router::new()
        .route("/", get(forum_handlers::index))
        .route("/about/", get(forum_handlers::about))
        .route(
            "/topic/:slug/",
            get(forum_handlers::topic_page).post(forum_handlers::topic_post),
        )
        .route(
            "/new-topic/",
            get(forum_handlers::new_topic_page).post(forum_handlers::new_topic_handler),
        )
        .route(
            "/user/:username/",
            get(forum_handlers::user_page).post(forum_handlers::user_update),
        )
        .route("/msg-like/", get(forum_handlers::msg_like))
        .route("/msg-edit/", post(forum_handlers::msg_edit))
        .route(
            "/msg-del/",
            get(forum_handlers::msg_del).post(forum_handlers::msg_del),
        )
        .route(
            "/accounts/login/",
            get(auth::login_page).post(auth::login_handler),
        )
        .route("/accounts/logout/", post(auth::logout_handler))
        .nest_service("/static", ServeDir::new(&config.static_dir))
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
        // Security headers to prevent common attacks
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_XSS_PROTECTION,
            HeaderValue::from_static("1; mode=block"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .with_state(app_state)
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "glass=info,glass_web=info,tower_http=debug".into()),
        )
        .init();

    let config = Config::load();

    let storage = match open_storage(&config.data_dir) {
        Ok(storage) => Arc::new(storage),
        Err(e) => {
            error!("Failed to open forum storage at {:?}: {}", config.data_dir, e);
            return Err(e.into());
        }
    };
    info!("Forum data stored in: {:?}", config.data_dir);

    if config.secure_cookies {
        info!("Secure cookies enabled - cookies will only be sent over HTTPS");
    } else {
        warn!("Secure cookies disabled - set GLASS_SECURE_COOKIES=true for production");
    }

    let app = build_router(AppState::new(storage), &config);

    let listener = TcpListener::bind(config.bind).await?;
    info!("🚀 Glass running on http://{}", config.bind);

    axum::serve(listener, app).await?;
    Ok(())
}
