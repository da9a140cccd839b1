//! Error responses for the web front end.

use crate::templates::ErrorTemplate;
use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use glass::GlassError;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum WebError {
    /// The page names something that does not exist
    #[error("Not found")]
    NotFound,

    #[error(transparent)]
    Forum(#[from] GlassError),

    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    #[error("Session has no id after saving")]
    MissingSession,

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl WebError {
    fn status(&self) -> StatusCode {
        match self {
            WebError::NotFound => StatusCode::NOT_FOUND,
            WebError::Forum(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::NOT_FOUND {
            "The page you are looking for does not exist."
        } else {
            error!("Request failed: {}", self);
            "Something went wrong on our side. Please try again later."
        };

        let page = ErrorTemplate {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Error").to_string(),
            message: message.to_string(),
        };
        match page.render() {
            Ok(html) => (status, Html(html)).into_response(),
            Err(e) => {
                error!("Failed to render error page: {:?}", e);
                (status, message.to_string()).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(WebError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            WebError::from(GlassError::not_found("topic")).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            WebError::from(GlassError::storage("disk on fire")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
