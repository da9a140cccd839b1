//! Askama templates for the Glass web interface

use askama::Template;
use chrono::{TimeZone, Utc};

/// Formats a millisecond timestamp for pages.
pub fn format_timestamp(millis: u64) -> String {
    match Utc.timestamp_millis_opt(millis as i64).single() {
        Some(datetime) => datetime.format("%b %e, %Y %H:%M").to_string(),
        None => String::new(),
    }
}

/// Who is looking at the page, for the navigation bar
#[derive(Debug, Clone, Default)]
pub struct Nav {
    pub logged_in: bool,
    pub username: String,
    pub csrf_token: String,
}

impl Nav {
    pub fn new(username: Option<&str>, csrf_token: String) -> Self {
        Self {
            logged_in: username.is_some(),
            username: username.unwrap_or_default().to_string(),
            csrf_token,
        }
    }
}

/// One message as rendered on topic and profile pages
#[derive(Debug, Clone)]
pub struct MessageView {
    pub id: u64,
    pub author: String,
    pub author_name: String,
    /// Sanitized HTML of the content
    pub html: String,
    /// Raw Markdown, for the edit box
    pub source: String,
    pub created_display: String,
    pub edited: bool,
    pub likes: usize,
    pub liked: bool,
    pub editable: bool,
    pub topic_slug: String,
    pub topic_title: String,
}

/// One row of the topic listing
#[derive(Debug, Clone)]
pub struct TopicRow {
    pub slug: String,
    pub title: String,
    pub tags: Vec<String>,
    pub author: String,
    pub preview_html: String,
    pub likes: usize,
    pub message_count: usize,
}

/// A pagination link
#[derive(Debug, Clone)]
pub struct PageLink {
    pub number: usize,
    pub current: bool,
}

/// A tag filter link
#[derive(Debug, Clone)]
pub struct TagLink {
    pub name: String,
    pub active: bool,
}

/// Index page template
#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub nav: Nav,
    pub topics: Vec<TopicRow>,
    pub has_topics: bool,
    pub page_number: usize,
    pub num_pages: usize,
    pub total: usize,
    pub page_links: Vec<PageLink>,
    pub has_previous: bool,
    pub has_next: bool,
    pub tags: Vec<TagLink>,
    pub search: String,
    pub tag: String,
    pub page_size: usize,
}

/// About page template
#[derive(Template)]
#[template(path = "about.html")]
pub struct AboutTemplate {
    pub nav: Nav,
    pub version: String,
}

/// Topic page template
#[derive(Template)]
#[template(path = "topic.html")]
pub struct TopicTemplate {
    pub nav: Nav,
    pub slug: String,
    pub title: String,
    pub tags: Vec<String>,
    pub messages: Vec<MessageView>,
    /// Preserved input of a rejected post
    pub content: String,
    pub content_errors: Vec<String>,
}

/// New topic template
#[derive(Template)]
#[template(path = "new_topic.html")]
pub struct NewTopicTemplate {
    pub nav: Nav,
    pub title: String,
    pub tags: String,
    pub content: String,
    pub title_errors: Vec<String>,
    pub tags_errors: Vec<String>,
    pub content_errors: Vec<String>,
    pub available_tags: Vec<String>,
}

/// User profile template
#[derive(Template)]
#[template(path = "user.html")]
pub struct UserTemplate {
    pub nav: Nav,
    pub username: String,
    pub display_name: String,
    pub joined_display: String,
    pub is_staff: bool,
    pub is_owner: bool,
    pub saved: bool,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub first_name_errors: Vec<String>,
    pub last_name_errors: Vec<String>,
    pub email_errors: Vec<String>,
    pub latest: Vec<MessageView>,
}

/// Login template
#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub nav: Nav,
    pub next: String,
    pub username: String,
    pub error: String,
    pub has_error: bool,
}

/// Error page template
#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub status: u16,
    pub reason: String,
    pub message: String,
}
