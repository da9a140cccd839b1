//! Forum web handlers for the Glass web interface.
//!
//! Page handlers render askama templates; the `msg-*` endpoints answer the
//! AJAX calls of `glass-ajax.js` with short plain-text or HTML bodies and
//! never fail loudly: anything they cannot do yields a neutral body.

use crate::auth::{current_user, login_redirect, nav};
use crate::csrf::{validate_csrf_token, CsrfProtectedForm};
use crate::error::WebError;
use crate::templates::{
    format_timestamp, AboutTemplate, IndexTemplate, MessageView, NewTopicTemplate, PageLink,
    TagLink, TopicRow, TopicTemplate, UserTemplate,
};
use crate::AppState;
use axum::{
    extract::{Form, Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use glass::forum::{
    constants::{MAX_MESSAGE_SIZE, PROFILE_RECENT_MESSAGES},
    editable_by, paginate, render_markdown,
    validation::{validate_message_form, validate_profile_form, validate_topic_form},
    ForumStorage, Message, MessageForm, MessageId, ProfileForm, Topic, TopicForm, TopicQuery, User,
};
use glass::GlassError;
use serde::Deserialize;
use std::collections::HashMap;
use tower_sessions::Session;
use tracing::{debug, info, warn};

/// Characters of the initial message shown in the topic listing.
const PREVIEW_CHARS: usize = 200;

/// Body of a successful delete.
const DELETED: &str = "deleted";

// =============================================================================
// Form data
// =============================================================================

/// New topic form; field names carry the `topic-` and `msg-` prefixes
#[derive(Debug, Default, Deserialize)]
pub struct NewTopicForm {
    #[serde(rename = "topic-title", default)]
    pub title: String,
    #[serde(rename = "topic-tags", default)]
    pub tags: String,
    #[serde(rename = "msg-content", default)]
    pub content: String,
}

/// `msg_id` query of the like and delete endpoints
#[derive(Debug, Default, Deserialize)]
pub struct MessageQuery {
    pub msg_id: Option<String>,
    pub csrf_token: Option<String>,
}

/// Message edit form
#[derive(Debug, Default, Deserialize)]
pub struct MessageEditForm {
    #[serde(default)]
    pub msg_id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub csrf_token: String,
}

fn parse_message_id(raw: Option<&str>) -> Option<MessageId> {
    raw.and_then(|s| s.trim().parse().ok())
}

// =============================================================================
// Display helpers
// =============================================================================

/// Resolves author display names, loading each user once.
struct AuthorNames<'a> {
    storage: &'a ForumStorage,
    cache: HashMap<String, String>,
}

impl<'a> AuthorNames<'a> {
    fn new(storage: &'a ForumStorage) -> Self {
        Self {
            storage,
            cache: HashMap::new(),
        }
    }

    fn get(&mut self, username: &str) -> Result<String, WebError> {
        if let Some(name) = self.cache.get(username) {
            return Ok(name.clone());
        }
        let name = match self.storage.get_user(username)? {
            Some(user) => user.display_name(),
            None => username.to_string(),
        };
        self.cache.insert(username.to_string(), name.clone());
        Ok(name)
    }
}

fn message_view(
    message: &Message,
    topic: &Topic,
    author_name: String,
    viewer: Option<&User>,
    editable: bool,
) -> MessageView {
    MessageView {
        id: message.id,
        author: message.author.clone(),
        author_name,
        html: render_markdown(&message.content),
        source: message.content.clone(),
        created_display: format_timestamp(message.created),
        edited: message.modified_later(),
        likes: message.likes(),
        liked: viewer.is_some_and(|u| message.is_liked_by(&u.username)),
        editable,
        topic_slug: topic.slug().to_string(),
        topic_title: topic.title().to_string(),
    }
}

fn preview_source(content: &str) -> String {
    let mut preview: String = content.chars().take(PREVIEW_CHARS).collect();
    if preview.len() < content.len() {
        preview.push('…');
    }
    preview
}

// =============================================================================
// Pages
// =============================================================================

/// Topic listing
pub async fn index(
    State(app_state): State<AppState>,
    session: Session,
    Query(query): Query<TopicQuery>,
) -> Result<Html<String>, WebError> {
    let storage = &app_state.storage;
    let user = current_user(&session, storage).await?;

    let page_size = query.page_size();
    let summaries = storage.topic_summaries(query.tag(), query.search())?;
    let page = paginate(summaries, query.page.as_deref(), page_size);

    let tags = storage
        .list_tags()?
        .into_iter()
        .map(|tag| TagLink {
            active: query.tag() == Some(tag.name.as_str()),
            name: tag.name,
        })
        .collect();

    let mut template = IndexTemplate {
        nav: nav(&session, &app_state, user.as_ref()).await?,
        topics: Vec::new(),
        has_topics: false,
        page_number: 0,
        num_pages: 0,
        total: 0,
        page_links: Vec::new(),
        has_previous: false,
        has_next: false,
        tags,
        search: query.search().unwrap_or_default().to_string(),
        tag: query.tag().unwrap_or_default().to_string(),
        page_size,
    };

    if let Some(page) = page {
        template.has_topics = true;
        template.page_number = page.number;
        template.num_pages = page.num_pages;
        template.total = page.count;
        template.has_previous = page.has_previous();
        template.has_next = page.has_next();
        template.page_links = page
            .page_range()
            .map(|number| PageLink {
                number,
                current: number == page.number,
            })
            .collect();
        template.topics = page
            .object_list
            .into_iter()
            .map(|summary| TopicRow {
                slug: summary.topic.slug().to_string(),
                title: summary.topic.title().to_string(),
                tags: summary.topic.tag_list(),
                author: summary.initial_message.author.clone(),
                preview_html: render_markdown(&preview_source(&summary.initial_message.content)),
                likes: summary.likes(),
                message_count: summary.message_count,
            })
            .collect();
    }

    Ok(Html(template.to_string()))
}

/// About page
pub async fn about(
    State(app_state): State<AppState>,
    session: Session,
) -> Result<Html<String>, WebError> {
    let user = current_user(&session, &app_state.storage).await?;
    let template = AboutTemplate {
        nav: nav(&session, &app_state, user.as_ref()).await?,
        version: glass::VERSION.to_string(),
    };
    Ok(Html(template.to_string()))
}

async fn render_topic(
    app_state: &AppState,
    session: &Session,
    topic: &Topic,
    user: Option<&User>,
    content: String,
    content_errors: Vec<String>,
) -> Result<Html<String>, WebError> {
    let storage = &app_state.storage;
    let messages = storage.topic_messages(topic.id)?;
    let newest = messages.last().map(|m| m.id).unwrap_or_default();

    let mut names = AuthorNames::new(storage);
    let mut views = Vec::with_capacity(messages.len());
    for message in &messages {
        let editable = editable_by(message, newest, user);
        views.push(message_view(
            message,
            topic,
            names.get(&message.author)?,
            user,
            editable,
        ));
    }

    let template = TopicTemplate {
        nav: nav(session, app_state, user).await?,
        slug: topic.slug().to_string(),
        title: topic.title().to_string(),
        tags: topic.tag_list(),
        messages: views,
        content,
        content_errors,
    };
    Ok(Html(template.to_string()))
}

/// Topic page
pub async fn topic_page(
    State(app_state): State<AppState>,
    session: Session,
    Path(slug): Path<String>,
) -> Result<Html<String>, WebError> {
    let topic = app_state
        .storage
        .get_topic_by_slug(&slug)?
        .ok_or(WebError::NotFound)?;
    let user = current_user(&session, &app_state.storage).await?;
    render_topic(&app_state, &session, &topic, user.as_ref(), String::new(), Vec::new()).await
}

/// Post a message to a topic
pub async fn topic_post(
    State(app_state): State<AppState>,
    session: Session,
    Path(slug): Path<String>,
    Form(form): Form<CsrfProtectedForm<MessageForm>>,
) -> Result<Response, WebError> {
    let storage = &app_state.storage;
    let topic = storage
        .get_topic_by_slug(&slug)?
        .ok_or(WebError::NotFound)?;
    let redirect_url = format!("/topic/{}/", topic.slug());

    let Some(user) = current_user(&session, storage).await? else {
        return Ok(login_redirect(&redirect_url));
    };
    if !form.validate(&session, &app_state.csrf_store) {
        warn!("CSRF validation failed for message post");
        return Ok(Redirect::to(&redirect_url).into_response());
    }

    let data = form.data;
    let check = validate_message_form(&data);
    if !check.is_valid {
        let page = render_topic(
            &app_state,
            &session,
            &topic,
            Some(&user),
            data.content,
            check.field_errors("content"),
        )
        .await?;
        return Ok(page.into_response());
    }

    let message = storage.post_message(topic.id, &user.username, &data.content)?;
    debug!(message_id = message.id, topic = topic.slug(), "Message posted");
    Ok(Redirect::to(&redirect_url).into_response())
}

async fn render_new_topic(
    app_state: &AppState,
    session: &Session,
    user: &User,
    form: NewTopicForm,
    errors: [Vec<String>; 3],
) -> Result<Html<String>, WebError> {
    let available_tags = app_state
        .storage
        .list_tags()?
        .into_iter()
        .map(|tag| tag.name)
        .collect();
    let [title_errors, tags_errors, content_errors] = errors;
    let template = NewTopicTemplate {
        nav: nav(session, app_state, Some(user)).await?,
        title: form.title,
        tags: form.tags,
        content: form.content,
        title_errors,
        tags_errors,
        content_errors,
        available_tags,
    };
    Ok(Html(template.to_string()))
}

/// New topic page
pub async fn new_topic_page(
    State(app_state): State<AppState>,
    session: Session,
) -> Result<Response, WebError> {
    let Some(user) = current_user(&session, &app_state.storage).await? else {
        return Ok(login_redirect("/new-topic/"));
    };
    let page = render_new_topic(
        &app_state,
        &session,
        &user,
        NewTopicForm::default(),
        Default::default(),
    )
    .await?;
    Ok(page.into_response())
}

/// Create a topic together with its first message
pub async fn new_topic_handler(
    State(app_state): State<AppState>,
    session: Session,
    Form(form): Form<CsrfProtectedForm<NewTopicForm>>,
) -> Result<Response, WebError> {
    let storage = &app_state.storage;
    let Some(user) = current_user(&session, storage).await? else {
        return Ok(login_redirect("/new-topic/"));
    };
    if !form.validate(&session, &app_state.csrf_store) {
        warn!("CSRF validation failed for new topic");
        return Ok(Redirect::to("/new-topic/").into_response());
    }

    let data = form.data;
    let topic_form = TopicForm {
        title: data.title.clone(),
        tags: data.tags.clone(),
    };
    let message_form = MessageForm {
        content: data.content.clone(),
    };
    let topic_check = validate_topic_form(&topic_form, storage)?;
    let message_check = validate_message_form(&message_form);

    let mut errors = [
        topic_check.field_errors("title"),
        topic_check.field_errors("tags"),
        message_check.field_errors("content"),
    ];

    if topic_check.is_valid && message_check.is_valid {
        match storage.create_topic(
            topic_form.title(),
            &topic_form.tag_names(),
            &user.username,
            &message_form.content,
        ) {
            Ok((topic, _)) => {
                info!(slug = topic.slug(), author = %user.username, "Topic created");
                return Ok(Redirect::to(&format!("/topic/{}/", topic.slug())).into_response());
            }
            // Lost a race with a concurrent topic of the same slug or a tag removal
            Err(GlassError::Validation(msg)) => errors[0].push(msg),
            Err(e) => return Err(e.into()),
        }
    }

    let page = render_new_topic(&app_state, &session, &user, data, errors).await?;
    Ok(page.into_response())
}

async fn render_user(
    app_state: &AppState,
    session: &Session,
    profile: &User,
    viewer: &User,
    form: Option<(ProfileForm, glass::forum::ValidationResult)>,
    saved: bool,
) -> Result<Html<String>, WebError> {
    let storage = &app_state.storage;

    let mut latest = Vec::new();
    let author_name = profile.display_name();
    for message in storage.latest_messages_by(&profile.username, PROFILE_RECENT_MESSAGES)? {
        let Some(topic) = storage.get_topic(message.topic)? else {
            continue;
        };
        let editable = storage.message_editable_by(&message, Some(viewer))?;
        latest.push(message_view(
            &message,
            &topic,
            author_name.clone(),
            Some(viewer),
            editable,
        ));
    }

    let (values, errors) = match form {
        Some((values, errors)) => (values, errors),
        None => (
            ProfileForm {
                first_name: profile.first_name.clone(),
                last_name: profile.last_name.clone(),
                email: profile.email.clone(),
            },
            Default::default(),
        ),
    };

    let template = UserTemplate {
        nav: nav(session, app_state, Some(viewer)).await?,
        username: profile.username.clone(),
        display_name: profile.display_name(),
        joined_display: format_timestamp(profile.date_joined),
        is_staff: profile.is_staff,
        is_owner: profile.username == viewer.username,
        saved,
        first_name: values.first_name,
        last_name: values.last_name,
        email: values.email,
        first_name_errors: errors.field_errors("first_name"),
        last_name_errors: errors.field_errors("last_name"),
        email_errors: errors.field_errors("email"),
        latest,
    };
    Ok(Html(template.to_string()))
}

/// User profile page
pub async fn user_page(
    State(app_state): State<AppState>,
    session: Session,
    Path(username): Path<String>,
) -> Result<Response, WebError> {
    let Some(viewer) = current_user(&session, &app_state.storage).await? else {
        return Ok(login_redirect(&format!("/user/{}/", username)));
    };
    let profile = app_state
        .storage
        .get_user(&username)?
        .ok_or(WebError::NotFound)?;
    let page = render_user(&app_state, &session, &profile, &viewer, None, false).await?;
    Ok(page.into_response())
}

/// Profile update; only the owner's submissions have an effect
pub async fn user_update(
    State(app_state): State<AppState>,
    session: Session,
    Path(username): Path<String>,
    Form(form): Form<CsrfProtectedForm<ProfileForm>>,
) -> Result<Response, WebError> {
    let storage = &app_state.storage;
    let Some(viewer) = current_user(&session, storage).await? else {
        return Ok(login_redirect(&format!("/user/{}/", username)));
    };
    let profile = storage.get_user(&username)?.ok_or(WebError::NotFound)?;

    if viewer.username != profile.username {
        warn!(viewer = %viewer.username, profile = %profile.username, "Ignoring profile update by non-owner");
        let page = render_user(&app_state, &session, &profile, &viewer, None, false).await?;
        return Ok(page.into_response());
    }
    if !form.validate(&session, &app_state.csrf_store) {
        warn!("CSRF validation failed for profile update");
        return Ok(Redirect::to(&format!("/user/{}/", username)).into_response());
    }

    let data = form.data;
    let check = validate_profile_form(&data);
    if !check.is_valid {
        let page =
            render_user(&app_state, &session, &profile, &viewer, Some((data, check)), false)
                .await?;
        return Ok(page.into_response());
    }

    let updated = storage.update_profile(&profile.username, &data)?;
    let page = render_user(&app_state, &session, &updated, &updated, None, true).await?;
    Ok(page.into_response())
}

// =============================================================================
// AJAX endpoints
// =============================================================================

/// Toggle the requester's like; answers with the new count, `0` when nothing happened
pub async fn msg_like(
    State(app_state): State<AppState>,
    session: Session,
    Query(query): Query<MessageQuery>,
) -> Result<String, WebError> {
    let storage = &app_state.storage;
    let Some(user) = current_user(&session, storage).await? else {
        return Ok("0".to_string());
    };
    let Some(msg_id) = parse_message_id(query.msg_id.as_deref()) else {
        return Ok("0".to_string());
    };

    match storage.toggle_like(msg_id, &user.username) {
        Ok(likes) => Ok(likes.to_string()),
        Err(e) if e.is_not_found() => Ok("0".to_string()),
        Err(e) => Err(e.into()),
    }
}

/// Replace a message's content; answers with the rendered HTML, empty when refused
pub async fn msg_edit(
    State(app_state): State<AppState>,
    session: Session,
    Form(form): Form<MessageEditForm>,
) -> Result<Html<String>, WebError> {
    let storage = &app_state.storage;
    let refused = || -> Result<Html<String>, WebError> { Ok(Html(String::new())) };

    let Some(user) = current_user(&session, storage).await? else {
        return refused();
    };
    if !validate_csrf_token(&session, &app_state.csrf_store, &form.csrf_token) {
        warn!("CSRF validation failed for message edit");
        return refused();
    }
    let Some(msg_id) = parse_message_id(Some(&form.msg_id)) else {
        return refused();
    };
    if form.content.len() > MAX_MESSAGE_SIZE {
        return refused();
    }

    match storage.edit_message(msg_id, &user, &form.content) {
        Ok(message) => Ok(Html(render_markdown(&message.content))),
        Err(
            GlassError::NotFound(_) | GlassError::PermissionDenied(_) | GlassError::Validation(_),
        ) => refused(),
        Err(e) => Err(e.into()),
    }
}

/// Delete a message, and its topic with it when it was the last one
pub async fn msg_del(
    State(app_state): State<AppState>,
    session: Session,
    Query(query): Query<MessageQuery>,
) -> Result<String, WebError> {
    let storage = &app_state.storage;

    let Some(user) = current_user(&session, storage).await? else {
        return Ok(String::new());
    };
    let token = query.csrf_token.as_deref().unwrap_or_default();
    if !validate_csrf_token(&session, &app_state.csrf_store, token) {
        warn!("CSRF validation failed for message delete");
        return Ok(String::new());
    }
    let Some(msg_id) = parse_message_id(query.msg_id.as_deref()) else {
        return Ok(String::new());
    };

    match storage.delete_message(msg_id, &user) {
        Ok(_) => Ok(DELETED.to_string()),
        Err(GlassError::NotFound(_) | GlassError::PermissionDenied(_)) => Ok(String::new()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_message_id() {
        assert_eq!(parse_message_id(Some("42")), Some(42));
        assert_eq!(parse_message_id(Some(" 7 ")), Some(7));
        assert_eq!(parse_message_id(Some("-1")), None);
        assert_eq!(parse_message_id(Some("abc")), None);
        assert_eq!(parse_message_id(None), None);
    }

    #[test]
    fn test_preview_is_cut_on_char_boundary() {
        let long = "é".repeat(300);
        let preview = preview_source(&long);
        assert_eq!(preview.chars().count(), PREVIEW_CHARS + 1);
        assert!(preview.ends_with('…'));
        assert_eq!(preview_source("short"), "short");
    }
}
