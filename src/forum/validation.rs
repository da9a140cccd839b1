//! Validation rules for user-submitted forms.
//!
//! Each form is validated field by field so a page can show every problem at
//! once. Validators return [`ValidationResult`] keyed by field name; storage
//! errors met while checking uniqueness are propagated as `Err`.

use crate::error::Result;
use crate::forum::constants::{
    MAX_EMAIL_LEN, MAX_MESSAGE_SIZE, MAX_PERSON_NAME_LEN, MAX_TAGS_PER_TOPIC, MAX_TAG_NAME_LEN,
    MAX_TITLE_LEN, MAX_USERNAME_LEN,
};
use crate::forum::storage::ForumStorage;
use crate::forum::types::slugify;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};

/// Shown for a required field left blank.
pub const REQUIRED: &str = "This field is required.";

/// Shown when a title slugifies to an existing topic.
pub const TOPIC_EXISTS: &str = "Such (or similar) topic already exists!";

/// Result of validation with per-field error messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    /// Whether every field is valid.
    pub is_valid: bool,
    errors: BTreeMap<String, Vec<String>>,
}

impl ValidationResult {
    /// Creates a successful validation result.
    pub fn ok() -> Self {
        Self {
            is_valid: true,
            errors: BTreeMap::new(),
        }
    }

    /// Adds an error for `field`.
    pub fn add_error(&mut self, field: &str, error: impl Into<String>) {
        self.is_valid = false;
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(error.into());
    }

    /// Errors recorded for `field`, empty if it is valid.
    pub fn field_errors(&self, field: &str) -> Vec<String> {
        self.errors.get(field).cloned().unwrap_or_default()
    }

    /// All errors, by field name.
    pub fn errors(&self) -> &BTreeMap<String, Vec<String>> {
        &self.errors
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::ok()
    }
}

fn check_length(result: &mut ValidationResult, field: &str, value: &str, max: usize) {
    let len = value.chars().count();
    if len > max {
        result.add_error(
            field,
            format!(
                "Ensure this value has at most {} characters (it has {}).",
                max, len
            ),
        );
    }
}

// =============================================================================
// Topic form
// =============================================================================

/// Raw topic form input: a title and comma-separated tag names.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TopicForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub tags: String,
}

impl TopicForm {
    /// The trimmed title.
    pub fn title(&self) -> &str {
        self.title.trim()
    }

    /// The distinct tag names, in order, without blanks.
    pub fn tag_names(&self) -> BTreeSet<String> {
        parse_tags(&self.tags)
    }
}

/// Splits a comma-separated tag list.
pub fn parse_tags(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Checks a topic's title and tag count, without looking at storage.
///
/// Rejects blank or overlong titles, titles without any slug characters and
/// more than [`MAX_TAGS_PER_TOPIC`] tags.
pub fn validate_topic_fields(title: &str, tags: &BTreeSet<String>) -> ValidationResult {
    let mut result = ValidationResult::ok();

    let title = title.trim();
    if title.is_empty() {
        result.add_error("title", REQUIRED);
    } else {
        check_length(&mut result, "title", title, MAX_TITLE_LEN);
        if slugify(title).is_empty() {
            result.add_error("title", "Title must contain at least one letter or digit.");
        }
    }

    if tags.len() > MAX_TAGS_PER_TOPIC {
        result.add_error(
            "tags",
            format!("A topic can carry at most {} tags.", MAX_TAGS_PER_TOPIC),
        );
    }

    result
}

/// Validates a topic form against the current forum contents.
///
/// On top of [`validate_topic_fields`], rejects titles whose slug already
/// names a topic and unknown tags.
pub fn validate_topic_form(form: &TopicForm, storage: &ForumStorage) -> Result<ValidationResult> {
    let tags = form.tag_names();
    let mut result = validate_topic_fields(form.title(), &tags);

    if result.field_errors("title").is_empty() && storage.slug_exists(&slugify(form.title()))? {
        result.add_error("title", TOPIC_EXISTS);
    }
    for tag in &tags {
        if !storage.tag_exists(tag)? {
            result.add_error(
                "tags",
                format!(
                    "Select a valid choice. {} is not one of the available choices.",
                    tag
                ),
            );
        }
    }

    Ok(result)
}

// =============================================================================
// Message form
// =============================================================================

/// Raw message form input.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageForm {
    #[serde(default)]
    pub content: String,
}

/// Validates message content: present and within size bounds.
pub fn validate_message_form(form: &MessageForm) -> ValidationResult {
    let mut result = ValidationResult::ok();
    validate_content(&mut result, "content", &form.content);
    result
}

fn validate_content(result: &mut ValidationResult, field: &str, content: &str) {
    if content.trim().is_empty() {
        result.add_error(field, REQUIRED);
    } else if content.len() > MAX_MESSAGE_SIZE {
        result.add_error(
            field,
            format!("Message is too long (at most {} bytes).", MAX_MESSAGE_SIZE),
        );
    }
}

// =============================================================================
// Profile form
// =============================================================================

/// The editable subset of a user record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
}

impl ProfileForm {
    /// Returns a copy with surrounding whitespace removed from every field.
    pub fn trimmed(&self) -> Self {
        Self {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.trim().to_string(),
        }
    }
}

/// Validates a profile update. All fields may be blank.
pub fn validate_profile_form(form: &ProfileForm) -> ValidationResult {
    let form = form.trimmed();
    let mut result = ValidationResult::ok();

    check_length(&mut result, "first_name", &form.first_name, MAX_PERSON_NAME_LEN);
    check_length(&mut result, "last_name", &form.last_name, MAX_PERSON_NAME_LEN);
    check_length(&mut result, "email", &form.email, MAX_EMAIL_LEN);
    if !form.email.is_empty() && !is_valid_email(&form.email) {
        result.add_error("email", "Enter a valid email address.");
    }

    result
}

/// A deliberately small syntactic check: `local@domain.tld`, no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

// =============================================================================
// Names managed by the admin tool
// =============================================================================

/// Usernames: 1-30 of `[A-Za-z0-9_-]`, so they fit in a URL path segment.
pub fn validate_username(username: &str) -> ValidationResult {
    let mut result = ValidationResult::ok();
    if username.is_empty() {
        result.add_error("username", REQUIRED);
        return result;
    }
    check_length(&mut result, "username", username, MAX_USERNAME_LEN);
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        result.add_error(
            "username",
            "Enter a valid username. Use letters, digits, '_' and '-' only.",
        );
    }
    result
}

/// Tag names: 1-16 characters without commas or surrounding whitespace.
pub fn validate_tag_name(name: &str) -> ValidationResult {
    let mut result = ValidationResult::ok();
    if name.is_empty() {
        result.add_error("name", REQUIRED);
        return result;
    }
    check_length(&mut result, "name", name, MAX_TAG_NAME_LEN);
    if name.contains(',') || name.trim() != name {
        result.add_error("name", "Tag names cannot contain commas or surrounding spaces.");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tags() {
        let tags = parse_tags(" news, music ,,news ");
        assert_eq!(
            tags.into_iter().collect::<Vec<_>>(),
            vec!["music".to_string(), "news".to_string()]
        );
        assert!(parse_tags("").is_empty());
    }

    #[test]
    fn test_message_form_requires_content() {
        let blank = MessageForm {
            content: "   \n".into(),
        };
        let result = validate_message_form(&blank);
        assert!(!result.is_valid);
        assert_eq!(result.field_errors("content"), vec![REQUIRED.to_string()]);

        let ok = MessageForm {
            content: "first!".into(),
        };
        assert!(validate_message_form(&ok).is_valid);
    }

    #[test]
    fn test_profile_form() {
        let ok = ProfileForm {
            first_name: "Alice".into(),
            last_name: "Smith".into(),
            email: "alice@example.org".into(),
        };
        assert!(validate_profile_form(&ok).is_valid);
        assert!(validate_profile_form(&ProfileForm::default()).is_valid);

        let bad = ProfileForm {
            first_name: "x".repeat(31),
            last_name: String::new(),
            email: "not-an-email".into(),
        };
        let result = validate_profile_form(&bad);
        assert!(!result.is_valid);
        assert_eq!(result.field_errors("first_name").len(), 1);
        assert_eq!(
            result.field_errors("email"),
            vec!["Enter a valid email address.".to_string()]
        );
        assert!(result.field_errors("last_name").is_empty());
    }

    #[test]
    fn test_email_syntax() {
        assert!(is_valid_email("foo@example.org"));
        assert!(!is_valid_email("foo@example"));
        assert!(!is_valid_email("foo@@example.org"));
        assert!(!is_valid_email("@example.org"));
        assert!(!is_valid_email("foo bar@example.org"));
    }

    #[test]
    fn test_username_rules() {
        assert!(validate_username("nina_3-x").is_valid);
        assert!(!validate_username("").is_valid);
        assert!(!validate_username("bad name").is_valid);
        assert!(!validate_username(&"a".repeat(31)).is_valid);
    }

    #[test]
    fn test_tag_name_rules() {
        assert!(validate_tag_name("in-pictures").is_valid);
        assert!(!validate_tag_name("a,b").is_valid);
        assert!(!validate_tag_name(" news").is_valid);
        assert!(!validate_tag_name(&"t".repeat(17)).is_valid);
    }

    #[test]
    fn test_topic_fields_limits() {
        let none = BTreeSet::new();
        assert!(validate_topic_fields(&"x".repeat(MAX_TITLE_LEN), &none).is_valid);
        assert!(!validate_topic_fields(&"x".repeat(MAX_TITLE_LEN + 1), &none).is_valid);
        assert_eq!(validate_topic_fields("  ", &none).field_errors("title"), vec![REQUIRED.to_string()]);
        assert!(!validate_topic_fields("!!!", &none).is_valid);

        let mut tags: BTreeSet<String> = (0..MAX_TAGS_PER_TOPIC).map(|i| format!("t{}", i)).collect();
        assert!(validate_topic_fields("Tagged", &tags).is_valid);
        tags.insert("one-more".into());
        let result = validate_topic_fields("Tagged", &tags);
        assert_eq!(result.field_errors("tags").len(), 1);
        assert!(result.field_errors("title").is_empty());
    }
}
