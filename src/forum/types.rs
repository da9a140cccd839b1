//! Forum entity types.
//!
//! This module contains the persisted entities:
//! - `Tag`: a short label attached to topics
//! - `Topic`: a titled discussion, addressed by its slug
//! - `Message`: one post inside a topic, with its set of likers
//! - `User`: an account in the local user directory
//!
//! Users are referenced from messages by username only.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Identifier of a topic. Allocated monotonically.
pub type TopicId = u64;

/// Identifier of a message. Allocated monotonically, so id order is creation order.
pub type MessageId = u64;

/// Returns the current time as milliseconds since the Unix epoch.
pub fn current_timestamp_millis() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

/// Derives the URL slug of a title.
///
/// Deterministic: lowercases, transliterates to ASCII and joins words with
/// single hyphens. `"Hello World"` becomes `"hello-world"`.
pub fn slugify(title: &str) -> String {
    slug::slugify(title)
}

/// A tag. The name is the primary key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
}

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A topic.
///
/// `slug` always equals `slugify(title)`; use [`Topic::set_title`] to keep
/// the two in step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub id: TopicId,
    title: String,
    slug: String,
    pub tags: BTreeSet<String>,
}

impl Topic {
    /// Creates a topic, deriving its slug from the title.
    pub fn new(id: TopicId, title: impl Into<String>, tags: BTreeSet<String>) -> Self {
        let title = title.into();
        let slug = slugify(&title);
        Self {
            id,
            title,
            slug,
            tags,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    /// Replaces the title and recomputes the slug.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.slug = slugify(&self.title);
    }

    /// Tags in display order.
    pub fn tag_list(&self) -> Vec<String> {
        self.tags.iter().cloned().collect()
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.slug)
    }
}

/// A message inside a topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub author: String,
    pub topic: TopicId,
    pub content: String,
    /// Creation time in milliseconds; never changes.
    pub created: u64,
    /// Last save time in milliseconds; `created <= modified`.
    pub modified: u64,
    pub likers: BTreeSet<String>,
}

impl Message {
    /// Creates a fresh message stamped with the current time.
    pub fn new(
        id: MessageId,
        topic: TopicId,
        author: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let now = current_timestamp_millis();
        Self {
            id,
            author: author.into(),
            topic,
            content: content.into(),
            created: now,
            modified: now,
            likers: BTreeSet::new(),
        }
    }

    /// How many people like this message.
    pub fn likes(&self) -> usize {
        self.likers.len()
    }

    pub fn is_liked_by(&self, username: &str) -> bool {
        self.likers.contains(username)
    }

    /// Adds or removes `username` from the likers. Returns true if the user now likes it.
    pub fn toggle_like(&mut self, username: &str) -> bool {
        if self.likers.remove(username) {
            false
        } else {
            self.likers.insert(username.to_string());
            true
        }
    }

    /// Whether the message was saved again after it was created.
    pub fn modified_later(&self) -> bool {
        self.modified > self.created
    }

    /// Bumps the modification time, never moving it before creation.
    pub fn touch(&mut self) {
        self.modified = current_timestamp_millis().max(self.created).max(self.modified);
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} by {}", self.id, self.author)
    }
}

/// An account in the user directory.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// Staff may edit and delete any message.
    pub is_staff: bool,
    /// Argon2id PHC string.
    pub password_hash: String,
    pub date_joined: u64,
}

impl User {
    /// "First Last", or the username when no name is set.
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("username", &self.username)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("email", &self.email)
            .field("is_staff", &self.is_staff)
            .field("password_hash", &"[REDACTED]")
            .field("date_joined", &self.date_joined)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("  Life on Mars?  "), "life-on-mars");
        assert_eq!(slugify("Hello   World!"), slugify("hello world"));
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_topic_slug_follows_title() {
        let mut topic = Topic::new(1, "Hello World", BTreeSet::new());
        assert_eq!(topic.slug(), "hello-world");

        topic.set_title("Red Sails");
        assert_eq!(topic.slug(), "red-sails");
        assert_eq!(topic.to_string(), "red-sails");
    }

    #[test]
    fn test_toggle_like_is_reversible() {
        let mut msg = Message::new(1, 1, "alice", "first!");
        assert_eq!(msg.likes(), 0);

        assert!(msg.toggle_like("bob"));
        assert!(msg.is_liked_by("bob"));
        assert_eq!(msg.likes(), 1);

        assert!(!msg.toggle_like("bob"));
        assert_eq!(msg.likes(), 0);
    }

    #[test]
    fn test_touch_keeps_created_before_modified() {
        let mut msg = Message::new(1, 1, "alice", "first!");
        assert!(!msg.modified_later());
        msg.created -= 1000;
        msg.modified = msg.created;
        msg.touch();
        assert!(msg.created <= msg.modified);
        assert!(msg.modified_later());
    }

    #[test]
    fn test_display_name() {
        let mut user = User {
            username: "nina3".into(),
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            is_staff: false,
            password_hash: "secret".into(),
            date_joined: 0,
        };
        assert_eq!(user.display_name(), "nina3");
        user.first_name = "Nina".into();
        user.last_name = "Smith".into();
        assert_eq!(user.display_name(), "Nina Smith");
        assert!(!format!("{:?}", user).contains("secret"));
    }
}
