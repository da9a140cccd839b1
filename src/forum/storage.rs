//! Forum data persistence using RocksDB.
//!
//! ## Storage Layout
//!
//! Uses column families for logical separation:
//! - `tags`: `{name}` -> Tag
//! - `topics`: `{topic_id}` -> Topic
//! - `messages`: `{message_id}` -> Message
//! - `users`: `{username}` -> User
//! - `meta`: id counters
//!
//! Index column families (values are empty unless noted):
//! - `idx_topic_slugs`: `{slug}` -> topic_id
//! - `idx_topic_messages`: `{topic_id}{message_id}` (creation order within a topic)
//! - `idx_tag_topics`: `{tag}\0{topic_id}`
//! - `idx_author_messages`: `{username}\0{message_id}`
//!
//! Ids are stored big-endian so key order is numeric order.
//!
//! ## Atomicity
//!
//! Every mutation takes the storage write lock, re-checks its preconditions
//! and commits all of its writes as one RocksDB write batch. Creating a topic
//! with its first message, and deleting a topic's last message together with
//! the topic, therefore either fully happen or not at all.

use crate::error::{GlassError, Result};
use crate::forum::listing::{matches_filters, sort_by_likes, TopicSummary};
use crate::forum::password::{hash_password, verify_password};
use crate::forum::permissions::editable_by;
use crate::forum::validation::{
    parse_tags, validate_message_form, validate_profile_form, validate_tag_name,
    validate_topic_fields, validate_username, MessageForm, ProfileForm, ValidationResult,
    TOPIC_EXISTS,
};
use crate::forum::{
    current_timestamp_millis, slugify, Message, MessageId, Tag, Topic, TopicId, User,
};
use crate::storage::{id_from_key_suffix, id_key, prefixed_key, Batch, RocksDbConfig, RocksDbHandle};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Default data directory name.
pub const DEFAULT_DATA_DIR: &str = "glass_data";

/// Database subdirectory.
const DB_DIR: &str = "forum_db";

/// Column family names.
const CF_TAGS: &str = "tags";
const CF_TOPICS: &str = "topics";
const CF_MESSAGES: &str = "messages";
const CF_USERS: &str = "users";
const CF_META: &str = "meta";

/// Index column families.
const CF_IDX_TOPIC_SLUGS: &str = "idx_topic_slugs";
const CF_IDX_TOPIC_MESSAGES: &str = "idx_topic_messages";
const CF_IDX_TAG_TOPICS: &str = "idx_tag_topics";
const CF_IDX_AUTHOR_MESSAGES: &str = "idx_author_messages";

/// Counter keys in the meta column family.
const META_NEXT_TOPIC_ID: &[u8] = b"next_topic_id";
const META_NEXT_MESSAGE_ID: &[u8] = b"next_message_id";

/// Separator between a name and an id in index keys.
const NAME_SEP: u8 = 0;

/// What a message deletion did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOutcome {
    /// The topic the message belonged to.
    pub topic: Topic,
    /// True when the message was the last one and the topic went with it.
    pub topic_deleted: bool,
}

/// Counts of stored entities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForumStats {
    pub users: usize,
    pub tags: usize,
    pub topics: usize,
    pub messages: usize,
}

/// RocksDB-backed forum storage.
#[derive(Debug)]
pub struct ForumStorage {
    db: RocksDbHandle,
    write_lock: Mutex<()>,
}

impl ForumStorage {
    /// Creates a new storage manager with the default data directory.
    pub fn new_default() -> Result<Self> {
        Self::new(DEFAULT_DATA_DIR)
    }

    /// Creates a new storage manager with a custom data directory.
    pub fn new(data_dir: impl AsRef<Path>) -> Result<Self> {
        let db_path = data_dir.as_ref().join(DB_DIR);
        let config = RocksDbConfig::default();
        let column_families = &[
            CF_TAGS,
            CF_TOPICS,
            CF_MESSAGES,
            CF_USERS,
            CF_META,
            CF_IDX_TOPIC_SLUGS,
            CF_IDX_TOPIC_MESSAGES,
            CF_IDX_TAG_TOPICS,
            CF_IDX_AUTHOR_MESSAGES,
        ];

        let db = RocksDbHandle::open(&db_path, &config, column_families)?;
        info!("Opened forum RocksDB at {:?}", db_path);

        Ok(Self {
            db,
            write_lock: Mutex::new(()),
        })
    }

    /// Serializes mutations. A poisoned lock is recovered: batches are atomic,
    /// so a panicking writer cannot have left partial state behind.
    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Reads counter `key` and queues its increment. Ids start at 1.
    fn allocate_id(&self, batch: &mut Batch<'_>, key: &[u8]) -> Result<u64> {
        let id: u64 = self.db.get(CF_META, key)?.unwrap_or(1);
        batch.put(CF_META, key, &(id + 1))?;
        Ok(id)
    }

    // ========================================================================
    // Key helpers
    // ========================================================================

    fn topic_message_key(topic_id: TopicId, message_id: MessageId) -> Vec<u8> {
        let mut key = Vec::with_capacity(16);
        key.extend_from_slice(&id_key(topic_id));
        key.extend_from_slice(&id_key(message_id));
        key
    }

    fn tag_topic_prefix(tag: &str) -> Vec<u8> {
        let mut prefix = tag.as_bytes().to_vec();
        prefix.push(NAME_SEP);
        prefix
    }

    fn tag_topic_key(tag: &str, topic_id: TopicId) -> Vec<u8> {
        prefixed_key(tag.as_bytes(), NAME_SEP, &id_key(topic_id))
    }

    fn author_prefix(username: &str) -> Vec<u8> {
        let mut prefix = username.as_bytes().to_vec();
        prefix.push(NAME_SEP);
        prefix
    }

    fn author_message_key(username: &str, message_id: MessageId) -> Vec<u8> {
        prefixed_key(username.as_bytes(), NAME_SEP, &id_key(message_id))
    }

    fn ids_from_keys(keys: &[Vec<u8>]) -> Vec<u64> {
        keys.iter()
            .filter_map(|key| id_from_key_suffix(key))
            .collect()
    }

    // ========================================================================
    // Tags
    // ========================================================================

    /// Creates a tag. Fails with a validation error if the name is invalid or taken.
    pub fn create_tag(&self, name: &str) -> Result<Tag> {
        let check = validate_tag_name(name);
        if !check.is_valid {
            return Err(validation_error(&check));
        }

        let _guard = self.lock();
        if self.tag_exists(name)? {
            return Err(GlassError::validation(format!(
                "Tag '{}' already exists",
                name
            )));
        }
        let tag = Tag::new(name);
        self.db.put(CF_TAGS, name.as_bytes(), &tag)?;
        info!(tag = name, "Created tag");
        Ok(tag)
    }

    pub fn tag_exists(&self, name: &str) -> Result<bool> {
        self.db.exists(CF_TAGS, name.as_bytes())
    }

    /// All tags, ordered by name.
    pub fn list_tags(&self) -> Result<Vec<Tag>> {
        self.db.prefix_collect(CF_TAGS, &[])
    }

    /// Deletes a tag and removes it from every topic carrying it.
    ///
    /// Returns false if there was no such tag.
    pub fn delete_tag(&self, name: &str) -> Result<bool> {
        let _guard = self.lock();
        if !self.tag_exists(name)? {
            return Ok(false);
        }

        let mut batch = self.db.batch();
        let index_keys = self
            .db
            .prefix_keys(CF_IDX_TAG_TOPICS, &Self::tag_topic_prefix(name))?;
        for topic_id in Self::ids_from_keys(&index_keys) {
            if let Some(mut topic) = self.get_topic(topic_id)? {
                topic.tags.remove(name);
                batch.put(CF_TOPICS, &id_key(topic_id), &topic)?;
            }
        }
        for key in &index_keys {
            batch.delete(CF_IDX_TAG_TOPICS, key)?;
        }
        batch.delete(CF_TAGS, name.as_bytes())?;
        batch.commit()?;

        info!(tag = name, topics = index_keys.len(), "Deleted tag");
        Ok(true)
    }

    // ========================================================================
    // Users
    // ========================================================================

    /// Adds a user to the directory with an Argon2id password hash.
    pub fn create_user(
        &self,
        username: &str,
        password: &str,
        email: &str,
        is_staff: bool,
    ) -> Result<User> {
        let check = validate_username(username);
        if !check.is_valid {
            return Err(validation_error(&check));
        }
        let password_hash = hash_password(password)?;

        let _guard = self.lock();
        if self.user_exists(username)? {
            return Err(GlassError::validation(format!(
                "A user with username '{}' already exists",
                username
            )));
        }
        let user = User {
            username: username.to_string(),
            first_name: String::new(),
            last_name: String::new(),
            email: email.to_string(),
            is_staff,
            password_hash,
            date_joined: current_timestamp_millis(),
        };
        self.db.put(CF_USERS, username.as_bytes(), &user)?;
        info!(username = username, is_staff = is_staff, "Created user");
        Ok(user)
    }

    pub fn get_user(&self, username: &str) -> Result<Option<User>> {
        self.db.get(CF_USERS, username.as_bytes())
    }

    pub fn user_exists(&self, username: &str) -> Result<bool> {
        self.db.exists(CF_USERS, username.as_bytes())
    }

    /// All users, ordered by username.
    pub fn list_users(&self) -> Result<Vec<User>> {
        self.db.prefix_collect(CF_USERS, &[])
    }

    /// Returns the user if `password` matches, `None` otherwise (unknown user included).
    pub fn authenticate(&self, username: &str, password: &str) -> Result<Option<User>> {
        let Some(user) = self.get_user(username)? else {
            debug!(username = username, "Login for unknown user");
            return Ok(None);
        };
        if verify_password(password, &user.password_hash)? {
            Ok(Some(user))
        } else {
            debug!(username = username, "Login with wrong password");
            Ok(None)
        }
    }

    /// Applies a validated profile update to `username`.
    pub fn update_profile(&self, username: &str, form: &ProfileForm) -> Result<User> {
        let check = validate_profile_form(form);
        if !check.is_valid {
            return Err(validation_error(&check));
        }
        let form = form.trimmed();

        let _guard = self.lock();
        let mut user = self
            .get_user(username)?
            .ok_or_else(|| GlassError::not_found(format!("user '{}'", username)))?;
        user.first_name = form.first_name;
        user.last_name = form.last_name;
        user.email = form.email;
        self.db.put(CF_USERS, username.as_bytes(), &user)?;
        info!(username = username, "Updated profile");
        Ok(user)
    }

    /// Grants or revokes the staff role.
    pub fn set_staff(&self, username: &str, is_staff: bool) -> Result<User> {
        let _guard = self.lock();
        let mut user = self
            .get_user(username)?
            .ok_or_else(|| GlassError::not_found(format!("user '{}'", username)))?;
        user.is_staff = is_staff;
        self.db.put(CF_USERS, username.as_bytes(), &user)?;
        info!(username = username, is_staff = is_staff, "Changed staff flag");
        Ok(user)
    }

    // ========================================================================
    // Topics
    // ========================================================================

    pub fn get_topic(&self, topic_id: TopicId) -> Result<Option<Topic>> {
        self.db.get(CF_TOPICS, &id_key(topic_id))
    }

    pub fn get_topic_by_slug(&self, slug: &str) -> Result<Option<Topic>> {
        match self.db.get::<TopicId>(CF_IDX_TOPIC_SLUGS, slug.as_bytes())? {
            Some(topic_id) => self.get_topic(topic_id),
            None => Ok(None),
        }
    }

    pub fn slug_exists(&self, slug: &str) -> Result<bool> {
        self.db.exists(CF_IDX_TOPIC_SLUGS, slug.as_bytes())
    }

    /// All topics, oldest first.
    pub fn list_topics(&self) -> Result<Vec<Topic>> {
        self.db.prefix_collect(CF_TOPICS, &[])
    }

    /// Topics carrying `tag`, oldest first.
    pub fn topics_with_tag(&self, tag: &str) -> Result<Vec<Topic>> {
        let keys = self
            .db
            .prefix_keys(CF_IDX_TAG_TOPICS, &Self::tag_topic_prefix(tag))?;
        let mut topics = Vec::new();
        for topic_id in Self::ids_from_keys(&keys) {
            if let Some(topic) = self.get_topic(topic_id)? {
                topics.push(topic);
            }
        }
        Ok(topics)
    }

    /// Creates a topic together with its initial message, atomically.
    ///
    /// The title's slug must not name an existing topic, every tag must exist
    /// and the author must be a known user. Fails with a validation error
    /// otherwise and stores nothing.
    pub fn create_topic(
        &self,
        title: &str,
        tags: &BTreeSet<String>,
        author: &str,
        content: &str,
    ) -> Result<(Topic, Message)> {
        let content_check = validate_message_form(&MessageForm {
            content: content.to_string(),
        });
        if !content_check.is_valid {
            return Err(validation_error(&content_check));
        }
        let topic_check = validate_topic_fields(title, tags);
        if !topic_check.is_valid {
            return Err(validation_error(&topic_check));
        }
        let title = title.trim();
        let slug = slugify(title);

        let _guard = self.lock();
        if self.slug_exists(&slug)? {
            return Err(GlassError::validation(TOPIC_EXISTS));
        }
        for tag in tags {
            if !self.tag_exists(tag)? {
                return Err(GlassError::validation(format!("Unknown tag '{}'", tag)));
            }
        }
        self.require_user(author)?;

        let mut batch = self.db.batch();
        let topic_id = self.allocate_id(&mut batch, META_NEXT_TOPIC_ID)?;
        let message_id = self.allocate_id(&mut batch, META_NEXT_MESSAGE_ID)?;

        let topic = Topic::new(topic_id, title, tags.clone());
        let message = Message::new(message_id, topic_id, author, content);

        self.queue_topic(&mut batch, &topic)?;
        self.queue_new_message(&mut batch, &message)?;
        batch.commit()?;

        info!(
            topic_id = topic_id,
            slug = topic.slug(),
            author = author,
            "Created topic"
        );
        Ok((topic, message))
    }

    fn queue_topic(&self, batch: &mut Batch<'_>, topic: &Topic) -> Result<()> {
        batch.put(CF_TOPICS, &id_key(topic.id), topic)?;
        batch.put(CF_IDX_TOPIC_SLUGS, topic.slug().as_bytes(), &topic.id)?;
        for tag in &topic.tags {
            batch.put_raw(CF_IDX_TAG_TOPICS, &Self::tag_topic_key(tag, topic.id), &[])?;
        }
        Ok(())
    }

    fn queue_topic_removal(&self, batch: &mut Batch<'_>, topic: &Topic) -> Result<()> {
        batch.delete(CF_TOPICS, &id_key(topic.id))?;
        batch.delete(CF_IDX_TOPIC_SLUGS, topic.slug().as_bytes())?;
        for tag in &topic.tags {
            batch.delete(CF_IDX_TAG_TOPICS, &Self::tag_topic_key(tag, topic.id))?;
        }
        Ok(())
    }

    fn require_user(&self, username: &str) -> Result<()> {
        if self.user_exists(username)? {
            Ok(())
        } else {
            Err(GlassError::not_found(format!("user '{}'", username)))
        }
    }

    // ========================================================================
    // Messages
    // ========================================================================

    pub fn get_message(&self, message_id: MessageId) -> Result<Option<Message>> {
        self.db.get(CF_MESSAGES, &id_key(message_id))
    }

    /// Ids of the messages in a topic, oldest first.
    pub fn topic_message_ids(&self, topic_id: TopicId) -> Result<Vec<MessageId>> {
        let keys = self
            .db
            .prefix_keys(CF_IDX_TOPIC_MESSAGES, &id_key(topic_id))?;
        Ok(Self::ids_from_keys(&keys))
    }

    /// All messages in a topic, oldest first.
    pub fn topic_messages(&self, topic_id: TopicId) -> Result<Vec<Message>> {
        let mut messages = Vec::new();
        for message_id in self.topic_message_ids(topic_id)? {
            match self.get_message(message_id)? {
                Some(message) => messages.push(message),
                None => warn!(
                    topic_id = topic_id,
                    message_id = message_id,
                    "Index points at a missing message"
                ),
            }
        }
        Ok(messages)
    }

    /// The earliest message of a topic.
    pub fn initial_message(&self, topic_id: TopicId) -> Result<Option<Message>> {
        let mut first = None;
        self.db
            .prefix_iterate(CF_IDX_TOPIC_MESSAGES, &id_key(topic_id), |key, _| {
                first = id_from_key_suffix(key);
                false
            })?;
        match first {
            Some(message_id) => self.get_message(message_id),
            None => Ok(None),
        }
    }

    /// Id of the most recently created message of a topic.
    pub fn newest_message_id(&self, topic_id: TopicId) -> Result<Option<MessageId>> {
        let mut newest = None;
        self.db
            .prefix_iterate_rev(CF_IDX_TOPIC_MESSAGES, &id_key(topic_id), |key, _| {
                newest = id_from_key_suffix(key);
                false
            })?;
        Ok(newest)
    }

    /// Applies the edit/delete rule to `message` for `user`.
    pub fn message_editable_by(&self, message: &Message, user: Option<&User>) -> Result<bool> {
        let newest = self.newest_message_id(message.topic)?.unwrap_or(message.id);
        Ok(editable_by(message, newest, user))
    }

    /// The `limit` most recent messages written by `username`, newest first.
    pub fn latest_messages_by(&self, username: &str, limit: usize) -> Result<Vec<Message>> {
        let mut ids = Vec::with_capacity(limit);
        if limit > 0 {
            self.db.prefix_iterate_rev(
                CF_IDX_AUTHOR_MESSAGES,
                &Self::author_prefix(username),
                |key, _| {
                    if let Some(id) = id_from_key_suffix(key) {
                        ids.push(id);
                    }
                    ids.len() < limit
                },
            )?;
        }
        let mut messages = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(message) = self.get_message(id)? {
                messages.push(message);
            }
        }
        Ok(messages)
    }

    /// Appends a message to an existing topic.
    pub fn post_message(&self, topic_id: TopicId, author: &str, content: &str) -> Result<Message> {
        let check = validate_message_form(&MessageForm {
            content: content.to_string(),
        });
        if !check.is_valid {
            return Err(validation_error(&check));
        }

        let _guard = self.lock();
        if self.get_topic(topic_id)?.is_none() {
            return Err(GlassError::not_found(format!("topic {}", topic_id)));
        }
        self.require_user(author)?;

        let mut batch = self.db.batch();
        let message_id = self.allocate_id(&mut batch, META_NEXT_MESSAGE_ID)?;
        let message = Message::new(message_id, topic_id, author, content);
        self.queue_new_message(&mut batch, &message)?;
        batch.commit()?;

        debug!(
            topic_id = topic_id,
            message_id = message_id,
            author = author,
            "Posted message"
        );
        Ok(message)
    }

    fn queue_new_message(&self, batch: &mut Batch<'_>, message: &Message) -> Result<()> {
        batch.put(CF_MESSAGES, &id_key(message.id), message)?;
        batch.put_raw(
            CF_IDX_TOPIC_MESSAGES,
            &Self::topic_message_key(message.topic, message.id),
            &[],
        )?;
        batch.put_raw(
            CF_IDX_AUTHOR_MESSAGES,
            &Self::author_message_key(&message.author, message.id),
            &[],
        )?;
        Ok(())
    }

    /// Adds `username` to the message's likers, or removes them if already
    /// present. Returns the new like count.
    pub fn toggle_like(&self, message_id: MessageId, username: &str) -> Result<usize> {
        let _guard = self.lock();
        let mut message = self
            .get_message(message_id)?
            .ok_or_else(|| GlassError::not_found(format!("message {}", message_id)))?;
        self.require_user(username)?;

        let liked = message.toggle_like(username);
        self.db.put(CF_MESSAGES, &id_key(message_id), &message)?;

        debug!(
            message_id = message_id,
            username = username,
            liked = liked,
            likes = message.likes(),
            "Toggled like"
        );
        Ok(message.likes())
    }

    /// Replaces the content of a message if `user` may edit it.
    pub fn edit_message(&self, message_id: MessageId, user: &User, content: &str) -> Result<Message> {
        let check = validate_message_form(&MessageForm {
            content: content.to_string(),
        });
        if !check.is_valid {
            return Err(validation_error(&check));
        }

        let _guard = self.lock();
        let mut message = self
            .get_message(message_id)?
            .ok_or_else(|| GlassError::not_found(format!("message {}", message_id)))?;
        if !self.message_editable_by(&message, Some(user))? {
            return Err(GlassError::permission_denied(format!(
                "{} may not edit message {}",
                user.username, message_id
            )));
        }

        message.content = content.to_string();
        message.touch();
        self.db.put(CF_MESSAGES, &id_key(message_id), &message)?;

        info!(message_id = message_id, editor = %user.username, "Edited message");
        Ok(message)
    }

    /// Deletes a message if `user` may delete it. When it was the last
    /// message of its topic the topic is deleted in the same write.
    pub fn delete_message(&self, message_id: MessageId, user: &User) -> Result<DeleteOutcome> {
        let _guard = self.lock();
        let message = self
            .get_message(message_id)?
            .ok_or_else(|| GlassError::not_found(format!("message {}", message_id)))?;
        if !self.message_editable_by(&message, Some(user))? {
            return Err(GlassError::permission_denied(format!(
                "{} may not delete message {}",
                user.username, message_id
            )));
        }
        let topic = self
            .get_topic(message.topic)?
            .ok_or_else(|| GlassError::not_found(format!("topic {}", message.topic)))?;

        let mut batch = self.db.batch();
        batch.delete(CF_MESSAGES, &id_key(message_id))?;
        batch.delete(
            CF_IDX_TOPIC_MESSAGES,
            &Self::topic_message_key(message.topic, message_id),
        )?;
        batch.delete(
            CF_IDX_AUTHOR_MESSAGES,
            &Self::author_message_key(&message.author, message_id),
        )?;

        let remaining = self
            .topic_message_ids(topic.id)?
            .into_iter()
            .filter(|&id| id != message_id)
            .count();
        let topic_deleted = remaining == 0;
        if topic_deleted {
            self.queue_topic_removal(&mut batch, &topic)?;
        }
        batch.commit()?;

        info!(
            message_id = message_id,
            topic = topic.slug(),
            topic_deleted = topic_deleted,
            by = %user.username,
            "Deleted message"
        );
        Ok(DeleteOutcome {
            topic,
            topic_deleted,
        })
    }

    // ========================================================================
    // Listing
    // ========================================================================

    /// Topics matching the filters, most liked initial message first.
    ///
    /// Topics without any message are skipped.
    pub fn topic_summaries(
        &self,
        tag: Option<&str>,
        search: Option<&str>,
    ) -> Result<Vec<TopicSummary>> {
        let candidates = match tag {
            Some(tag) => self.topics_with_tag(tag)?,
            None => self.list_topics()?,
        };

        let mut summaries = Vec::with_capacity(candidates.len());
        for topic in candidates {
            if !matches_filters(&topic, tag, search) {
                continue;
            }
            let ids = self.topic_message_ids(topic.id)?;
            let initial = match ids.first() {
                Some(&id) => self.get_message(id)?,
                None => None,
            };
            let Some(initial_message) = initial else {
                warn!(topic = topic.slug(), "Topic has no messages, skipping");
                continue;
            };
            summaries.push(TopicSummary {
                topic,
                initial_message,
                message_count: ids.len(),
            });
        }

        sort_by_likes(&mut summaries);
        Ok(summaries)
    }

    /// Counts of every entity kind.
    pub fn stats(&self) -> Result<ForumStats> {
        let mut stats = ForumStats::default();
        for (cf, slot) in [
            (CF_USERS, &mut stats.users),
            (CF_TAGS, &mut stats.tags),
            (CF_TOPICS, &mut stats.topics),
            (CF_MESSAGES, &mut stats.messages),
        ] {
            self.db.prefix_iterate(cf, &[], |_, _| {
                *slot += 1;
                true
            })?;
        }
        Ok(stats)
    }

    /// Parses a comma-separated tag list and keeps only known tags.
    pub fn known_tags(&self, raw: &str) -> Result<BTreeSet<String>> {
        let mut known = BTreeSet::new();
        for tag in parse_tags(raw) {
            if self.tag_exists(&tag)? {
                known.insert(tag);
            }
        }
        Ok(known)
    }
}

/// Folds per-field errors into one validation error.
fn validation_error(result: &ValidationResult) -> GlassError {
    let detail = result
        .errors()
        .iter()
        .map(|(field, errors)| format!("{}: {}", field, errors.join(" ")))
        .collect::<Vec<_>>()
        .join("; ");
    GlassError::validation(detail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forum::constants::{MAX_TAGS_PER_TOPIC, MAX_TITLE_LEN};
    use tempfile::TempDir;

    fn create_test_storage() -> (ForumStorage, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let storage = ForumStorage::new(temp_dir.path().join("forum_data"))
            .expect("Failed to create storage");
        (storage, temp_dir)
    }

    fn with_users(storage: &ForumStorage, names: &[&str]) {
        for name in names {
            storage.create_user(name, "pw", "", false).unwrap();
        }
    }

    #[test]
    fn test_storage_creation() {
        let (storage, _temp_dir) = create_test_storage();
        assert_eq!(storage.stats().unwrap(), ForumStats::default());
    }

    #[test]
    fn test_create_topic_with_initial_message() {
        let (storage, _temp_dir) = create_test_storage();
        with_users(&storage, &["alice"]);
        storage.create_tag("news").unwrap();

        let tags: BTreeSet<String> = ["news".to_string()].into_iter().collect();
        let (topic, message) = storage
            .create_topic("Hello World", &tags, "alice", "first!")
            .unwrap();

        assert_eq!(topic.slug(), "hello-world");
        assert_eq!(message.topic, topic.id);
        assert_eq!(
            storage.get_topic_by_slug("hello-world").unwrap(),
            Some(topic.clone())
        );
        assert_eq!(storage.initial_message(topic.id).unwrap(), Some(message));
        assert_eq!(storage.topics_with_tag("news").unwrap(), vec![topic]);
    }

    #[test]
    fn test_duplicate_slug_is_rejected() {
        let (storage, _temp_dir) = create_test_storage();
        with_users(&storage, &["alice"]);
        let none = BTreeSet::new();

        storage
            .create_topic("Hello World", &none, "alice", "first!")
            .unwrap();
        let err = storage
            .create_topic("hello   world!", &none, "alice", "again")
            .unwrap_err();
        assert!(matches!(err, GlassError::Validation(_)));
        assert_eq!(storage.stats().unwrap().topics, 1);
        assert_eq!(storage.stats().unwrap().messages, 1);
    }

    #[test]
    fn test_failed_topic_creation_stores_nothing() {
        let (storage, _temp_dir) = create_test_storage();
        with_users(&storage, &["alice"]);
        let tags: BTreeSet<String> = ["missing".to_string()].into_iter().collect();

        assert!(storage.create_topic("T", &tags, "alice", "x").is_err());
        assert!(storage
            .create_topic("T", &BTreeSet::new(), "nobody", "x")
            .is_err());
        assert!(storage
            .create_topic("T", &BTreeSet::new(), "alice", "  ")
            .is_err());
        assert!(!storage.slug_exists("t").unwrap());
        assert_eq!(storage.stats().unwrap().messages, 0);
    }

    #[test]
    fn test_topic_title_and_tag_limits() {
        let (storage, _temp_dir) = create_test_storage();
        with_users(&storage, &["alice"]);

        let long_title = "x".repeat(MAX_TITLE_LEN + 1);
        assert!(matches!(
            storage.create_topic(&long_title, &BTreeSet::new(), "alice", "body"),
            Err(GlassError::Validation(_))
        ));

        let mut tags = BTreeSet::new();
        for i in 0..=MAX_TAGS_PER_TOPIC {
            let name = format!("tag{}", i);
            storage.create_tag(&name).unwrap();
            tags.insert(name);
        }
        assert!(matches!(
            storage.create_topic("Tagged", &tags, "alice", "body"),
            Err(GlassError::Validation(_))
        ));
        assert_eq!(storage.stats().unwrap().topics, 0);

        let exact_title = "y".repeat(MAX_TITLE_LEN);
        tags.pop_last();
        storage
            .create_topic(&exact_title, &tags, "alice", "body")
            .unwrap();
        assert_eq!(storage.stats().unwrap().topics, 1);
    }

    #[test]
    fn test_messages_are_ordered_and_newest_is_tracked() {
        let (storage, _temp_dir) = create_test_storage();
        with_users(&storage, &["alice", "bob"]);
        let (topic, m1) = storage
            .create_topic("Order", &BTreeSet::new(), "alice", "one")
            .unwrap();
        let m2 = storage.post_message(topic.id, "bob", "two").unwrap();
        let m3 = storage.post_message(topic.id, "alice", "three").unwrap();

        let ids: Vec<u64> = storage
            .topic_messages(topic.id)
            .unwrap()
            .iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec![m1.id, m2.id, m3.id]);
        assert_eq!(storage.newest_message_id(topic.id).unwrap(), Some(m3.id));
        assert_eq!(storage.initial_message(topic.id).unwrap().unwrap().id, m1.id);
    }

    #[test]
    fn test_post_to_missing_topic() {
        let (storage, _temp_dir) = create_test_storage();
        with_users(&storage, &["alice"]);
        assert!(storage.post_message(42, "alice", "hi").unwrap_err().is_not_found());
    }

    #[test]
    fn test_latest_messages_by_author() {
        let (storage, _temp_dir) = create_test_storage();
        with_users(&storage, &["alice", "bob"]);
        let (topic, _) = storage
            .create_topic("Chat", &BTreeSet::new(), "alice", "m0")
            .unwrap();
        for i in 1..8 {
            storage
                .post_message(topic.id, "alice", &format!("m{}", i))
                .unwrap();
        }
        storage.post_message(topic.id, "bob", "bob's").unwrap();

        let latest: Vec<String> = storage
            .latest_messages_by("alice", 5)
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(latest, vec!["m7", "m6", "m5", "m4", "m3"]);
        assert!(storage.latest_messages_by("carol", 5).unwrap().is_empty());
    }

    #[test]
    fn test_delete_tag_detaches_topics() {
        let (storage, _temp_dir) = create_test_storage();
        with_users(&storage, &["alice"]);
        storage.create_tag("news").unwrap();
        let tags: BTreeSet<String> = ["news".to_string()].into_iter().collect();
        let (topic, _) = storage.create_topic("T", &tags, "alice", "x").unwrap();

        assert!(storage.delete_tag("news").unwrap());
        assert!(!storage.delete_tag("news").unwrap());
        assert!(storage.get_topic(topic.id).unwrap().unwrap().tags.is_empty());
        assert!(storage.topics_with_tag("news").unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_user_and_tag() {
        let (storage, _temp_dir) = create_test_storage();
        with_users(&storage, &["alice"]);
        assert!(storage.create_user("alice", "pw", "", false).is_err());
        storage.create_tag("news").unwrap();
        assert!(storage.create_tag("news").is_err());
    }

    #[test]
    fn test_authenticate() {
        let (storage, _temp_dir) = create_test_storage();
        with_users(&storage, &["alice"]);
        assert!(storage.authenticate("alice", "pw").unwrap().is_some());
        assert!(storage.authenticate("alice", "nope").unwrap().is_none());
        assert!(storage.authenticate("nobody", "pw").unwrap().is_none());
    }

    #[test]
    fn test_update_profile() {
        let (storage, _temp_dir) = create_test_storage();
        with_users(&storage, &["alice"]);
        let form = ProfileForm {
            first_name: " Alice ".into(),
            last_name: "Smith".into(),
            email: "alice@example.org".into(),
        };
        let user = storage.update_profile("alice", &form).unwrap();
        assert_eq!(user.first_name, "Alice");
        assert_eq!(storage.get_user("alice").unwrap().unwrap(), user);

        let bad = ProfileForm {
            email: "nope".into(),
            ..Default::default()
        };
        assert!(storage.update_profile("alice", &bad).is_err());
        assert_eq!(storage.get_user("alice").unwrap().unwrap().email, "alice@example.org");
    }

    #[test]
    fn test_reopen_keeps_counters() {
        let temp_dir = TempDir::new().unwrap();
        let first_id = {
            let storage = ForumStorage::new(temp_dir.path()).unwrap();
            with_users(&storage, &["alice"]);
            let (_, m) = storage
                .create_topic("Persist", &BTreeSet::new(), "alice", "x")
                .unwrap();
            m.id
        };
        let storage = ForumStorage::new(temp_dir.path()).unwrap();
        let (_, m) = storage
            .create_topic("Persist again", &BTreeSet::new(), "alice", "y")
            .unwrap();
        assert!(m.id > first_id);
    }
}
