//! End-to-end tests for the forum storage layer.
//!
//! These tests walk through complete workflows the way the web handlers
//! drive them: users create topics, reply, like, edit and delete, and the
//! index listing reflects the result.

use glass::forum::{editable_by, paginate, ForumStorage, Message, Topic, User};
use std::collections::BTreeSet;
use tempfile::TempDir;

/// Helper to create a fresh storage in a temporary directory.
fn create_storage() -> (ForumStorage, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let storage = ForumStorage::new(temp_dir.path()).expect("Failed to open storage");
    (storage, temp_dir)
}

fn create_user(storage: &ForumStorage, username: &str, is_staff: bool) -> User {
    storage
        .create_user(username, "secret", "", is_staff)
        .expect("Failed to create user")
}

fn create_topic(storage: &ForumStorage, title: &str, author: &str, content: &str) -> (Topic, Message) {
    storage
        .create_topic(title, &BTreeSet::new(), author, content)
        .expect("Failed to create topic")
}

// =============================================================================
// Topic Workflow Tests
// =============================================================================

/// Topic creation, replies and the edit rule as messages accumulate.
#[test]
fn test_topic_lifecycle() {
    let (storage, _temp_dir) = create_storage();
    let alice = create_user(&storage, "alice", false);
    let bob = create_user(&storage, "bob", false);

    let (topic, first) = create_topic(&storage, "Hello World", "alice", "first!");
    assert_eq!(topic.slug(), "hello-world");
    assert_eq!(
        storage.get_topic_by_slug("hello-world").unwrap().unwrap().id,
        topic.id
    );

    // Sole message: editable by its author only
    assert!(storage.message_editable_by(&first, Some(&alice)).unwrap());
    assert!(!storage.message_editable_by(&first, Some(&bob)).unwrap());
    assert!(!storage.message_editable_by(&first, None).unwrap());

    // A reply takes the "newest" spot away from the first message
    let reply = storage.post_message(topic.id, "bob", "second").unwrap();
    assert!(!storage.message_editable_by(&first, Some(&alice)).unwrap());
    assert!(storage.message_editable_by(&reply, Some(&bob)).unwrap());

    let messages = storage.topic_messages(topic.id).unwrap();
    let ids: Vec<_> = messages.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![first.id, reply.id]);
    assert!(messages.iter().all(|m| m.created <= m.modified));

    assert!(storage.edit_message(first.id, &alice, "changed").is_err());
    let edited = storage.edit_message(reply.id, &bob, "second, edited").unwrap();
    assert_eq!(edited.content, "second, edited");
    assert!(edited.modified >= edited.created);
}

/// Titles that slugify alike cannot both exist.
#[test]
fn test_similar_titles_collide() {
    let (storage, _temp_dir) = create_storage();
    create_user(&storage, "alice", false);

    create_topic(&storage, "Hello World", "alice", "first!");
    let err = storage
        .create_topic("hello, world!", &BTreeSet::new(), "alice", "again")
        .unwrap_err();
    assert!(matches!(err, glass::GlassError::Validation(_)));
    assert_eq!(storage.list_topics().unwrap().len(), 1);
    assert_eq!(storage.stats().unwrap().messages, 1);
}

/// A topic and its first message are created together or not at all.
#[test]
fn test_invalid_first_message_creates_nothing() {
    let (storage, _temp_dir) = create_storage();
    create_user(&storage, "alice", false);

    assert!(storage
        .create_topic("Empty", &BTreeSet::new(), "alice", "   ")
        .is_err());
    assert!(!storage.slug_exists("empty").unwrap());
    assert_eq!(storage.stats().unwrap().topics, 0);
}

// =============================================================================
// Deletion Tests
// =============================================================================

#[test]
fn test_deleting_sole_message_removes_topic() {
    let (storage, _temp_dir) = create_storage();
    let alice = create_user(&storage, "alice", false);

    let (topic, first) = create_topic(&storage, "Hello World", "alice", "first!");
    let outcome = storage.delete_message(first.id, &alice).unwrap();
    assert!(outcome.topic_deleted);
    assert!(storage.get_topic(topic.id).unwrap().is_none());
    assert!(!storage.slug_exists("hello-world").unwrap());

    // The slug is free again
    create_topic(&storage, "Hello World", "alice", "back");
}

#[test]
fn test_deleting_newest_reply_keeps_topic() {
    let (storage, _temp_dir) = create_storage();
    create_user(&storage, "alice", false);
    let bob = create_user(&storage, "bob", false);

    let (topic, first) = create_topic(&storage, "Hello World", "alice", "first!");
    let reply = storage.post_message(topic.id, "bob", "second").unwrap();

    let outcome = storage.delete_message(reply.id, &bob).unwrap();
    assert!(!outcome.topic_deleted);
    assert_eq!(storage.topic_message_ids(topic.id).unwrap(), vec![first.id]);
    assert!(storage.latest_messages_by("bob", 5).unwrap().is_empty());
}

#[test]
fn test_staff_may_delete_anything() {
    let (storage, _temp_dir) = create_storage();
    create_user(&storage, "alice", false);
    let bob = create_user(&storage, "bob", false);
    let admin = create_user(&storage, "admin", true);

    let (topic, first) = create_topic(&storage, "Hello World", "alice", "first!");
    storage.post_message(topic.id, "bob", "second").unwrap();

    assert!(storage.delete_message(first.id, &bob).is_err());
    let outcome = storage.delete_message(first.id, &admin).unwrap();
    assert!(!outcome.topic_deleted);
    assert_eq!(storage.topic_messages(topic.id).unwrap().len(), 1);
}

// =============================================================================
// Like and Listing Tests
// =============================================================================

#[test]
fn test_like_counts_follow_toggles() {
    let (storage, _temp_dir) = create_storage();
    create_user(&storage, "alice", false);
    create_user(&storage, "bob", false);

    let (_, message) = create_topic(&storage, "Hello World", "alice", "first!");
    assert_eq!(storage.toggle_like(message.id, "alice").unwrap(), 1);
    assert_eq!(storage.toggle_like(message.id, "bob").unwrap(), 2);
    assert_eq!(storage.toggle_like(message.id, "alice").unwrap(), 1);

    let stored = storage.get_message(message.id).unwrap().unwrap();
    assert!(stored.is_liked_by("bob"));
    assert!(!stored.is_liked_by("alice"));
}

/// Listing order follows the initial message's likes, not the replies'.
#[test]
fn test_listing_orders_by_initial_message_likes() {
    let (storage, _temp_dir) = create_storage();
    for name in ["alice", "bob", "carol"] {
        create_user(&storage, name, false);
    }

    let (t1, m1) = create_topic(&storage, "First topic", "alice", "one");
    let (t2, m2) = create_topic(&storage, "Second topic", "alice", "two");

    storage.toggle_like(m1.id, "bob").unwrap();
    for name in ["alice", "bob", "carol"] {
        storage.toggle_like(m2.id, name).unwrap();
    }
    // Likes on replies do not count towards the topic
    let reply = storage.post_message(t1.id, "bob", "reply").unwrap();
    for name in ["alice", "bob", "carol"] {
        storage.toggle_like(reply.id, name).unwrap();
    }

    let order: Vec<_> = storage
        .topic_summaries(None, None)
        .unwrap()
        .into_iter()
        .map(|s| s.topic.id)
        .collect();
    assert_eq!(order, vec![t2.id, t1.id]);
}

#[test]
fn test_listing_filters_and_pages() {
    let (storage, _temp_dir) = create_storage();
    create_user(&storage, "alice", false);
    storage.create_tag("news").unwrap();
    let news: BTreeSet<String> = ["news".to_string()].into_iter().collect();

    for i in 0..7 {
        let tags = if i % 2 == 0 { news.clone() } else { BTreeSet::new() };
        storage
            .create_topic(&format!("Topic number {}", i), &tags, "alice", "body")
            .unwrap();
    }

    assert_eq!(storage.topic_summaries(Some("news"), None).unwrap().len(), 4);
    assert_eq!(
        storage
            .topic_summaries(None, Some("number 3"))
            .unwrap()
            .len(),
        1
    );
    // Case-sensitive title search
    assert!(storage
        .topic_summaries(None, Some("TOPIC"))
        .unwrap()
        .is_empty());

    let all = storage.topic_summaries(None, None).unwrap();
    let page = paginate(all, Some("2"), 5).unwrap();
    assert_eq!(page.number, 2);
    assert_eq!(page.object_list.len(), 2);
    assert_eq!(page.num_pages, 2);
}

#[test]
fn test_removing_tag_detaches_topics() {
    let (storage, _temp_dir) = create_storage();
    create_user(&storage, "alice", false);
    storage.create_tag("news").unwrap();
    let news: BTreeSet<String> = ["news".to_string()].into_iter().collect();

    let (topic, _) = storage
        .create_topic("Tagged", &news, "alice", "body")
        .unwrap();
    assert!(storage.delete_tag("news").unwrap());

    let topic = storage.get_topic(topic.id).unwrap().unwrap();
    assert!(topic.tags.is_empty());
    assert!(storage.topic_summaries(Some("news"), None).unwrap().is_empty());
}

// =============================================================================
// Profile Tests
// =============================================================================

#[test]
fn test_profile_shows_five_latest_messages() {
    let (storage, _temp_dir) = create_storage();
    create_user(&storage, "alice", false);

    let (topic, _) = create_topic(&storage, "Chatter", "alice", "m0");
    let mut ids = Vec::new();
    for i in 1..=6 {
        ids.push(storage.post_message(topic.id, "alice", &format!("m{}", i)).unwrap().id);
    }

    let latest: Vec<_> = storage
        .latest_messages_by("alice", 5)
        .unwrap()
        .into_iter()
        .map(|m| m.id)
        .collect();
    ids.reverse();
    assert_eq!(latest, ids[..5].to_vec());
}

#[test]
fn test_editable_by_agrees_with_storage() {
    let (storage, _temp_dir) = create_storage();
    let alice = create_user(&storage, "alice", false);

    let (topic, first) = create_topic(&storage, "Hello World", "alice", "first!");
    let second = storage.post_message(topic.id, "alice", "again").unwrap();
    let newest = storage.newest_message_id(topic.id).unwrap().unwrap();

    assert_eq!(newest, second.id);
    assert!(!editable_by(&first, newest, Some(&alice)));
    assert!(editable_by(&second, newest, Some(&alice)));
}
