//! Permission rules for message edits and deletions.
//!
//! The permission model is:
//! - **Staff**: may edit or delete any message at any time
//! - **Author**: may edit or delete their message while it is the newest one in its topic
//! - **Anyone else**: read only

use crate::forum::{Message, MessageId, User};

/// Can `user` edit or delete `message`?
///
/// `newest_in_topic` is the id of the most recently created message of the
/// message's topic. A topic with a single message makes that message the
/// newest, so its author may still change it.
pub fn editable_by(message: &Message, newest_in_topic: MessageId, user: Option<&User>) -> bool {
    let Some(user) = user else {
        return false;
    };
    if user.is_staff {
        return true;
    }
    let last_in_topic = message.id >= newest_in_topic;
    last_in_topic && message.author == user.username
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str, is_staff: bool) -> User {
        User {
            username: name.to_string(),
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            is_staff,
            password_hash: String::new(),
            date_joined: 0,
        }
    }

    #[test]
    fn test_author_can_edit_newest_only() {
        let alice = user("alice", false);
        let msg = Message::new(3, 1, "alice", "hi");

        assert!(editable_by(&msg, 3, Some(&alice)));
        assert!(!editable_by(&msg, 4, Some(&alice)));
    }

    #[test]
    fn test_other_users_cannot_edit() {
        let bob = user("bob", false);
        let msg = Message::new(3, 1, "alice", "hi");
        assert!(!editable_by(&msg, 3, Some(&bob)));
    }

    #[test]
    fn test_staff_can_always_edit() {
        let admin = user("admin", true);
        let msg = Message::new(3, 1, "alice", "hi");
        assert!(editable_by(&msg, 3, Some(&admin)));
        assert!(editable_by(&msg, 99, Some(&admin)));
    }

    #[test]
    fn test_anonymous_cannot_edit() {
        let msg = Message::new(1, 1, "alice", "hi");
        assert!(!editable_by(&msg, 1, None));
    }
}
