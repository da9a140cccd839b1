//! The Glass forum.
//!
//! ## Model
//!
//! ```text
//! Tag ──< Topic >── Message ──> User (author)
//!                      └──< likers (User)
//! ```
//!
//! A topic is addressed by the slug of its title and always owns at least
//! one message: the initial message is created together with the topic and
//! deleting the last message deletes the topic. Topic popularity is the like
//! count of its initial message.

pub mod constants;
pub mod listing;
pub mod markup;
pub mod password;
pub mod permissions;
pub mod storage;
pub mod types;
pub mod validation;

pub use listing::{paginate, Page, TopicQuery, TopicSummary};
pub use markup::render_markdown;
pub use permissions::editable_by;
pub use storage::{DeleteOutcome, ForumStats, ForumStorage};
pub use types::{current_timestamp_millis, slugify, Message, MessageId, Tag, Topic, TopicId, User};
pub use validation::{MessageForm, ProfileForm, TopicForm, ValidationResult};
