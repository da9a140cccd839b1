//! # Glass
//!
//! A small web forum: tagged topics addressed by slug, Markdown messages,
//! likes, and a short window in which authors may edit or delete what they
//! just wrote.
//!
//! This crate holds the domain model and its RocksDB persistence together
//! with the `glass` administration CLI. The web front end lives in the
//! `glass-web` binary crate.
//!
//! ## Example
//!
//! ```rust,no_run
//! use glass::forum::ForumStorage;
//! use std::collections::BTreeSet;
//! # fn main() -> glass::Result<()> {
//! let storage = ForumStorage::new("glass_data")?;
//! storage.create_user("alice", "secret", "alice@example.org", false)?;
//! storage.create_tag("news")?;
//!
//! let tags: BTreeSet<String> = ["news".to_string()].into_iter().collect();
//! let (topic, _first) = storage.create_topic("Hello World", &tags, "alice", "first!")?;
//! assert_eq!(topic.slug(), "hello-world");
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod error;
pub mod forum;
pub mod storage;

pub use error::{GlassError, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
