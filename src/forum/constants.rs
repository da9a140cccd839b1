//! Shared constants for forum validation and limits.
//!
//! Used by the library validators, the web front end and the seed tool so
//! every entry point enforces the same bounds.

// =============================================================================
// Field Size Limits (characters)
// =============================================================================

/// Maximum topic title length.
pub const MAX_TITLE_LEN: usize = 128;

/// Maximum tag name length.
pub const MAX_TAG_NAME_LEN: usize = 16;

/// Maximum username length.
pub const MAX_USERNAME_LEN: usize = 30;

/// Maximum first/last name length.
pub const MAX_PERSON_NAME_LEN: usize = 30;

/// Maximum email address length.
pub const MAX_EMAIL_LEN: usize = 254;

/// Maximum message body size (100KB).
pub const MAX_MESSAGE_SIZE: usize = 100 * 1024;

/// Maximum number of tags on one topic.
pub const MAX_TAGS_PER_TOPIC: usize = 10;

// =============================================================================
// Listing
// =============================================================================

/// Topics per page when the request does not say otherwise.
pub const DEFAULT_PAGE_SIZE: usize = 5;

/// Upper bound on the requested page size.
pub const MAX_PAGE_SIZE: usize = 100;

/// Page links shown on each side of the current page.
pub const PAGE_LINK_RADIUS: usize = 4;

/// Messages shown on a user profile.
pub const PROFILE_RECENT_MESSAGES: usize = 5;
