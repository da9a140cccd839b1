//! Topic listing: query parsing, popularity ordering and pagination.
//!
//! The index page fetches every candidate topic, orders them by the like
//! count of their initial message and then cuts out one page. Ordering
//! happens in memory, which is fine for forums with a few hundred topics.

use crate::forum::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, PAGE_LINK_RADIUS};
use crate::forum::{Message, Topic};
use serde::Deserialize;

/// Raw query string of the index page. Every field is optional and parsed leniently.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TopicQuery {
    pub page_size: Option<String>,
    pub page: Option<String>,
    pub tag: Option<String>,
    pub search: Option<String>,
}

impl TopicQuery {
    /// Page size: a positive integer, else [`DEFAULT_PAGE_SIZE`]; capped at [`MAX_PAGE_SIZE`].
    pub fn page_size(&self) -> usize {
        self.page_size
            .as_deref()
            .and_then(|s| s.trim().parse::<usize>().ok())
            .filter(|&n| n > 0)
            .map(|n| n.min(MAX_PAGE_SIZE))
            .unwrap_or(DEFAULT_PAGE_SIZE)
    }

    /// Tag filter, if a non-blank one was given.
    pub fn tag(&self) -> Option<&str> {
        non_blank(self.tag.as_deref())
    }

    /// Title substring filter, if a non-blank one was given.
    pub fn search(&self) -> Option<&str> {
        non_blank(self.search.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}

/// Whether `topic` passes the tag and title filters.
///
/// The title match is a case-sensitive substring test.
pub fn matches_filters(topic: &Topic, tag: Option<&str>, search: Option<&str>) -> bool {
    let tag_ok = tag.map_or(true, |t| topic.tags.contains(t));
    let search_ok = search.map_or(true, |s| topic.title().contains(s));
    tag_ok && search_ok
}

/// A topic together with the data the listing needs about it.
#[derive(Debug, Clone)]
pub struct TopicSummary {
    pub topic: Topic,
    /// The earliest message of the topic.
    pub initial_message: Message,
    pub message_count: usize,
}

impl TopicSummary {
    /// Topic popularity: the like count of its initial message.
    pub fn likes(&self) -> usize {
        self.initial_message.likes()
    }
}

/// Orders topics by popularity, most liked first.
///
/// The sort is stable: topics with equal like counts keep their relative order.
pub fn sort_by_likes(summaries: &mut [TopicSummary]) {
    summaries.sort_by(|a, b| b.likes().cmp(&a.likes()));
}

// =============================================================================
// Pagination
// =============================================================================

/// Represents a single page of results.
#[derive(Debug, Clone)]
pub struct Page<T> {
    /// Items in this page
    pub object_list: Vec<T>,
    /// Current page number (1-indexed)
    pub number: usize,
    /// Total number of pages
    pub num_pages: usize,
    /// Total number of items across all pages
    pub count: usize,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    /// Page numbers to link to: up to [`PAGE_LINK_RADIUS`] on each side of
    /// the current page, clamped to `1..=num_pages`.
    pub fn page_range(&self) -> std::ops::RangeInclusive<usize> {
        let start = self.number.saturating_sub(PAGE_LINK_RADIUS).max(1);
        let end = (self.number + PAGE_LINK_RADIUS).min(self.num_pages);
        start..=end
    }
}

/// Cuts `items` into pages of `page_size` and returns the requested one.
///
/// Returns `None` when there is nothing to show. A page parameter that is not
/// an integer selects page 1; a number outside `1..=num_pages` selects the
/// last page.
pub fn paginate<T>(items: Vec<T>, page_param: Option<&str>, page_size: usize) -> Option<Page<T>> {
    if items.is_empty() {
        return None;
    }
    let page_size = page_size.max(1);
    let count = items.len();
    let num_pages = count.div_ceil(page_size);

    let number = match page_param.map(str::trim).map(str::parse::<i64>) {
        None => 1,
        Some(Err(_)) => 1,
        Some(Ok(n)) if n >= 1 && (n as u64) <= num_pages as u64 => n as usize,
        Some(Ok(_)) => num_pages,
    };

    let start = (number - 1) * page_size;
    let object_list: Vec<T> = items.into_iter().skip(start).take(page_size).collect();

    Some(Page {
        object_list,
        number,
        num_pages,
        count,
    })
}
