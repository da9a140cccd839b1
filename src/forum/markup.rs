//! Markdown rendering for message bodies.
//!
//! Messages are stored as the raw Markdown the author typed. They are turned
//! into HTML when displayed, and the HTML is passed through an allow-list
//! sanitizer so user content can never inject scripts or styles.

use ammonia::Builder;
use pulldown_cmark::{html, Options, Parser};
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

/// Elements that survive sanitizing.
const ALLOWED_TAGS: &[&str] = &[
    "a", "abbr", "acronym", "b", "blockquote", "br", "code", "em", "i", "kbd", "li", "ol", "p",
    "strong", "ul",
];

/// Link schemes that survive sanitizing.
const ALLOWED_SCHEMES: &[&str] = &["http", "https", "mailto"];

/// Elements removed together with their content.
const STRIPPED_WITH_CONTENT: &[&str] = &["script", "style"];

static SANITIZER: OnceLock<Builder<'static>> = OnceLock::new();

fn sanitizer() -> &'static Builder<'static> {
    SANITIZER.get_or_init(|| {
        let mut attributes = HashMap::new();
        attributes.insert("a", ["href", "title"].into_iter().collect::<HashSet<_>>());
        attributes.insert("abbr", ["title"].into_iter().collect());
        attributes.insert("acronym", ["title"].into_iter().collect());

        let mut builder = Builder::empty();
        builder
            .tags(ALLOWED_TAGS.iter().copied().collect())
            .tag_attributes(attributes)
            .url_schemes(ALLOWED_SCHEMES.iter().copied().collect())
            .clean_content_tags(STRIPPED_WITH_CONTENT.iter().copied().collect())
            .link_rel(Some("nofollow noopener"));
        builder
    })
}

/// Renders Markdown to HTML and strips everything outside the allow-list.
pub fn render_markdown(source: &str) -> String {
    let parser = Parser::new_ext(source, Options::ENABLE_STRIKETHROUGH);
    let mut unsafe_html = String::with_capacity(source.len() * 3 / 2);
    html::push_html(&mut unsafe_html, parser);
    sanitize_html(&unsafe_html)
}

/// Sanitizes a fragment of HTML with the message allow-list.
pub fn sanitize_html(fragment: &str) -> String {
    sanitizer().clean(fragment).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_markdown() {
        let html = render_markdown("Hello *world*, **bold** and `code`");
        assert_eq!(
            html.trim(),
            "<p>Hello <em>world</em>, <strong>bold</strong> and <code>code</code></p>"
        );
    }

    #[test]
    fn test_lists_and_quotes_survive() {
        let html = render_markdown("> quoted\n\n- one\n- two\n\n1. first");
        assert!(html.contains("<blockquote>"));
        assert!(html.contains("<ul>"));
        assert!(html.contains("<li>one</li>"));
        assert!(html.contains("<ol>"));
    }

    #[test]
    fn test_script_is_removed_with_content() {
        let html = render_markdown("hi <script>alert('x')</script> there");
        assert!(!html.contains("script"));
        assert!(!html.contains("alert"));
        assert!(html.contains("hi"));
    }

    #[test]
    fn test_disallowed_tags_are_unwrapped() {
        let html = render_markdown("# Heading\n\n<div onclick=\"x()\">text</div>");
        assert!(!html.contains("<h1>"));
        assert!(!html.contains("<div"));
        assert!(!html.contains("onclick"));
        assert!(html.contains("Heading"));
        assert!(html.contains("text"));
    }

    #[test]
    fn test_links() {
        let html = render_markdown("[site](https://example.org \"Example\")");
        assert!(html.contains("href=\"https://example.org\""));
        assert!(html.contains("title=\"Example\""));
        assert!(html.contains("rel=\"nofollow noopener\""));

        let html = render_markdown("[bad](javascript:alert(1))");
        assert!(!html.contains("javascript"));
    }

    #[test]
    fn test_kbd_is_allowed() {
        let html = render_markdown("press <kbd>Ctrl</kbd>");
        assert!(html.contains("<kbd>Ctrl</kbd>"));
    }
}
