//! Page validation rules applied by the in-memory store on save.
//!
//! Messages are returned in a fixed order so callers can join them into
//! a single report.

use std::sync::LazyLock;

use regex::Regex;

use metaweblog_types::ContentPage;

/// Maximum title length in characters.
pub const MAX_TITLE_LEN: usize = 255;

static SLUG_FORMAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([-_.A-Za-z0-9]*|/)$").expect("slug regex is valid"));

/// Checks `page` against the store's rules.
///
/// `parent_exists` reports whether `page.parent_id` (if any) resolves.
/// `siblings` are the other committed children of the same parent.
pub fn validate_page<'a>(
    page: &ContentPage,
    parent_exists: bool,
    siblings: impl IntoIterator<Item = &'a ContentPage>,
) -> Vec<String> {
    let mut errors = Vec::new();

    if page.title.trim().is_empty() {
        errors.push("Title can't be blank".to_string());
    } else if page.title.chars().count() > MAX_TITLE_LEN {
        errors.push(format!(
            "Title is too long (maximum is {MAX_TITLE_LEN} characters)"
        ));
    }

    if page.parent_id.is_some() && page.slug.trim().is_empty() {
        errors.push("Slug can't be blank".to_string());
    } else if !SLUG_FORMAT.is_match(&page.slug) {
        errors.push("Slug is invalid".to_string());
    }

    if page.breadcrumb.trim().is_empty() {
        errors.push("Breadcrumb can't be blank".to_string());
    }

    if page.parent_id.is_some() && !parent_exists {
        errors.push("Parent must exist".to_string());
    }

    if !page.slug.is_empty()
        && siblings
            .into_iter()
            .any(|s| s.id != page.id && s.slug == page.slug)
    {
        errors.push("Slug already in use for child of parent".to_string());
    }

    errors
}

/// Normalizes a relative URL: leading and trailing `/`, no repeats.
pub fn clean_url(raw: &str) -> String {
    let segments: Vec<&str> = raw.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", segments.join("/"))
    }
}
