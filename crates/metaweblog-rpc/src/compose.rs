//! Turns an incoming [`Article`] into page fields and part contents.

use std::sync::LazyLock;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use regex::Regex;

use metaweblog_types::{Article, ContentPage, PageStatus, Result, Timestamp, WeblogError};

static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?[^>]*>").expect("tag regex is valid"));

static SLUG_DROP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^-a-z0-9~[:space:].:;+=_]").expect("slug filter regex is valid"));

static SLUG_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[[:space:].:;=+]+").expect("slug separator regex is valid"));

/// Naive formats accepted for `dateCreated`, tried in order.
const NAIVE_DATE_FORMATS: [&str; 3] = ["%Y%m%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

// ---------------------------------------------------------------------------
// Body
// ---------------------------------------------------------------------------

/// Contents of the two parts of a post.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ComposedBody {
    /// Short teaser shown in listings.
    pub body: String,
    /// The complete post.
    pub extended: String,
}

/// Splits a description into teaser and full text.
///
/// An explicit `<hr` marks the teaser end. Without one, a supplied
/// `text_more` continuation makes the description the teaser. Otherwise
/// the teaser is a plain-text excerpt of at most `perex_limit` chars.
pub fn compose_body(
    description: Option<&str>,
    text_more: Option<&str>,
    perex_limit: usize,
) -> ComposedBody {
    let description = description.unwrap_or_default();

    if let Some(cut) = description.find("<hr") {
        return ComposedBody {
            body: description[..cut].to_string(),
            extended: description.to_string(),
        };
    }

    if let Some(more) = text_more {
        return ComposedBody {
            body: description.to_string(),
            extended: format!("{description}{more}"),
        };
    }

    ComposedBody {
        body: format!("<p>{}</p>", perex(description, perex_limit)),
        extended: description.to_string(),
    }
}

/// Removes every markup tag.
pub fn strip_tags(html: &str) -> String {
    TAG.replace_all(html, "").into_owned()
}

fn perex(description: &str, limit: usize) -> String {
    let text = strip_tags(description);
    match text.char_indices().nth(limit) {
        Some((cut, _)) => text[..cut].to_string(),
        None => text,
    }
}

// ---------------------------------------------------------------------------
// Slug / status / date
// ---------------------------------------------------------------------------

/// URL-safe identifier derived from a title.
pub fn derive_slug(title: &str) -> String {
    let lowered = title.trim().to_ascii_lowercase();
    let kept = SLUG_DROP.replace_all(&lowered, "");
    SLUG_SEPARATORS.replace_all(&kept, "-").into_owned()
}

/// Page status for the client's publish flag.
pub fn derive_status(publish: bool) -> PageStatus {
    if publish {
        PageStatus::Published
    } else {
        PageStatus::Draft
    }
}

/// Parses a client-supplied `dateCreated`.
///
/// Accepts RFC 3339 and the naive forms in [`NAIVE_DATE_FORMATS`]. A
/// trailing `Z` on a naive form means UTC; otherwise it is local time.
///
/// # Errors
///
/// [`WeblogError::MalformedInput`] if no format matches.
pub fn parse_date_created(raw: &str) -> Result<Timestamp> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Timestamp::from_datetime(dt.with_timezone(&Utc)));
    }

    let (naive_text, utc) = match raw.strip_suffix('Z') {
        Some(rest) => (rest, true),
        None => (raw, false),
    };
    let naive = NAIVE_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(naive_text, fmt).ok())
        .ok_or_else(|| WeblogError::MalformedInput {
            reason: format!("unrecognised dateCreated '{raw}'"),
        })?;

    let dt = if utc {
        Utc.from_utc_datetime(&naive)
    } else {
        Local
            .from_local_datetime(&naive)
            .earliest()
            .ok_or_else(|| WeblogError::MalformedInput {
                reason: format!("dateCreated '{raw}' does not exist in local time"),
            })?
            .with_timezone(&Utc)
    };
    Ok(Timestamp::from_datetime(dt))
}

/// Publication time for a post; falls back to now.
pub fn derive_published_at(date_created: Option<&str>) -> Timestamp {
    match date_created.map(parse_date_created) {
        Some(Ok(ts)) => ts,
        Some(Err(e)) => {
            tracing::debug!(error = %e, "using current time for publication");
            Timestamp::now()
        }
        None => Timestamp::now(),
    }
}

/// Writes the article's title, slug, breadcrumb, status and publication
/// time onto `page`.
pub fn apply_article(page: &mut ContentPage, article: &Article, publish: bool) {
    let title = article.title.clone().unwrap_or_default();
    page.slug = derive_slug(&title);
    page.breadcrumb = title.clone();
    page.title = title;
    page.status = derive_status(publish);
    page.published_at = Some(derive_published_at(article.date_created.as_deref()));
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
