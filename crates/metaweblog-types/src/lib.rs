//! Core shared types for the MetaWeblog bridge.
//!
//! This crate defines the types used across the workspace: page
//! identifiers, timestamps, the hierarchical [`ContentPage`] model owned
//! by the storage collaborator, the protocol-facing records in
//! [`records`], and the central [`WeblogError`].

pub mod config;
pub mod records;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use records::{Article, Category, MediaObject, MediaUrl};

// ---------------------------------------------------------------------------
// PageId
// ---------------------------------------------------------------------------

/// Stable identifier of a stored content page.
///
/// On the wire the protocol carries it as a decimal string (`postid`).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct PageId(u64);

impl PageId {
    /// Creates a `PageId` from its numeric value.
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl From<u64> for PageId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PageId {
    type Err = WeblogError;

    /// Parses a decimal post id. An unparseable id can never resolve to
    /// a page, so it is reported as [`WeblogError::NotFound`].
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|_| WeblogError::NotFound {
                reason: format!("no page with id '{s}'"),
            })
    }
}

// ---------------------------------------------------------------------------
// Timestamp
// ---------------------------------------------------------------------------

/// UTC timestamp.
///
/// Pages store all times in UTC; local time only appears when an
/// incoming naive timestamp is interpreted.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Format used for `dateCreated` in outgoing articles.
    pub const DB_FORMAT: &'static str = "%Y-%m-%d %H:%M:%S";

    /// Creates a `Timestamp` representing the current UTC time.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a `Timestamp` from a `DateTime<Utc>`.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Renders the timestamp as `YYYY-MM-DD HH:MM:SS` in UTC.
    pub fn to_db_string(&self) -> String {
        self.0.format(Self::DB_FORMAT).to_string()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl FromStr for Timestamp {
    type Err = WeblogError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let dt = DateTime::parse_from_rfc3339(s)
            .map_err(|e| WeblogError::MalformedInput {
                reason: format!("invalid RFC 3339 timestamp: {e}"),
            })?
            .with_timezone(&Utc);
        Ok(Self(dt))
    }
}

// ---------------------------------------------------------------------------
// PageStatus
// ---------------------------------------------------------------------------

/// Publication state of a page as seen by the bridge.
///
/// Richer workflow states belong to the storage collaborator.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum PageStatus {
    /// Not publicly visible.
    Draft,
    /// Publicly visible.
    Published,
}

impl fmt::Display for PageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Draft => write!(f, "draft"),
            Self::Published => write!(f, "published"),
        }
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Authenticated caller, resolved by the credential gate and passed
/// explicitly to every operation.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Identity {
    /// Numeric user identifier assigned by the authenticator.
    pub user_id: u64,
    /// Login name the caller authenticated with.
    pub username: String,
}

// ---------------------------------------------------------------------------
// ContentPage
// ---------------------------------------------------------------------------

/// Name of the short teaser part of a post.
pub const PART_BODY: &str = "body";

/// Name of the continuation part of a post.
pub const PART_EXTENDED: &str = "extended";

/// A node of the content hierarchy, owned by the storage collaborator.
///
/// Archive containers (categories) and posts are both pages; a post's
/// `parent_id` points at its archive container. The `body` and
/// `extended` parts are stored separately as [`PagePart`]s.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentPage {
    /// Identifier, reserved by the store when the page is created.
    pub id: PageId,
    /// Page class, e.g. `"Page"` or `"PaginatedArchive"`.
    pub kind: String,
    pub title: String,
    pub slug: String,
    pub breadcrumb: String,
    pub status: PageStatus,
    pub published_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub parent_id: Option<PageId>,
    /// Relative URL (`/` for a root page), maintained by the store on save.
    pub url: String,
    /// User that created the page, if known.
    pub created_by: Option<u64>,
    /// User that last edited the page, if known.
    pub updated_by: Option<u64>,
}

/// One named text fragment of a page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagePart {
    pub page_id: PageId,
    pub name: String,
    pub content: String,
}

impl PagePart {
    /// Creates an empty part for `page_id`.
    pub fn empty(page_id: PageId, name: &str) -> Self {
        Self {
            page_id,
            name: name.to_string(),
            content: String::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// WeblogError
// ---------------------------------------------------------------------------

/// Central error type for the bridge.
///
/// All crates in the workspace convert their internal errors into
/// variants of this enum.
#[derive(Debug, Error)]
pub enum WeblogError {
    /// The credential gate rejected the call.
    #[error("authentication failed: {reason}")]
    AuthenticationFailure {
        /// Human-readable description of the rejection.
        reason: String,
    },

    /// The requested page does not exist or the id cannot resolve.
    #[error("not found: {reason}")]
    NotFound {
        /// Human-readable description of what was missing.
        reason: String,
    },

    /// The storage collaborator refused to persist a page.
    #[error("validation failed: {reason}")]
    ValidationFailure {
        /// All validation messages joined with `", "`.
        reason: String,
    },

    /// An incoming value could not be parsed.
    #[error("malformed input: {reason}")]
    MalformedInput {
        /// Human-readable description of the parse failure.
        reason: String,
    },

    /// Unknown method or undecodable argument structure.
    #[error("protocol error: {reason}")]
    ProtocolError {
        /// Human-readable description of the protocol failure.
        reason: String,
    },

    /// A content or part store operation failed.
    #[error("storage error: {reason}")]
    StorageError {
        /// Human-readable description of the storage failure.
        reason: String,
    },

    /// The media store could not persist an upload.
    #[error("media error: {reason}")]
    MediaError {
        /// Human-readable description of the media failure.
        reason: String,
    },

    /// The response cache could not drop an entry.
    #[error("cache error: {reason}")]
    CacheError {
        /// Human-readable description of the cache failure.
        reason: String,
    },

    /// A configuration value is invalid or missing.
    #[error("config error: {reason}")]
    ConfigError {
        /// Human-readable description of the configuration problem.
        reason: String,
    },

    /// The transport could not bind or serve.
    #[error("network error: {reason}")]
    NetworkError {
        /// Human-readable description of the network failure.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// Result alias
// ---------------------------------------------------------------------------

/// Convenience result type using [`WeblogError`].
pub type Result<T> = std::result::Result<T, WeblogError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
