//! Collaborator contracts consumed by the bridge.
//!
//! Every trait is object-safe and `Send + Sync` so the bridge can hold
//! collaborators as `Arc<dyn Trait>` and serve calls concurrently.

use async_trait::async_trait;

use metaweblog_types::{ContentPage, Identity, PageId, PagePart, Result, Timestamp};

// ---------------------------------------------------------------------------
// Authenticator
// ---------------------------------------------------------------------------

/// Verifies a username/password pair.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Returns the caller's identity, or `None` when access is denied.
    async fn authenticate(&self, username: &str, password: &str) -> Result<Option<Identity>>;
}

// ---------------------------------------------------------------------------
// Content store
// ---------------------------------------------------------------------------

/// Which pages a [`PageQuery`] selects.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PageFilter {
    /// Every committed page.
    All,
    /// Pages of the given class.
    Kind(String),
}

/// Ordering of a [`PageQuery`] result.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PageOrder {
    /// Lowest id first.
    IdAsc,
    /// Newest `created_at` first; ties keep insertion order.
    CreatedDesc,
}

/// Predicate, order and limit for [`ContentStore::find_all`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PageQuery {
    pub filter: PageFilter,
    pub order: PageOrder,
    pub limit: Option<usize>,
}

impl PageQuery {
    /// All pages of `kind`, lowest id first.
    pub fn of_kind(kind: &str) -> Self {
        Self {
            filter: PageFilter::Kind(kind.to_string()),
            order: PageOrder::IdAsc,
            limit: None,
        }
    }

    /// The `limit` most recently created pages, site-wide.
    pub fn recent(limit: usize) -> Self {
        Self {
            filter: PageFilter::All,
            order: PageOrder::CreatedDesc,
            limit: Some(limit),
        }
    }

    /// Restricts the result to at most `limit` pages.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Initial values for [`ContentStore::create`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PageDefaults {
    pub kind: String,
    pub created_by: Option<u64>,
}

/// Result of [`ContentStore::save`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SaveOutcome {
    /// The page was committed.
    Saved,
    /// The page violated the store's rules; nothing was committed.
    Invalid(Vec<String>),
}

/// Hierarchical page repository.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Looks up a committed page.
    async fn find(&self, id: PageId) -> Result<Option<ContentPage>>;

    /// Returns committed pages matching `query`.
    async fn find_all(&self, query: &PageQuery) -> Result<Vec<ContentPage>>;

    /// Returns the lowest-id page of `kind` titled exactly `title`.
    async fn find_by_kind_and_title(&self, kind: &str, title: &str)
        -> Result<Option<ContentPage>>;

    /// Returns a new, uncommitted page with a reserved id.
    async fn create(&self, defaults: PageDefaults) -> Result<ContentPage>;

    /// Validates and commits `page`, refreshing its derived `url`.
    async fn save(&self, page: &mut ContentPage) -> Result<SaveOutcome>;

    /// Permanently removes a page, its parts and its descendants.
    ///
    /// # Errors
    ///
    /// [`metaweblog_types::WeblogError::NotFound`] if the page does not exist.
    async fn destroy(&self, id: PageId) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Part store
// ---------------------------------------------------------------------------

/// Named text fragments attached to pages.
#[async_trait]
pub trait PartStore: Send + Sync {
    /// Returns the stored part, or an empty one if none exists yet.
    async fn part(&self, page_id: PageId, name: &str) -> Result<PagePart>;

    /// Persists `part`, replacing any previous content.
    async fn save_part(&self, part: &PagePart) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Media store
// ---------------------------------------------------------------------------

/// A persisted upload.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StoredResource {
    pub filename: String,
    pub mime_type: String,
    pub size: usize,
    pub created_at: Timestamp,
    /// Site-relative path the file is served from, starting with `/`.
    pub public_path: String,
}

impl StoredResource {
    /// Absolute URL of the file under `site_base`.
    pub fn public_url(&self, site_base: &str) -> String {
        format!("{}{}", site_base.trim_end_matches('/'), self.public_path)
    }
}

/// Upload persistence.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Stores `bytes` under `filename`.
    async fn persist(
        &self,
        filename: &str,
        mime_type: &str,
        bytes: &[u8],
        created_at: Timestamp,
    ) -> Result<StoredResource>;
}

// ---------------------------------------------------------------------------
// Response cache / site
// ---------------------------------------------------------------------------

/// Cache of rendered responses, keyed by relative URL.
#[async_trait]
pub trait ResponseCache: Send + Sync {
    /// Drops any cached rendering of `url`.
    async fn invalidate(&self, url: &str) -> Result<()>;
}

/// Public location of the site.
pub trait SiteContext: Send + Sync {
    /// Scheme, host and port without a trailing path, e.g. `http://blog:8080`.
    fn base_url(&self) -> String;
}
