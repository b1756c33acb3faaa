//! In-memory content and part store.
//!
//! [`MemoryStore`] keeps committed pages in id order, which doubles as
//! insertion order. Ids are reserved by [`ContentStore::create`] and
//! only become visible once [`ContentStore::save`] commits the page.
//! Page URLs are derived from the parent chain on every read, so
//! renaming an archive is reflected in its children immediately.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use metaweblog_types::{ContentPage, PageId, PagePart, PageStatus, Result, Timestamp, WeblogError};

use crate::traits::{ContentStore, PageDefaults, PageFilter, PageOrder, PageQuery, PartStore, SaveOutcome};
use crate::validation::{clean_url, validate_page};

/// Parent chains deeper than this are treated as cycles.
const MAX_DEPTH: usize = 64;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Default)]
struct State {
    pages: BTreeMap<PageId, ContentPage>,
    parts: HashMap<(PageId, String), String>,
    last_id: u64,
}

impl State {
    /// Relative URL of `page`, built from its ancestors' slugs.
    fn url_of(&self, page: &ContentPage) -> String {
        let mut slugs = vec![page.slug.as_str()];
        let mut cursor = page.parent_id;
        let mut depth = 0;
        while let Some(id) = cursor {
            let Some(parent) = self.pages.get(&id) else {
                break;
            };
            slugs.push(parent.slug.as_str());
            cursor = parent.parent_id;
            depth += 1;
            if depth >= MAX_DEPTH {
                break;
            }
        }
        slugs.reverse();
        clean_url(&slugs.join("/"))
    }

    fn with_url(&self, page: &ContentPage) -> ContentPage {
        let mut page = page.clone();
        page.url = self.url_of(&page);
        page
    }

    /// Collects `id` and all of its descendants.
    fn subtree(&self, id: PageId) -> Vec<PageId> {
        let mut out = vec![id];
        let mut i = 0;
        while i < out.len() {
            let current = out[i];
            let children: Vec<PageId> = self
                .pages
                .values()
                .filter(|p| p.parent_id == Some(current) && !out.contains(&p.id))
                .map(|p| p.id)
                .collect();
            out.extend(children);
            i += 1;
        }
        out
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// Validating in-memory page repository implementing both
/// [`ContentStore`] and [`PartStore`].
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>> {
        self.state.read().map_err(|_| WeblogError::StorageError {
            reason: "page store lock poisoned".into(),
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>> {
        self.state.write().map_err(|_| WeblogError::StorageError {
            reason: "page store lock poisoned".into(),
        })
    }

    /// Creates and commits a published page in one step.
    ///
    /// Used to seed archive containers and the site root.
    ///
    /// # Errors
    ///
    /// [`WeblogError::ValidationFailure`] with every message joined if
    /// the page is refused.
    pub async fn seed_page(
        &self,
        kind: &str,
        title: &str,
        slug: &str,
        parent_id: Option<PageId>,
    ) -> Result<ContentPage> {
        let mut page = self
            .create(PageDefaults {
                kind: kind.to_string(),
                created_by: None,
            })
            .await?;
        page.title = title.to_string();
        page.breadcrumb = title.to_string();
        page.slug = slug.to_string();
        page.parent_id = parent_id;
        page.status = PageStatus::Published;
        page.published_at = Some(page.created_at);

        match self.save(&mut page).await? {
            SaveOutcome::Saved => Ok(page),
            SaveOutcome::Invalid(errors) => Err(WeblogError::ValidationFailure {
                reason: errors.join(", "),
            }),
        }
    }

    /// Number of committed pages.
    pub fn len(&self) -> usize {
        self.read().map(|s| s.pages.len()).unwrap_or(0)
    }

    /// Returns `true` if no page is committed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn find(&self, id: PageId) -> Result<Option<ContentPage>> {
        let state = self.read()?;
        Ok(state.pages.get(&id).map(|p| state.with_url(p)))
    }

    async fn find_all(&self, query: &PageQuery) -> Result<Vec<ContentPage>> {
        let state = self.read()?;
        let mut pages: Vec<&ContentPage> = state
            .pages
            .values()
            .filter(|p| match &query.filter {
                PageFilter::All => true,
                PageFilter::Kind(kind) => &p.kind == kind,
            })
            .collect();

        if query.order == PageOrder::CreatedDesc {
            // Stable sort: equal timestamps keep id (insertion) order.
            pages.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        }

        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(pages
            .into_iter()
            .take(limit)
            .map(|p| state.with_url(p))
            .collect())
    }

    async fn find_by_kind_and_title(
        &self,
        kind: &str,
        title: &str,
    ) -> Result<Option<ContentPage>> {
        let state = self.read()?;
        Ok(state
            .pages
            .values()
            .find(|p| p.kind == kind && p.title == title)
            .map(|p| state.with_url(p)))
    }

    async fn create(&self, defaults: PageDefaults) -> Result<ContentPage> {
        let mut state = self.write()?;
        state.last_id += 1;
        let id = PageId::new(state.last_id);

        Ok(ContentPage {
            id,
            kind: defaults.kind,
            title: String::new(),
            slug: String::new(),
            breadcrumb: String::new(),
            status: PageStatus::Draft,
            published_at: None,
            created_at: Timestamp::now(),
            parent_id: None,
            url: String::new(),
            created_by: defaults.created_by,
            updated_by: defaults.created_by,
        })
    }

    async fn save(&self, page: &mut ContentPage) -> Result<SaveOutcome> {
        let mut state = self.write()?;

        let parent_exists = page
            .parent_id
            .map(|id| id != page.id && state.pages.contains_key(&id))
            .unwrap_or(false);
        let errors = validate_page(
            page,
            parent_exists,
            state.pages.values().filter(|p| p.parent_id == page.parent_id),
        );
        if !errors.is_empty() {
            tracing::debug!(page_id = %page.id, ?errors, "page rejected");
            return Ok(SaveOutcome::Invalid(errors));
        }

        page.url = state.url_of(page);
        state.pages.insert(page.id, page.clone());
        Ok(SaveOutcome::Saved)
    }

    async fn destroy(&self, id: PageId) -> Result<()> {
        let mut state = self.write()?;
        if !state.pages.contains_key(&id) {
            return Err(WeblogError::NotFound {
                reason: format!("no page with id '{id}'"),
            });
        }

        let doomed = state.subtree(id);
        for page_id in &doomed {
            state.pages.remove(page_id);
        }
        state.parts.retain(|(page_id, _), _| !doomed.contains(page_id));
        tracing::debug!(page_id = %id, removed = doomed.len(), "pages destroyed");
        Ok(())
    }
}

#[async_trait]
impl PartStore for MemoryStore {
    async fn part(&self, page_id: PageId, name: &str) -> Result<PagePart> {
        let state = self.read()?;
        let content = state
            .parts
            .get(&(page_id, name.to_string()))
            .cloned()
            .unwrap_or_default();
        Ok(PagePart {
            page_id,
            name: name.to_string(),
            content,
        })
    }

    async fn save_part(&self, part: &PagePart) -> Result<()> {
        let mut state = self.write()?;
        state
            .parts
            .insert((part.page_id, part.name.clone()), part.content.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
