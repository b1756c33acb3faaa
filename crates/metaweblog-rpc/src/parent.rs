//! Parent resolution for posts.
//!
//! A post's parent is picked by walking an ordered list of strategies;
//! the first one that yields a page wins.

use std::sync::Arc;

use metaweblog_store::{ContentStore, PageQuery};
use metaweblog_types::{ContentPage, PageId, Result};

/// One way of choosing a parent page.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ParentStrategy {
    /// The archive container titled like the first requested category.
    NamedCategory,
    /// The archive container with the lowest id.
    FirstArchive,
    /// The configured default page.
    DefaultPage,
}

/// Strategies applied when creating a post.
pub const FOR_CREATE: &[ParentStrategy] = &[
    ParentStrategy::NamedCategory,
    ParentStrategy::FirstArchive,
    ParentStrategy::DefaultPage,
];

/// Strategies applied when editing; no match keeps the current parent.
pub const FOR_EDIT: &[ParentStrategy] = &[ParentStrategy::NamedCategory];

/// Looks up parent candidates in the content store.
#[derive(Clone)]
pub struct ParentResolver {
    content: Arc<dyn ContentStore>,
    archive_kind: String,
    default_parent: PageId,
}

impl ParentResolver {
    pub fn new(content: Arc<dyn ContentStore>, archive_kind: &str, default_parent: PageId) -> Self {
        Self {
            content,
            archive_kind: archive_kind.to_string(),
            default_parent,
        }
    }

    /// Applies `strategies` in order and returns the first match.
    ///
    /// # Errors
    ///
    /// Store failures propagate.
    pub async fn resolve(
        &self,
        strategies: &[ParentStrategy],
        category: Option<&str>,
    ) -> Result<Option<ContentPage>> {
        for strategy in strategies {
            if let Some(page) = self.apply(*strategy, category).await? {
                tracing::debug!(?strategy, parent_id = %page.id, "parent resolved");
                return Ok(Some(page));
            }
        }
        Ok(None)
    }

    /// Evaluates a single strategy.
    pub async fn apply(
        &self,
        strategy: ParentStrategy,
        category: Option<&str>,
    ) -> Result<Option<ContentPage>> {
        match strategy {
            ParentStrategy::NamedCategory => match category {
                Some(title) => {
                    self.content
                        .find_by_kind_and_title(&self.archive_kind, title)
                        .await
                }
                None => Ok(None),
            },
            ParentStrategy::FirstArchive => Ok(self
                .content
                .find_all(&PageQuery::of_kind(&self.archive_kind).limit(1))
                .await?
                .into_iter()
                .next()),
            ParentStrategy::DefaultPage => self.content.find(self.default_parent).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metaweblog_store::MemoryStore;

    const ARCHIVE: &str = "PaginatedArchive";

    async fn fixture() -> Result<(Arc<MemoryStore>, ContentPage, ContentPage, ContentPage)> {
        let store = Arc::new(MemoryStore::new());
        let root = store.seed_page("Page", "Home", "/", None).await?;
        let news = store.seed_page(ARCHIVE, "News", "news", Some(root.id)).await?;
        let misc = store.seed_page(ARCHIVE, "Misc", "misc", Some(root.id)).await?;
        Ok((store, root, news, misc))
    }

    fn resolver(store: &Arc<MemoryStore>) -> ParentResolver {
        ParentResolver::new(store.clone(), ARCHIVE, PageId::new(1))
    }

    #[tokio::test]
    async fn named_category_matches_title() -> Result<()> {
        let (store, _, _, misc) = fixture().await?;
        let r = resolver(&store);
        let found = r.apply(ParentStrategy::NamedCategory, Some("Misc")).await?;
        assert_eq!(found.map(|p| p.id), Some(misc.id));
        assert!(r.apply(ParentStrategy::NamedCategory, None).await?.is_none());
        assert!(r
            .apply(ParentStrategy::NamedCategory, Some("Home"))
            .await?
            .is_none());
        Ok(())
    }

    #[tokio::test]
    async fn first_archive_is_lowest_id() -> Result<()> {
        let (store, _, news, _) = fixture().await?;
        let found = resolver(&store).apply(ParentStrategy::FirstArchive, None).await?;
        assert_eq!(found.map(|p| p.id), Some(news.id));
        Ok(())
    }

    #[tokio::test]
    async fn create_chain_falls_through() -> Result<()> {
        let (store, _, news, _) = fixture().await?;
        let found = resolver(&store).resolve(FOR_CREATE, Some("Nope")).await?;
        assert_eq!(found.map(|p| p.id), Some(news.id));
        Ok(())
    }

    #[tokio::test]
    async fn default_page_when_no_archives() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let root = store.seed_page("Page", "Home", "/", None).await?;
        let found = resolver(&store).resolve(FOR_CREATE, None).await?;
        assert_eq!(found.map(|p| p.id), Some(root.id));
        Ok(())
    }

    #[tokio::test]
    async fn empty_store_resolves_nothing() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        assert!(resolver(&store).resolve(FOR_CREATE, None).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn edit_chain_only_matches_names() -> Result<()> {
        let (store, _, _, _) = fixture().await?;
        assert!(resolver(&store).resolve(FOR_EDIT, None).await?.is_none());
        Ok(())
    }
}
