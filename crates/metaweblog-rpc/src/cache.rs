//! Response cache invalidation after mutations.
//!
//! Invalidation is best effort: a failing cache is logged and the
//! mutation still succeeds.

use std::sync::Arc;

use metaweblog_store::ResponseCache;
use metaweblog_types::ContentPage;

#[derive(Clone)]
pub struct CacheInvalidator {
    cache: Arc<dyn ResponseCache>,
}

impl CacheInvalidator {
    pub fn new(cache: Arc<dyn ResponseCache>) -> Self {
        Self { cache }
    }

    /// A new post appears in its parent's listing.
    pub async fn after_create(&self, parent: Option<&ContentPage>) {
        if let Some(parent) = parent {
            self.drop_url(&parent.url).await;
        }
    }

    /// The post itself, then its parent's listing.
    pub async fn after_edit(&self, page: &ContentPage, parent: Option<&ContentPage>) {
        self.drop_url(&page.url).await;
        if let Some(parent) = parent {
            self.drop_url(&parent.url).await;
        }
    }

    /// Same URLs as an edit.
    pub async fn after_delete(&self, page: &ContentPage, parent: Option<&ContentPage>) {
        self.after_edit(page, parent).await;
    }

    async fn drop_url(&self, url: &str) {
        if let Err(e) = self.cache.invalidate(url).await {
            tracing::warn!(%url, error = %e, "cache invalidation failed");
        }
    }
}
