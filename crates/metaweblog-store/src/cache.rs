//! In-memory response cache.

use std::collections::{BTreeSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use metaweblog_types::{Result, WeblogError};

use crate::traits::ResponseCache;

/// Most recent invalidations kept by [`MemoryResponseCache`].
pub const INVALIDATION_LOG_LIMIT: usize = 256;

/// Set of cached URLs plus a bounded log of recent invalidations.
#[derive(Default)]
pub struct MemoryResponseCache {
    entries: Mutex<BTreeSet<String>>,
    invalidated: Mutex<VecDeque<String>>,
}

impl MemoryResponseCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `url` as having a cached rendering.
    pub fn insert(&self, url: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(url.to_string());
        }
    }

    /// Returns `true` if `url` currently has a cached rendering.
    pub fn contains(&self, url: &str) -> bool {
        self.entries
            .lock()
            .map(|entries| entries.contains(url))
            .unwrap_or(false)
    }

    /// The last [`INVALIDATION_LOG_LIMIT`] URLs passed to
    /// [`ResponseCache::invalidate`], oldest first.
    pub fn invalidated(&self) -> Vec<String> {
        self.invalidated
            .lock()
            .map(|log| log.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ResponseCache for MemoryResponseCache {
    async fn invalidate(&self, url: &str) -> Result<()> {
        self.entries
            .lock()
            .map_err(|_| poisoned())?
            .remove(url);
        let mut log = self.invalidated.lock().map_err(|_| poisoned())?;
        if log.len() == INVALIDATION_LOG_LIMIT {
            log.pop_front();
        }
        log.push_back(url.to_string());
        Ok(())
    }
}

fn poisoned() -> WeblogError {
    WeblogError::CacheError {
        reason: "response cache lock poisoned".into(),
    }
}
