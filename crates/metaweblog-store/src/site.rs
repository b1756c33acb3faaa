//! Fixed site location.

use crate::traits::SiteContext;

/// Site context with a configured base URL.
#[derive(Clone, Debug)]
pub struct StaticSite {
    base_url: String,
}

impl StaticSite {
    /// Creates a site rooted at `base_url`; any trailing `/` is dropped.
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl SiteContext for StaticSite {
    fn base_url(&self) -> String {
        self.base_url.clone()
    }
}
