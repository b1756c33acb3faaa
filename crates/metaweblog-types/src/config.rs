//! Bridge configuration with sensible defaults.
//!
//! Every value has a default matching what MetaWeblog clients
//! expect.

use serde::{Deserialize, Serialize};

use crate::{PageId, Result, WeblogError};

/// How `editPost` reacts when the content store refuses to save.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditFailurePolicy {
    /// Log the failure and still answer `true`, as legacy clients expect.
    #[default]
    Lenient,
    /// Surface the failure as a validation error.
    Strict,
}

/// Bridge configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Page class that marks archive containers (categories).
    pub archive_kind: String,

    /// Page class given to posts created through the bridge.
    pub page_kind: String,

    /// Parent used when no category or archive container resolves.
    pub default_parent_id: u64,

    /// Maximum number of characters kept in a generated plain-text
    /// excerpt.
    pub perex_limit: usize,

    /// Upper bound for `getRecentPosts`, whatever the client asks for.
    pub max_recent_posts: usize,

    /// Behaviour of `editPost` on save failure.
    pub edit_failure_policy: EditFailurePolicy,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            archive_kind: "PaginatedArchive".into(),
            page_kind: "Page".into(),
            default_parent_id: 1,
            perex_limit: 512,
            max_recent_posts: 100,
            edit_failure_policy: EditFailurePolicy::Lenient,
        }
    }
}

impl BridgeConfig {
    /// Returns the default parent as a [`PageId`].
    pub fn default_parent(&self) -> PageId {
        PageId::new(self.default_parent_id)
    }

    /// Validates all configuration values.
    ///
    /// # Errors
    ///
    /// Returns [`WeblogError::ConfigError`] for empty page kinds or a
    /// zero limit.
    pub fn validate(&self) -> Result<()> {
        if self.archive_kind.trim().is_empty() {
            return Err(WeblogError::ConfigError {
                reason: "archive_kind must not be empty".into(),
            });
        }
        if self.page_kind.trim().is_empty() {
            return Err(WeblogError::ConfigError {
                reason: "page_kind must not be empty".into(),
            });
        }
        if self.archive_kind == self.page_kind {
            return Err(WeblogError::ConfigError {
                reason: format!(
                    "archive_kind and page_kind must differ, both are '{}'",
                    self.page_kind
                ),
            });
        }
        if self.perex_limit == 0 {
            return Err(WeblogError::ConfigError {
                reason: "perex_limit must be greater than zero".into(),
            });
        }
        if self.max_recent_posts == 0 {
            return Err(WeblogError::ConfigError {
                reason: "max_recent_posts must be greater than zero".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = BridgeConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.perex_limit, 512);
        assert_eq!(cfg.default_parent(), PageId::new(1));
        assert_eq!(cfg.edit_failure_policy, EditFailurePolicy::Lenient);
    }

    #[test]
    fn same_kinds_rejected() {
        let cfg = BridgeConfig {
            page_kind: "PaginatedArchive".into(),
            ..BridgeConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_perex_limit_rejected() {
        let cfg = BridgeConfig {
            perex_limit: 0,
            ..BridgeConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn partial_json_fills_defaults() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let cfg: BridgeConfig =
            serde_json::from_str(r#"{"edit_failure_policy": "strict", "max_recent_posts": 5}"#)?;
        assert_eq!(cfg.edit_failure_policy, EditFailurePolicy::Strict);
        assert_eq!(cfg.max_recent_posts, 5);
        assert_eq!(cfg.archive_kind, "PaginatedArchive");
        Ok(())
    }
}
