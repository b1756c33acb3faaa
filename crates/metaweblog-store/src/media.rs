//! Media stores.
//!
//! Both stores publish files under a site-relative prefix (default
//! `/files`). Names containing path separators or parent references are
//! refused so an upload can never escape its directory.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;

use metaweblog_types::{Result, Timestamp, WeblogError};

use crate::traits::{MediaStore, StoredResource};

/// Default public prefix for uploaded files.
pub const DEFAULT_URL_PREFIX: &str = "/files";

/// Rejects names that are empty or could address another directory.
fn check_filename(filename: &str) -> Result<()> {
    if filename.trim().is_empty() {
        return Err(WeblogError::MediaError {
            reason: "file name must not be empty".into(),
        });
    }
    if filename.contains('/')
        || filename.contains('\\')
        || filename == "."
        || filename == ".."
        || filename.contains('\0')
    {
        return Err(WeblogError::MediaError {
            reason: format!("file name '{filename}' is not a plain file name"),
        });
    }
    Ok(())
}

fn public_path(prefix: &str, filename: &str) -> String {
    format!("{}/{}", prefix.trim_end_matches('/'), filename)
}

// ---------------------------------------------------------------------------
// MemoryMediaStore
// ---------------------------------------------------------------------------

/// Keeps uploads in memory. Re-uploading a name replaces the file.
pub struct MemoryMediaStore {
    url_prefix: String,
    files: Mutex<BTreeMap<String, (StoredResource, Vec<u8>)>>,
}

impl Default for MemoryMediaStore {
    fn default() -> Self {
        Self::new(DEFAULT_URL_PREFIX)
    }
}

impl MemoryMediaStore {
    /// Creates an empty store publishing under `url_prefix`.
    pub fn new(url_prefix: &str) -> Self {
        Self {
            url_prefix: url_prefix.to_string(),
            files: Mutex::new(BTreeMap::new()),
        }
    }

    /// Returns the stored bytes of `filename`, if any.
    pub fn contents(&self, filename: &str) -> Option<Vec<u8>> {
        self.files
            .lock()
            .ok()
            .and_then(|files| files.get(filename).map(|(_, bytes)| bytes.clone()))
    }
}

#[async_trait]
impl MediaStore for MemoryMediaStore {
    async fn persist(
        &self,
        filename: &str,
        mime_type: &str,
        bytes: &[u8],
        created_at: Timestamp,
    ) -> Result<StoredResource> {
        check_filename(filename)?;
        let resource = StoredResource {
            filename: filename.to_string(),
            mime_type: mime_type.to_string(),
            size: bytes.len(),
            created_at,
            public_path: public_path(&self.url_prefix, filename),
        };

        let mut files = self.files.lock().map_err(|_| WeblogError::MediaError {
            reason: "media store lock poisoned".into(),
        })?;
        files.insert(filename.to_string(), (resource.clone(), bytes.to_vec()));
        Ok(resource)
    }
}

// ---------------------------------------------------------------------------
// FsMediaStore
// ---------------------------------------------------------------------------

/// Writes uploads into a directory served by the web front end.
pub struct FsMediaStore {
    root: PathBuf,
    url_prefix: String,
}

impl FsMediaStore {
    /// Creates a store writing into `root`, publishing under `url_prefix`.
    pub fn new(root: impl Into<PathBuf>, url_prefix: &str) -> Self {
        Self {
            root: root.into(),
            url_prefix: url_prefix.to_string(),
        }
    }
}

#[async_trait]
impl MediaStore for FsMediaStore {
    async fn persist(
        &self,
        filename: &str,
        mime_type: &str,
        bytes: &[u8],
        created_at: Timestamp,
    ) -> Result<StoredResource> {
        check_filename(filename)?;

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| WeblogError::MediaError {
                reason: format!(
                    "failed to create media directory '{}': {e}",
                    self.root.display()
                ),
            })?;

        let path = self.root.join(filename);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| WeblogError::MediaError {
                reason: format!("failed to write '{}': {e}", path.display()),
            })?;

        tracing::info!(path = %path.display(), size = bytes.len(), mime_type, "media stored");

        Ok(StoredResource {
            filename: filename.to_string(),
            mime_type: mime_type.to_string(),
            size: bytes.len(),
            created_at,
            public_path: public_path(&self.url_prefix, filename),
        })
    }
}
