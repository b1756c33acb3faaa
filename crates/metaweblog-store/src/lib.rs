//! Collaborators of the MetaWeblog bridge.
//!
//! The bridge never owns storage, credentials, media or the response
//! cache; it reaches them through the narrow async contracts in
//! [`traits`]. This crate also ships in-memory implementations used by
//! the daemon and by tests:
//!
//! - [`memory`]: `MemoryStore`, a validating content and part store.
//! - [`media`]: `MemoryMediaStore` and the directory-backed `FsMediaStore`.
//! - [`cache`]: `MemoryResponseCache`.
//! - [`credentials`]: `StaticAuthenticator` (SHA-256 digests,
//!   constant-time comparison).
//! - [`site`]: `StaticSite`.

pub mod cache;
pub mod credentials;
pub mod media;
pub mod memory;
pub mod site;
pub mod traits;
pub mod validation;

pub use cache::MemoryResponseCache;
pub use credentials::StaticAuthenticator;
pub use media::{FsMediaStore, MemoryMediaStore};
pub use memory::MemoryStore;
pub use site::StaticSite;
pub use traits::{
    Authenticator, ContentStore, MediaStore, PageDefaults, PageFilter, PageOrder, PageQuery,
    PartStore, ResponseCache, SaveOutcome, SiteContext, StoredResource,
};
