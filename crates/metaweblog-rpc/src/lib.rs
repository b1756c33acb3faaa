//! MetaWeblog API bridge.
//!
//! Lets desktop blogging clients list categories, read, create, edit
//! and delete posts, and upload media, on top of a hierarchical content
//! store. The bridge is a thin translation layer: it authenticates the
//! caller, decodes typed requests, maps protocol records to pages and
//! back, and delegates persistence to the collaborators defined in
//! `metaweblog-store`.
//!
//! # Call flow
//!
//! 1. [`dispatch::Dispatcher`] resolves the method name.
//! 2. [`auth::CredentialGate`] authenticates the caller before any
//!    storage access and produces a [`auth::CallContext`].
//! 3. The arguments are decoded into the operation's request record.
//! 4. [`service::MetaWeblogService`] runs the operation.
//!
//! # Modules
//!
//! - [`api`]: method table and signatures.
//! - [`args`]: raw arguments and typed request records.
//! - [`auth`]: `CredentialGate`, `CallContext`.
//! - [`compose`]: body/extended composition, slug, status, dates.
//! - [`mapper`]: page → `Article` / `Category`.
//! - [`parent`]: ordered parent-resolution strategies.
//! - [`cache`]: response cache invalidation.
//! - [`service`]: the seven operations.
//! - [`dispatch`]: method routing and fault codes.
//! - [`config`]: `RpcConfig` (bind settings).
//! - [`server`]: `RpcServer::start()` entry point.

pub mod api;
pub mod args;
pub mod auth;
pub mod cache;
pub mod compose;
pub mod config;
pub mod dispatch;
pub mod mapper;
pub mod parent;
pub mod server;
pub mod service;

// Re-exports for consumers.
pub use api::ApiMethod;
pub use args::RawArgs;
pub use auth::{CallContext, CredentialGate};
pub use config::RpcConfig;
pub use dispatch::Dispatcher;
pub use server::{router, RpcServer};
pub use service::{Collaborators, MetaWeblogService};
