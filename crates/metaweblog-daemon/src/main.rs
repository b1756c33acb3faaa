//! MetaWeblog Daemon -- MetaWeblog API endpoint for desktop blogging
//! clients.
//!
//! Usage:
//!
//!   metaweblog-daemon [OPTIONS]
//!
//! Options:
//!
//!   --listen <ADDR>         HTTP listen address (default: 127.0.0.1:8085)
//!   --public-url <URL>      Public site base used in returned links
//!   --media-dir <PATH>      Directory receiving uploads
//!   --user <NAME:PASSWORD>  Accept a login (repeatable)
//!   --archive <TITLE>       Seed an archive container (repeatable)
//!   --strict-edits          Report refused edits instead of answering true
//!   --config <PATH>         Load config from JSON file
//!
//! Content lives in memory for the lifetime of the process. The daemon
//! runs until interrupted with Ctrl+C.

use std::sync::Arc;

use tokio::sync::watch;

use metaweblog_rpc::compose::derive_slug;
use metaweblog_rpc::{Collaborators, Dispatcher, MetaWeblogService, RpcConfig, RpcServer};
use metaweblog_store::media::DEFAULT_URL_PREFIX;
use metaweblog_store::{
    FsMediaStore, MemoryResponseCache, MemoryStore, StaticAuthenticator, StaticSite,
};

mod config;

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() {
    // Tracing / logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // Parse CLI arguments.
    let cli = config::CliArgs::parse_from_env();

    // Load or merge config file if provided.
    let daemon_config = match &cli.config_path {
        Some(path) => config::DaemonConfig::load(path).and_then(|cfg| cfg.merge_cli(&cli)),
        None => config::DaemonConfig::from_cli(&cli),
    };
    let daemon_config = match daemon_config {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    // Run the daemon.
    if let Err(e) = run_daemon(daemon_config).await {
        tracing::error!("daemon error: {e}");
        std::process::exit(1);
    }
}

// ---------------------------------------------------------------------------
// Daemon main logic
// ---------------------------------------------------------------------------

async fn run_daemon(cfg: config::DaemonConfig) -> Result<(), String> {
    // -----------------------------------------------------------------------
    // 1. Credentials
    // -----------------------------------------------------------------------

    let authenticator = build_authenticator(&cfg.users)?;
    if authenticator.is_empty() {
        tracing::warn!("no users configured, every call will be rejected");
    }
    tracing::info!(users = authenticator.len(), "credentials loaded");

    // -----------------------------------------------------------------------
    // 2. Content
    // -----------------------------------------------------------------------

    let store = Arc::new(MemoryStore::new());
    seed_site(&store, &cfg).await?;
    tracing::info!(pages = store.len(), archives = cfg.archives.len(), "site seeded");

    // -----------------------------------------------------------------------
    // 3. Bridge
    // -----------------------------------------------------------------------

    let rpc_config = RpcConfig {
        bind_addr: cfg.listen_addr,
        public_url: cfg.public_url.clone(),
        max_body_bytes: cfg.max_body_bytes,
    };
    let site_base = rpc_config.site_base();

    let collaborators = Collaborators {
        authenticator: Arc::new(authenticator),
        content: store.clone(),
        parts: store.clone(),
        media: Arc::new(FsMediaStore::new(&cfg.media_dir, DEFAULT_URL_PREFIX)),
        cache: Arc::new(MemoryResponseCache::new()),
        site: Arc::new(StaticSite::new(&site_base)),
    };
    let service = MetaWeblogService::new(collaborators, cfg.bridge.clone())
        .map_err(|e| format!("invalid bridge configuration: {e}"))?;
    let dispatcher = Arc::new(Dispatcher::new(service));

    // -----------------------------------------------------------------------
    // 4. Start RPC server
    // -----------------------------------------------------------------------

    let (rpc_shutdown_tx, rpc_shutdown_rx) = watch::channel(false);

    let mut rpc_handle = RpcServer::start(rpc_config, dispatcher, rpc_shutdown_rx)
        .await
        .map_err(|e| format!("RPC server start failed: {e}"))?;

    // -----------------------------------------------------------------------
    // 5. Print status summary
    // -----------------------------------------------------------------------

    println!();
    println!("============================================================");
    println!("  MetaWeblog Daemon running");
    println!("============================================================");
    println!("  Endpoint:     http://{}/rpc", cfg.listen_addr);
    println!("  Site base:    {site_base}");
    println!("  Media dir:    {}", cfg.media_dir.display());
    println!("  Archives:     {}", cfg.archives.join(", "));
    println!("  Edit policy:  {:?}", cfg.bridge.edit_failure_policy);
    println!("============================================================");
    println!("  Press Ctrl+C to stop");
    println!("============================================================");
    println!();

    // -----------------------------------------------------------------------
    // 6. Wait for shutdown signal
    // -----------------------------------------------------------------------

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received Ctrl+C, shutting down...");
        }
        result = &mut rpc_handle => {
            if let Err(e) = result {
                tracing::error!(%e, "RPC server task panicked");
            } else {
                tracing::error!("RPC server exited unexpectedly");
            }
            return Err("RPC server stopped".into());
        }
    }

    // Signal RPC server to stop and let in-flight requests drain.
    let _ = rpc_shutdown_tx.send(true);
    if let Err(e) = rpc_handle.await {
        tracing::warn!(%e, "RPC server task did not stop cleanly");
    }

    tracing::info!("daemon stopped");
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn build_authenticator(users: &[config::UserEntry]) -> Result<StaticAuthenticator, String> {
    let mut auth = StaticAuthenticator::new();
    for user in users {
        auth = match (&user.password_sha256, &user.password) {
            (Some(digest), _) => auth
                .with_digest(&user.username, digest)
                .map_err(|e| e.to_string())?,
            (None, Some(password)) => auth.with_user(&user.username, password),
            (None, None) => {
                return Err(format!("user '{}' has no password", user.username));
            }
        };
    }
    Ok(auth)
}

/// Creates the root page (the default parent) and the archive containers.
async fn seed_site(store: &MemoryStore, cfg: &config::DaemonConfig) -> Result<(), String> {
    let root = store
        .seed_page(&cfg.bridge.page_kind, &cfg.site_title, "/", None)
        .await
        .map_err(|e| format!("failed to seed root page: {e}"))?;
    if root.id != cfg.bridge.default_parent() {
        tracing::warn!(
            root_id = %root.id,
            default_parent_id = cfg.bridge.default_parent_id,
            "root page is not the configured default parent"
        );
    }

    for title in &cfg.archives {
        let archive = store
            .seed_page(&cfg.bridge.archive_kind, title, &derive_slug(title), Some(root.id))
            .await
            .map_err(|e| format!("failed to seed archive '{title}': {e}"))?;
        tracing::debug!(id = %archive.id, url = %archive.url, "archive seeded");
    }
    Ok(())
}
