//! RPC server configuration.
//!
//! Binds to loopback by default. `public_url` overrides the base used
//! in every URL handed back to clients, for deployments behind a proxy.

use std::net::SocketAddr;

use metaweblog_types::{Result, WeblogError};

/// Smallest accepted request body limit.
const MIN_BODY_BYTES: usize = 1024;

/// Configuration for the RPC server.
#[derive(Clone, Debug)]
pub struct RpcConfig {
    /// Listen address.
    pub bind_addr: SocketAddr,

    /// Public site base, e.g. `https://blog.example.org`. Defaults to
    /// `http://{bind_addr}`.
    pub public_url: Option<String>,

    /// Upper bound on request bodies, media uploads included.
    pub max_body_bytes: usize,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8085)),
            public_url: None,
            max_body_bytes: 16 * 1024 * 1024,
        }
    }
}

impl RpcConfig {
    /// Site base clients should see, without trailing `/`.
    pub fn site_base(&self) -> String {
        match &self.public_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://{}", self.bind_addr),
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// [`WeblogError::ConfigError`] for a public URL without an
    /// `http`/`https` scheme or a body limit below 1 KiB.
    pub fn validate(&self) -> Result<()> {
        if let Some(url) = &self.public_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(WeblogError::ConfigError {
                    reason: format!("public URL must start with http:// or https://, got '{url}'"),
                });
            }
        }
        if self.max_body_bytes < MIN_BODY_BYTES {
            return Err(WeblogError::ConfigError {
                reason: format!(
                    "max_body_bytes must be at least {MIN_BODY_BYTES}, got {}",
                    self.max_body_bytes
                ),
            });
        }
        Ok(())
    }
}
