//! HTTP transport.
//!
//! [`RpcServer::start`] binds the listener and spawns the axum server as
//! a tokio task, returning its `JoinHandle`.
//!
//! # Routes
//!
//! - `POST /rpc` with `{"methodName": "...", "params": [...] | {...}}`.
//!   Answers `{"result": ...}` or
//!   `{"fault": {"faultCode": n, "faultString": "..."}}`, always with
//!   status 200 as MetaWeblog clients expect.
//! - `GET /health` answers `{"status": "ok"}`.
//!
//! # Graceful shutdown
//!
//! The server accepts a `tokio::sync::watch::Receiver<bool>`. When the
//! watch value becomes `true`, or the sender is dropped, the server
//! stops accepting connections and drains in-flight requests.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use metaweblog_types::{Result, WeblogError};

use crate::args::RawArgs;
use crate::config::RpcConfig;
use crate::dispatch::{fault_code, Dispatcher};

// ---------------------------------------------------------------------------
// Shutdown helper
// ---------------------------------------------------------------------------

/// Returns a future that resolves when the shutdown watch fires.
async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            break;
        }
        if rx.changed().await.is_err() {
            break;
        }
    }
}

// ---------------------------------------------------------------------------
// Wire envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RpcCall {
    #[serde(rename = "methodName")]
    method_name: String,
    #[serde(default)]
    params: RawArgs,
}

fn fault(err: &WeblogError) -> Value {
    json!({
        "fault": {
            "faultCode": fault_code(err),
            "faultString": err.to_string(),
        }
    })
}

async fn handle_rpc(State(dispatcher): State<Arc<Dispatcher>>, body: Bytes) -> Json<Value> {
    let call: RpcCall = match serde_json::from_slice(&body) {
        Ok(call) => call,
        Err(e) => {
            let err = WeblogError::ProtocolError {
                reason: format!("malformed request body: {e}"),
            };
            tracing::warn!(error = %err, "request rejected");
            return Json(fault(&err));
        }
    };

    match dispatcher.call(&call.method_name, call.params).await {
        Ok(result) => Json(json!({ "result": result })),
        Err(e) => Json(fault(&e)),
    }
}

async fn handle_health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Routes served by [`RpcServer`].
pub fn router(dispatcher: Arc<Dispatcher>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/rpc", post(handle_rpc))
        .route("/health", get(handle_health))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(dispatcher)
}

// ---------------------------------------------------------------------------
// RpcServer
// ---------------------------------------------------------------------------

/// Manages the lifecycle of the HTTP server.
pub struct RpcServer;

impl RpcServer {
    /// Binds `config.bind_addr` and serves until shutdown.
    ///
    /// # Errors
    ///
    /// [`WeblogError::ConfigError`] if config validation fails, or
    /// [`WeblogError::NetworkError`] if the listener cannot bind.
    pub async fn start(
        config: RpcConfig,
        dispatcher: Arc<Dispatcher>,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Result<JoinHandle<()>> {
        config.validate()?;

        let listener =
            TcpListener::bind(config.bind_addr)
                .await
                .map_err(|e| WeblogError::NetworkError {
                    reason: format!("cannot bind {}: {e}", config.bind_addr),
                })?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| WeblogError::NetworkError {
                reason: format!("cannot read local address: {e}"),
            })?;
        tracing::info!(addr = %local_addr, "RPC server listening");

        let app = router(dispatcher, config.max_body_bytes);
        let handle = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(wait_for_shutdown(shutdown_rx))
                .await;

            if let Err(e) = result {
                tracing::error!(%e, "RPC server error");
            }

            tracing::info!("RPC server stopped");
        });

        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn shutdown_fires_on_true() {
        let (tx, rx) = watch::channel(false);
        let waiter = tokio::spawn(wait_for_shutdown(rx));
        let _ = tx.send(true);
        let done = tokio::time::timeout(Duration::from_secs(1), waiter).await;
        assert!(done.is_ok());
    }

    #[tokio::test]
    async fn shutdown_fires_on_sender_drop() {
        let (tx, rx) = watch::channel(false);
        drop(tx);
        let done = tokio::time::timeout(Duration::from_secs(1), wait_for_shutdown(rx)).await;
        assert!(done.is_ok());
    }

    #[test]
    fn fault_envelope_shape() {
        let v = fault(&WeblogError::NotFound {
            reason: "no post".into(),
        });
        assert_eq!(v["fault"]["faultCode"], 404);
        assert!(v["fault"]["faultString"]
            .as_str()
            .is_some_and(|s| s.contains("no post")));
    }

    #[test]
    fn envelope_defaults_params() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let call: RpcCall = serde_json::from_str(r#"{"methodName": "getPost"}"#)?;
        assert_eq!(call.method_name, "getPost");
        assert_eq!(call.params, RawArgs::default());
        Ok(())
    }
}
