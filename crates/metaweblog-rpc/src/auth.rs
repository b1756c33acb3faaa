//! Credential gate for every bridge call.
//!
//! The gate runs before any argument decoding and before any storage
//! access. Credentials are located by name when the arguments can be
//! named, and by their declared position otherwise.
//!
//! A successful check yields a [`CallContext`]. Operations on
//! [`crate::MetaWeblogService`] take a `&CallContext`, and the only way
//! to obtain one is through [`CredentialGate::admit`], so an operation
//! cannot run unauthenticated.

use std::sync::Arc;

use serde_json::Value;

use metaweblog_store::Authenticator;
use metaweblog_types::{Identity, Result, WeblogError};

use crate::api::{ApiMethod, PARAM_PASSWORD, PARAM_USERNAME};
use crate::args::RawArgs;

/// Message returned to clients for every rejected login.
pub const INVALID_LOGIN: &str = "Invalid login";

// ---------------------------------------------------------------------------
// CallContext
// ---------------------------------------------------------------------------

/// Authenticated caller plus the request-scoped site location.
#[derive(Clone, Debug)]
pub struct CallContext {
    identity: Identity,
    site_base: String,
}

impl CallContext {
    /// The authenticated user.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Site base URL the call was made against, without trailing `/`.
    pub fn site_base(&self) -> &str {
        &self.site_base
    }
}

// ---------------------------------------------------------------------------
// CredentialGate
// ---------------------------------------------------------------------------

/// Extracts credentials from raw arguments and checks them.
#[derive(Clone)]
pub struct CredentialGate {
    authenticator: Arc<dyn Authenticator>,
}

impl CredentialGate {
    /// Creates a gate backed by `authenticator`.
    pub fn new(authenticator: Arc<dyn Authenticator>) -> Self {
        Self { authenticator }
    }

    /// Authenticates the caller of `method`.
    ///
    /// # Errors
    ///
    /// [`WeblogError::AuthenticationFailure`] if the credentials are
    /// missing, are not strings, or are rejected. Errors raised by the
    /// authenticator itself propagate unchanged.
    pub async fn admit(
        &self,
        method: ApiMethod,
        args: &RawArgs,
        site_base: &str,
    ) -> Result<CallContext> {
        let (username, password) = credentials(method, args).ok_or_else(invalid_login)?;

        match self.authenticator.authenticate(&username, &password).await? {
            Some(identity) => {
                tracing::debug!(%method, user = %identity.username, "caller admitted");
                Ok(CallContext {
                    identity,
                    site_base: site_base.trim_end_matches('/').to_string(),
                })
            }
            None => {
                tracing::debug!(%method, user = %username, "login rejected");
                Err(invalid_login())
            }
        }
    }
}

/// Reads `(username, password)` from `args`.
fn credentials(method: ApiMethod, args: &RawArgs) -> Option<(String, String)> {
    match args.expects_to_map(method) {
        Some(map) => Some((
            as_string(map.get(PARAM_USERNAME))?,
            as_string(map.get(PARAM_PASSWORD))?,
        )),
        None => Some((
            as_string(args.positional(method, PARAM_USERNAME))?,
            as_string(args.positional(method, PARAM_PASSWORD))?,
        )),
    }
}

fn as_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

fn invalid_login() -> WeblogError {
    WeblogError::AuthenticationFailure {
        reason: INVALID_LOGIN.into(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
