//! Method-name routing.
//!
//! [`Dispatcher::call`] resolves the method, runs the credential gate,
//! decodes the typed request and invokes the operation, in that order.
//! Nothing reaches a collaborator other than the authenticator until
//! the gate has admitted the caller.

use serde::Serialize;
use serde_json::Value;

use metaweblog_types::{Result, WeblogError};

use crate::api::ApiMethod;
use crate::args::{decode, GetCategoriesRequest, RawArgs};
use crate::auth::CredentialGate;
use crate::service::MetaWeblogService;

/// Entry point shared by every transport.
pub struct Dispatcher {
    service: MetaWeblogService,
    gate: CredentialGate,
}

impl Dispatcher {
    pub fn new(service: MetaWeblogService) -> Self {
        let gate = service.gate();
        Self { service, gate }
    }

    /// Runs `method_name` with `args` and returns the encoded result.
    ///
    /// # Errors
    ///
    /// [`WeblogError::ProtocolError`] for an unknown method or
    /// undecodable arguments; otherwise whatever the gate or the
    /// operation reports.
    pub async fn call(&self, method_name: &str, args: RawArgs) -> Result<Value> {
        let result = self.route(method_name, args).await;
        if let Err(e) = &result {
            if fault_code(e) >= 500 {
                tracing::error!(method = %method_name, error = %e, "call failed");
            } else {
                tracing::warn!(method = %method_name, error = %e, "call rejected");
            }
        }
        result
    }

    async fn route(&self, method_name: &str, args: RawArgs) -> Result<Value> {
        let method = ApiMethod::lookup(method_name).ok_or_else(|| WeblogError::ProtocolError {
            reason: format!("unknown method '{method_name}'"),
        })?;

        let ctx = self
            .gate
            .admit(method, &args, &self.service.site_base())
            .await?;

        let svc = &self.service;
        match method {
            ApiMethod::GetCategories => {
                let _: GetCategoriesRequest = decode(method, args)?;
                encode(svc.list_categories(&ctx).await?)
            }
            ApiMethod::GetPost => encode(svc.get_post(&ctx, decode(method, args)?).await?),
            ApiMethod::GetRecentPosts => {
                encode(svc.get_recent_posts(&ctx, decode(method, args)?).await?)
            }
            ApiMethod::NewPost => encode(svc.new_post(&ctx, decode(method, args)?).await?),
            ApiMethod::EditPost => encode(svc.edit_post(&ctx, decode(method, args)?).await?),
            ApiMethod::DeletePost => encode(svc.delete_post(&ctx, decode(method, args)?).await?),
            ApiMethod::NewMediaObject => {
                encode(svc.new_media_object(&ctx, decode(method, args)?).await?)
            }
        }
    }
}

fn encode<T: Serialize>(value: T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| WeblogError::ProtocolError {
        reason: format!("cannot encode result: {e}"),
    })
}

/// Fault code reported to clients for `err`.
pub fn fault_code(err: &WeblogError) -> i32 {
    match err {
        WeblogError::AuthenticationFailure { .. } => 401,
        WeblogError::NotFound { .. } => 404,
        WeblogError::ProtocolError { .. } | WeblogError::MalformedInput { .. } => 400,
        WeblogError::ValidationFailure { .. } => 422,
        _ => 500,
    }
}
