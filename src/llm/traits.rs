use super::types::{CompletionRequest, ProviderResponse};
use std::future::Future;
use std::pin::Pin;

pub type ProviderFuture<'a> =
    Pin<Box<dyn Future<Output = anyhow::Result<ProviderResponse>> + Send + 'a>>;

/// Upstream model access used by both the executor and the judge.
pub trait Provider: Send + Sync {
    /// Provider identifier (e.g. "openrouter").
    fn name(&self) -> &str;

    /// Run one completion. Non-2xx responses and provider-reported errors
    /// surface as `Err`.
    fn complete<'a>(&'a self, request: CompletionRequest<'a>) -> ProviderFuture<'a>;
}
