mod types;

#[cfg(test)]
mod tests;

use super::http_client::build_provider_client_with_timeout;
use super::scrub::{api_error, sanitize_api_error};
use super::traits::{Provider, ProviderFuture};
use super::types::{CompletionRequest, ProviderResponse};
use crate::platform::plans::preferred_providers;
use reqwest::Client;
use types::{
    ChatRequest, ChatResponse, Message, Plugin, ProviderRouting, ResponseFormat, WebSearchOptions,
};

const PROVIDER_NAME: &str = "OpenRouter";
const MISSING_API_KEY_MESSAGE: &str =
    "OpenRouter API key not set. Add secrets.openrouter_api_key or set OPENROUTER_API_KEY.";
const EXTRA_HEADERS: [(&str, &str); 1] = [("X-Title", "Promptwatch")];

/// OpenRouter chat-completions client.
pub struct OpenRouterProvider {
    /// Pre-computed `"Bearer <key>"` header value (avoids `format!` per request).
    cached_auth_header: Option<String>,
    chat_completions_url: String,
    client: Client,
}

impl OpenRouterProvider {
    pub fn new(api_key: Option<&str>, base_url: &str, timeout_secs: u64) -> Self {
        Self {
            cached_auth_header: api_key
                .filter(|k| !k.trim().is_empty())
                .map(|k| format!("Bearer {k}")),
            chat_completions_url: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            client: build_provider_client_with_timeout(timeout_secs),
        }
    }

    fn build_request(request: &CompletionRequest<'_>) -> ChatRequest {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system_prompt {
            messages.push(Message {
                role: "system",
                content: system.to_string(),
            });
        }
        messages.push(Message {
            role: "user",
            content: request.message.to_string(),
        });

        let order = preferred_providers(request.model);
        let provider = (!order.is_empty()).then(|| ProviderRouting {
            order: order.iter().map(|p| (*p).to_string()).collect(),
            allow_fallbacks: true,
        });

        ChatRequest {
            model: request.model.to_string(),
            messages,
            temperature: request.temperature,
            response_format: request
                .json_response
                .then_some(ResponseFormat { kind: "json_object" }),
            provider,
            plugins: request.web_search.map(|_| vec![Plugin { id: "web" }]),
            web_search_options: request
                .web_search
                .map(|search_context_size| WebSearchOptions {
                    search_context_size,
                }),
        }
    }

    fn into_provider_response(response: ChatResponse) -> anyhow::Result<ProviderResponse> {
        if let Some(error) = response.error {
            let code = error.code.map(|c| format!(" ({c})")).unwrap_or_default();
            anyhow::bail!(
                "{PROVIDER_NAME} error{code}: {}",
                sanitize_api_error(&error.message)
            );
        }

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("No response content from {PROVIDER_NAME}"))?;
        let usage = response.usage.unwrap_or_default();

        Ok(ProviderResponse {
            text,
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
            model: response.model,
        })
    }

    async fn call_api(&self, request: &ChatRequest) -> anyhow::Result<ChatResponse> {
        let auth_header = self
            .cached_auth_header
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!(MISSING_API_KEY_MESSAGE))?;

        let mut builder = self
            .client
            .post(&self.chat_completions_url)
            .header("Authorization", auth_header)
            .json(request);
        for (name, value) in EXTRA_HEADERS {
            builder = builder.header(name, value);
        }

        let response = builder
            .send()
            .await
            .map_err(|error| anyhow::anyhow!("{PROVIDER_NAME} request failed: {error}"))?;

        if !response.status().is_success() {
            return Err(api_error(PROVIDER_NAME, response).await);
        }

        response
            .json()
            .await
            .map_err(|error| anyhow::anyhow!("{PROVIDER_NAME} response JSON decode failed: {error}"))
    }
}

impl Provider for OpenRouterProvider {
    fn name(&self) -> &str {
        "openrouter"
    }

    fn complete<'a>(&'a self, request: CompletionRequest<'a>) -> ProviderFuture<'a> {
        Box::pin(async move {
            let chat_request = Self::build_request(&request);
            let response = self.call_api(&chat_request).await?;
            Self::into_provider_response(response)
        })
    }
}
