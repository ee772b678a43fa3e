use crate::platform::plans::SearchContextSize;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub(super) struct ChatRequest {
    pub(super) model: String,
    pub(super) messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) response_format: Option<ResponseFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) provider: Option<ProviderRouting>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) plugins: Option<Vec<Plugin>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) web_search_options: Option<WebSearchOptions>,
}

#[derive(Debug, Serialize)]
pub(super) struct Message {
    pub(super) role: &'static str,
    pub(super) content: String,
}

#[derive(Debug, Serialize)]
pub(super) struct ResponseFormat {
    #[serde(rename = "type")]
    pub(super) kind: &'static str,
}

#[derive(Debug, Serialize)]
pub(super) struct ProviderRouting {
    pub(super) order: Vec<String>,
    pub(super) allow_fallbacks: bool,
}

#[derive(Debug, Serialize)]
pub(super) struct Plugin {
    pub(super) id: &'static str,
}

#[derive(Debug, Serialize)]
pub(super) struct WebSearchOptions {
    pub(super) search_context_size: SearchContextSize,
}

#[derive(Debug, Deserialize)]
pub(super) struct ChatResponse {
    #[serde(default)]
    pub(super) choices: Vec<Choice>,
    pub(super) usage: Option<Usage>,
    pub(super) model: Option<String>,
    /// OpenRouter can report upstream failures inside a 200 body.
    pub(super) error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
pub(super) struct Choice {
    pub(super) message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
pub(super) struct ResponseMessage {
    pub(super) content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct Usage {
    #[serde(default)]
    pub(super) prompt_tokens: u64,
    #[serde(default)]
    pub(super) completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
pub(super) struct ApiErrorBody {
    #[serde(default)]
    pub(super) message: String,
    pub(super) code: Option<serde_json::Value>,
}
