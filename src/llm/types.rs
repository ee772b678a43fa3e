use crate::platform::plans::SearchContextSize;
use serde::{Deserialize, Serialize};

/// A single-turn completion: optional system prompt plus one user message.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub system_prompt: Option<&'a str>,
    pub message: &'a str,
    pub model: &'a str,
    pub temperature: Option<f64>,
    /// Enables the provider's web search with the given context size.
    pub web_search: Option<SearchContextSize>,
    /// Ask for a JSON object instead of free text.
    pub json_response: bool,
}

impl<'a> CompletionRequest<'a> {
    pub fn new(message: &'a str, model: &'a str) -> Self {
        Self {
            system_prompt: None,
            message,
            model,
            temperature: None,
            web_search: None,
            json_response: false,
        }
    }

    pub fn with_system(mut self, system_prompt: &'a str) -> Self {
        self.system_prompt = Some(system_prompt);
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_web_search(mut self, context_size: Option<SearchContextSize>) -> Self {
        self.web_search = context_size;
        self
    }

    pub fn json(mut self) -> Self {
        self.json_response = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderResponse {
    pub text: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    /// Model the upstream actually served, when reported.
    pub model: Option<String>,
}

impl ProviderResponse {
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            input_tokens: 0,
            output_tokens: 0,
            model: None,
        }
    }

    pub fn with_usage(text: impl Into<String>, input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            text: text.into(),
            input_tokens,
            output_tokens,
            model: None,
        }
    }
}
