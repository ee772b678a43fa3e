use super::*;
use crate::platform::plans::SearchContextSize;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider(server: &MockServer) -> OpenRouterProvider {
    OpenRouterProvider::new(Some("sk-or-test"), &format!("{}/api/v1", server.uri()), 5)
}

fn completion_body(content: &str) -> serde_json::Value {
    json!({
        "model": "openai/gpt-5-nano",
        "choices": [{ "message": { "role": "assistant", "content": content } }],
        "usage": { "prompt_tokens": 12, "completion_tokens": 34 }
    })
}

#[test]
fn request_includes_web_search_and_provider_routing() {
    let request = CompletionRequest::new("best CRM for startups?", "anthropic/claude-haiku-4.5")
        .with_web_search(Some(SearchContextSize::Medium));
    let json = serde_json::to_value(OpenRouterProvider::build_request(&request)).unwrap();

    assert_eq!(json["model"], "anthropic/claude-haiku-4.5");
    assert_eq!(json["messages"][0]["role"], "user");
    assert_eq!(json["plugins"][0]["id"], "web");
    assert_eq!(json["web_search_options"]["search_context_size"], "medium");
    assert_eq!(json["provider"]["order"][0], "Anthropic");
    assert_eq!(json["provider"]["allow_fallbacks"], true);
    assert!(json.get("temperature").is_none());
    assert!(json.get("response_format").is_none());
}

#[test]
fn plain_request_omits_optional_sections() {
    let request = CompletionRequest::new("hello", "x-ai/grok-4");
    let json = serde_json::to_value(OpenRouterProvider::build_request(&request)).unwrap();

    assert!(json.get("plugins").is_none());
    assert!(json.get("web_search_options").is_none());
    assert!(json.get("provider").is_none());
}

#[test]
fn json_request_sets_system_prompt_and_format() {
    let request = CompletionRequest::new("Response to evaluate:\n\nhi", "openai/gpt-5-nano")
        .with_system("grade it")
        .with_temperature(0.3)
        .json();
    let json = serde_json::to_value(OpenRouterProvider::build_request(&request)).unwrap();

    assert_eq!(json["messages"][0]["role"], "system");
    assert_eq!(json["messages"][1]["role"], "user");
    assert_eq!(json["response_format"]["type"], "json_object");
    assert_eq!(json["temperature"], 0.3);
}

#[tokio::test]
async fn complete_returns_text_and_usage() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/chat/completions"))
        .and(header("Authorization", "Bearer sk-or-test"))
        .and(body_partial_json(json!({ "model": "openai/gpt-5-nano" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("Acme is #1")))
        .expect(1)
        .mount(&server)
        .await;

    let response = provider(&server)
        .complete(CompletionRequest::new("who leads?", "openai/gpt-5-nano"))
        .await
        .unwrap();

    assert_eq!(response.text, "Acme is #1");
    assert_eq!(response.input_tokens, 12);
    assert_eq!(response.output_tokens, 34);
    assert_eq!(response.model.as_deref(), Some("openai/gpt-5-nano"));
}

#[tokio::test]
async fn missing_usage_defaults_to_zero() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "content": "ok" } }]
        })))
        .mount(&server)
        .await;

    let response = provider(&server)
        .complete(CompletionRequest::new("q", "x-ai/grok-4"))
        .await
        .unwrap();

    assert_eq!(response.input_tokens, 0);
    assert_eq!(response.output_tokens, 0);
}

#[tokio::test]
async fn non_success_status_is_sanitized_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(503).set_body_string("upstream overloaded for key sk-or-v1-leak"),
        )
        .mount(&server)
        .await;

    let err = provider(&server)
        .complete(CompletionRequest::new("q", "x-ai/grok-4"))
        .await
        .unwrap_err()
        .to_string();

    assert!(err.contains("OpenRouter API error (503"));
    assert!(err.contains("[REDACTED]"));
    assert!(!err.contains("sk-or-v1-leak"));
}

#[tokio::test]
async fn error_object_in_success_body_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": { "message": "model is overloaded", "code": 429 }
        })))
        .mount(&server)
        .await;

    let err = provider(&server)
        .complete(CompletionRequest::new("q", "x-ai/grok-4"))
        .await
        .unwrap_err()
        .to_string();

    assert!(err.contains("model is overloaded"));
    assert!(err.contains("429"));
}

#[tokio::test]
async fn empty_content_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("  ")))
        .mount(&server)
        .await;

    let err = provider(&server)
        .complete(CompletionRequest::new("q", "x-ai/grok-4"))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("No response content"));
}

#[tokio::test]
async fn missing_api_key_fails_before_request() {
    let provider = OpenRouterProvider::new(None, "http://127.0.0.1:9", 5);
    let err = provider
        .complete(CompletionRequest::new("q", "x-ai/grok-4"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("API key not set"));
}
