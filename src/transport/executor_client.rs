//! Dispatch to an executor running behind its own gateway.

use crate::llm::build_provider_client_with_timeout;
use crate::platform::executor::{DispatchFailure, DispatchFuture, ExecuteAck, ExecutorDispatch};
use reqwest::Client;

/// POSTs `{job_id}` to a remote `/executor` endpoint with the internal token.
pub struct HttpExecutorClient {
    endpoint: String,
    auth_header: String,
    client: Client,
}

impl HttpExecutorClient {
    pub fn new(endpoint: &str, internal_token: &str, timeout_secs: u64) -> Self {
        Self {
            endpoint: endpoint.trim().to_string(),
            auth_header: format!("Bearer {internal_token}"),
            client: build_provider_client_with_timeout(timeout_secs),
        }
    }

    async fn post(&self, job_id: &str) -> Result<ExecuteAck, DispatchFailure> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", &self.auth_header)
            .json(&serde_json::json!({ "job_id": job_id }))
            .send()
            .await
            .map_err(|e| DispatchFailure::transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<ExecuteAck>()
                .await
                .map_err(|e| DispatchFailure::transport(format!("invalid executor reply: {e}")));
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|json| json.get("error").and_then(|e| e.as_str()).map(str::to_string))
            .unwrap_or_else(|| crate::llm::sanitize_api_error(&body));
        Err(DispatchFailure::from_status(status.as_u16(), message))
    }
}

impl ExecutorDispatch for HttpExecutorClient {
    fn dispatch<'a>(&'a self, job_id: &'a str) -> DispatchFuture<'a> {
        Box::pin(self.post(job_id))
    }
}
