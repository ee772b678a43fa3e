use promptwatch::config::Config;
use promptwatch::platform::Services;
use promptwatch::platform::cron::{JobStore, NewJob, RuleType, SqliteJobStore, Target};
use promptwatch::platform::plans::PlanTier;
use promptwatch::transport::gateway::run_gateway_with_listener;
use reqwest::StatusCode;
use serde_json::{Value, json};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "integration-token";

struct GatewayTestServer {
    port: u16,
    store: SqliteJobStore,
    handle: tokio::task::JoinHandle<anyhow::Result<()>>,
    _workspace: TempDir,
}

impl GatewayTestServer {
    async fn start(upstream: &MockServer) -> Self {
        let workspace = TempDir::new().expect("temp workspace should be created");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("ephemeral gateway listener should bind");
        let port = listener
            .local_addr()
            .expect("ephemeral gateway listener should expose local address")
            .port();

        let mut config = Config::default();
        config.workspace_dir = workspace.path().to_path_buf();
        config.config_path = workspace.path().join("config.toml");
        config.database_path = Some(workspace.path().join("promptwatch.db"));
        config.secrets.internal_token = Some(TOKEN.to_string());
        config.secrets.openrouter_api_key = Some("sk-or-test".to_string());
        config.executor.openrouter_base_url = format!("{}/api/v1", upstream.uri());

        let services = Services::from_config(&config)
            .await
            .expect("services should build");
        let store = SqliteJobStore::open(&config.resolved_database_path())
            .await
            .expect("second store handle should open");

        let host = "127.0.0.1".to_string();
        let state = services.app_state();
        let handle = tokio::spawn(async move {
            run_gateway_with_listener(&host, listener, &config, state).await
        });

        wait_until_gateway_ready(port).await;

        Self {
            port,
            store,
            handle,
            _workspace: workspace,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{path}", self.port)
    }

    async fn post(&self, path: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        let mut request = reqwest::Client::new().post(self.url(path)).json(&body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.expect("request should complete");
        let status = response.status();
        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        (status, body)
    }

    async fn seed_manual_job(&self, credits: i64) -> (String, String) {
        let profile = self
            .store
            .create_profile(Some("owner@example.com"), PlanTier::Free, credits)
            .await
            .unwrap();
        let job = self
            .store
            .create_job(NewJob {
                user_id: profile.id.clone(),
                query_text: "best CRM for startups".into(),
                schedule_cron: String::new(),
                targets: vec![Target {
                    model: "openai/gpt-5-nano".into(),
                    web_search: false,
                }],
                is_active: true,
            })
            .await
            .unwrap();
        self.store
            .add_rule(&job.id, "mentions Acme", "Mentions Acme by name", RuleType::Binary)
            .await
            .unwrap();
        (profile.id, job.id)
    }
}

impl Drop for GatewayTestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn wait_until_gateway_ready(port: u16) {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(200))
        .build()
        .expect("reqwest client should be built");

    for _ in 0..80 {
        let health = client
            .get(format!("http://127.0.0.1:{port}/health"))
            .send()
            .await;
        if health.is_ok_and(|r| r.status().is_success()) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("gateway did not become ready on port {port}");
}

async fn mock_upstream() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "openai/gpt-5-nano",
            "choices": [{ "message": {
                "role": "assistant",
                "content": "{\"score\": 1, \"reasoning\": \"Acme is named\"}"
            } }],
            "usage": { "prompt_tokens": 12, "completion_tokens": 34 }
        })))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn health_is_public() {
    let upstream = mock_upstream().await;
    let server = GatewayTestServer::start(&upstream).await;

    let response = reqwest::get(server.url("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert!(body["components"]["gateway"].is_object());
}

#[tokio::test]
async fn internal_routes_require_bearer_token() {
    let upstream = mock_upstream().await;
    let server = GatewayTestServer::start(&upstream).await;

    for route in ["/scheduler", "/executor", "/judge"] {
        let (status, _) = server.post(route, None, json!({})).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{route} without token");
        let (status, _) = server.post(route, Some("wrong"), json!({})).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{route} with wrong token");
    }
}

#[tokio::test]
async fn scheduler_reports_empty_cycle() {
    let upstream = mock_upstream().await;
    let server = GatewayTestServer::start(&upstream).await;

    let (status, body) = server.post("/scheduler", Some(TOKEN), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "No jobs due");
    assert_eq!(body["processed"], json!([]));
}

#[tokio::test]
async fn executor_rejects_bad_requests() {
    let upstream = mock_upstream().await;
    let server = GatewayTestServer::start(&upstream).await;

    let (status, body) = server
        .post("/executor", Some(TOKEN), json!({ "job_id": "missing" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);

    let (status, _) = server
        .post("/executor", Some(TOKEN), json!({ "wrong": 1 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = server
        .post("/judge", Some(TOKEN), json!({ "run_id": "missing" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn executor_rejects_exhausted_profile() {
    let upstream = mock_upstream().await;
    let server = GatewayTestServer::start(&upstream).await;
    let (_, job_id) = server.seed_manual_job(0).await;

    let (status, body) = server
        .post("/executor", Some(TOKEN), json!({ "job_id": job_id }))
        .await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn executor_runs_job_end_to_end() {
    let upstream = mock_upstream().await;
    let server = GatewayTestServer::start(&upstream).await;
    let (profile_id, job_id) = server.seed_manual_job(2).await;

    let (status, body) = server
        .post("/executor", Some(TOKEN), json!({ "job_id": job_id }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "started");
    assert_eq!(body["job_id"], job_id.as_str());

    let mut evaluated = false;
    for _ in 0..100 {
        let runs = server.store.runs_for_job(&job_id).await.unwrap();
        if let Some(run) = runs.first() {
            let evaluations = server.store.evaluations_for_run(&run.id).await.unwrap();
            if !evaluations.is_empty() {
                assert!((evaluations[0].score - 1.0).abs() < f64::EPSILON);
                evaluated = true;
                break;
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(evaluated, "run should be recorded and judged");

    let mut settled = false;
    for _ in 0..100 {
        let profile = server.store.get_profile(&profile_id).await.unwrap().unwrap();
        let job = server.store.get_job(&job_id).await.unwrap().unwrap();
        if profile.credits_balance == 1 && !job.is_running {
            assert_eq!(job.failed_attempts, 0);
            settled = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(settled, "credit should be charged and the lock released");
}
