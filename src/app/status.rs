use promptwatch::Config;
use promptwatch::platform::cron::{LockState, SqliteJobStore};
use std::time::Duration;

fn mark(set: bool) -> &'static str {
    if set { "set" } else { "missing" }
}

fn has_value(value: Option<&String>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

pub async fn render_status(config: &Config) -> String {
    let mut lines = vec![
        "◆ Promptwatch status".to_string(),
        String::new(),
        format!("Version:     {}", env!("CARGO_PKG_VERSION")),
        format!("Config:      {}", config.config_path.display()),
        format!("Database:    {}", config.resolved_database_path().display()),
        String::new(),
        format!(
            "Gateway:     {}:{}",
            config.gateway.host, config.gateway.port
        ),
        format!(
            "Scheduler:   {}",
            if config.scheduler.internal_trigger {
                format!("internal, every {}s", config.scheduler.effective_poll_secs())
            } else {
                "external trigger".to_string()
            }
        ),
        format!(
            "Executor:    {}",
            config
                .scheduler
                .executor_url
                .as_deref()
                .unwrap_or("in-process")
        ),
        format!("Judge model: {}", config.judge.model),
        format!(
            "Secrets:     internal_token={}, openrouter_api_key={}",
            mark(has_value(config.secrets.internal_token.as_ref())),
            mark(has_value(config.secrets.openrouter_api_key.as_ref()))
        ),
        String::new(),
    ];

    match SqliteJobStore::open(&config.resolved_database_path()).await {
        Ok(store) => match store.list_jobs().await {
            Ok(jobs) => {
                let now = chrono::Utc::now();
                let timeout = config.scheduler.stale_lock_timeout();
                let running = jobs
                    .iter()
                    .filter(|j| matches!(LockState::of(j, now, timeout), LockState::Locked { .. }))
                    .count();
                let stale = jobs
                    .iter()
                    .filter(|j| matches!(LockState::of(j, now, timeout), LockState::Stale { .. }))
                    .count();
                let failing = jobs.iter().filter(|j| j.failed_attempts > 0).count();
                lines.push(format!(
                    "Jobs:        {} total, {} active, {running} running, {stale} stale locks, {failing} failing",
                    jobs.len(),
                    jobs.iter().filter(|j| j.is_active).count()
                ));
            }
            Err(e) => lines.push(format!("Jobs:        unavailable ({e})")),
        },
        Err(e) => lines.push(format!("Store:       unavailable ({e})")),
    }

    lines.push(gateway_health(config).await);
    lines.join("\n")
}

async fn gateway_health(config: &Config) -> String {
    let url = format!(
        "http://{}:{}/health",
        config.gateway.host, config.gateway.port
    );
    let client = promptwatch::llm::build_provider_client_with_timeout(2);
    let response = match client.get(&url).timeout(Duration::from_secs(2)).send().await {
        Ok(response) => response,
        Err(_) => return "Health:      gateway not reachable".to_string(),
    };
    match response.json::<serde_json::Value>().await {
        Ok(body) => format!(
            "Health:\n{}",
            serde_json::to_string_pretty(&body).unwrap_or_default()
        ),
        Err(e) => format!("Health:      unreadable response ({e})"),
    }
}
