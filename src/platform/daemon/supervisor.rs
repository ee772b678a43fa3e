use crate::config::Config;
use crate::platform::Services;
use crate::platform::cron::scheduler;
use anyhow::Result;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::Duration;

pub(super) fn spawn_component_supervisor<F, Fut>(
    name: &'static str,
    initial_backoff_secs: u64,
    max_backoff_secs: u64,
    max_restarts: u32,
    mut run_component: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        let mut backoff = initial_backoff_secs.max(1);
        let max_backoff = max_backoff_secs.max(backoff);
        let mut consecutive_failures: u32 = 0;

        loop {
            tracing::info!("Daemon component '{name}' starting");
            crate::diagnostics::health::mark_component_starting(name);
            match run_component().await {
                Ok(()) => {
                    tracing::warn!("Daemon component '{name}' exited unexpectedly");
                    backoff = initial_backoff_secs.max(1);
                    consecutive_failures = consecutive_failures.saturating_add(1);
                }
                Err(e) => {
                    tracing::error!("Daemon component '{name}' failed: {e}");
                    crate::diagnostics::health::mark_component_error(name, e.to_string());
                    consecutive_failures = consecutive_failures.saturating_add(1);
                }
            }

            if max_restarts > 0 && consecutive_failures > max_restarts {
                tracing::error!(
                    "Daemon component '{name}' exceeded max restarts ({max_restarts}), circuit open"
                );
                break;
            }
            crate::diagnostics::health::bump_component_restart(name);
            tokio::time::sleep(Duration::from_secs(backoff)).await;
            backoff = backoff.saturating_mul(2).min(max_backoff);
        }
    })
}

pub(super) fn spawn_supervised_components(
    config: Arc<Config>,
    services: &Services,
    host: String,
    port: u16,
) -> Vec<JoinHandle<()>> {
    let initial_backoff = config.reliability.component_initial_backoff_secs.max(1);
    let max_backoff = config
        .reliability
        .component_max_backoff_secs
        .max(initial_backoff);
    let max_restarts = config.reliability.component_max_restarts;
    let mut handles = Vec::new();

    let gateway_cfg = Arc::clone(&config);
    let gateway_services = services.clone();
    handles.push(spawn_component_supervisor(
        "gateway",
        initial_backoff,
        max_backoff,
        max_restarts,
        move || {
            let cfg = Arc::clone(&gateway_cfg);
            let state = gateway_services.app_state();
            let host = host.clone();
            async move { crate::transport::gateway::run_gateway(&host, port, &cfg, state).await }
        },
    ));

    if config.scheduler.internal_trigger {
        let dispatcher = Arc::clone(&services.dispatcher);
        let poll_secs = config.scheduler.effective_poll_secs();
        handles.push(spawn_component_supervisor(
            "scheduler",
            initial_backoff,
            max_backoff,
            max_restarts,
            move || scheduler::run(Arc::clone(&dispatcher), poll_secs),
        ));
    } else {
        tracing::info!("Internal scheduler disabled; expecting external POST /scheduler");
    }

    handles
}
