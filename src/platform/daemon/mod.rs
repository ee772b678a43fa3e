use crate::config::Config;
use crate::platform::Services;
use anyhow::Result;
use std::sync::Arc;
use tokio::task::JoinHandle;

mod supervisor;

use supervisor::spawn_supervised_components;

/// Run the gateway, and the internal scheduler ticker when enabled, until
/// ctrl-c. Detached executor and judge work is drained before returning.
pub async fn run(config: Arc<Config>, host: String, port: u16) -> Result<()> {
    let services = Services::from_config(&config).await?;
    crate::diagnostics::health::mark_component_ok("daemon");

    let handles: Vec<JoinHandle<()>> =
        spawn_supervised_components(Arc::clone(&config), &services, host.clone(), port);

    println!("◆ Promptwatch daemon started");
    println!("   Gateway:   http://{host}:{port}");
    if config.scheduler.internal_trigger {
        println!(
            "   Scheduler: every {}s",
            config.scheduler.effective_poll_secs()
        );
    } else {
        println!("   Scheduler: external trigger (POST /scheduler)");
    }
    println!("   Ctrl+C to stop");

    tokio::signal::ctrl_c().await?;
    crate::diagnostics::health::mark_component_error("daemon", "shutdown requested");

    for handle in &handles {
        handle.abort();
    }
    for handle in handles {
        let _ = handle.await;
    }

    tracing::info!("Waiting for in-flight executions to finish");
    services.drain().await;
    Ok(())
}
