use crate::cli::commands::{Cli, Commands};
use anyhow::Result;
use chrono::Utc;
use promptwatch::Config;
use promptwatch::platform::Services;
use promptwatch::platform::cron::{self, JobStore};
use std::sync::Arc;
use tracing::info;

use crate::app::status::render_status;

pub async fn dispatch(cli: Cli, config: Arc<Config>) -> Result<()> {
    match cli.command {
        Commands::Serve { port, host } => {
            config.validate_for_service()?;
            let port = port.unwrap_or(config.gateway.port);
            let host = host.unwrap_or_else(|| config.gateway.host.clone());
            if port == 0 {
                info!("Starting Promptwatch gateway on {host} (random port)");
            } else {
                info!("Starting Promptwatch gateway on {host}:{port}");
            }
            let services = Services::from_config(&config).await?;
            let result = tokio::select! {
                result = promptwatch::transport::gateway::run_gateway(
                    &host,
                    port,
                    &config,
                    services.app_state(),
                ) => result,
                _ = tokio::signal::ctrl_c() => Ok(()),
            };
            services.drain().await;
            result
        }

        Commands::Daemon { port, host } => {
            config.validate_for_service()?;
            let port = port.unwrap_or(config.gateway.port);
            let host = host.unwrap_or_else(|| config.gateway.host.clone());
            info!("Starting Promptwatch daemon on {host}:{port}");
            promptwatch::platform::daemon::run(Arc::clone(&config), host, port).await
        }

        Commands::Tick => {
            config.validate_for_service()?;
            let services = Services::from_config(&config).await?;
            let reports = services.dispatcher.run_cycle(Utc::now()).await?;
            services.drain().await;
            if reports.is_empty() {
                println!("No jobs due");
            } else {
                println!("{}", serde_json::to_string_pretty(&reports)?);
            }
            Ok(())
        }

        Commands::Run { job_id } => {
            config.validate_for_service()?;
            let services = Services::from_config(&config).await?;
            let ack = services.executor.execute(&job_id).await?;
            println!("{}", serde_json::to_string_pretty(&ack)?);
            services.drain().await;

            if let Some(job) = services.store.get_job(&job_id).await? {
                println!(
                    "Job {} finished (consecutive failures: {})",
                    job.id, job.failed_attempts
                );
            }
            Ok(())
        }

        Commands::Status => {
            println!("{}", render_status(&config).await);
            Ok(())
        }

        Commands::Jobs { job_command } => cron::handle_command(job_command, &config).await,

        Commands::Profiles { profile_command } => {
            cron::handle_profile_command(profile_command, &config).await
        }

        Commands::Schedule { schedule_command } => cron::handle_schedule_command(schedule_command),
    }
}
