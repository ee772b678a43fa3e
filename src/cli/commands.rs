use clap::{Parser, Subcommand};
use promptwatch::commands::{JobCommands, ProfileCommands, ScheduleCommands};

/// `Promptwatch` - scheduled LLM prompt monitoring with judged evaluations.
#[derive(Parser, Debug)]
#[command(name = "promptwatch")]
#[command(version)]
#[command(about = "Run monitoring prompts against LLMs on a schedule.", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP gateway only (an external trigger drives /scheduler)
    Serve {
        /// Port to listen on (use 0 for random available port)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,
    },

    /// Start the supervised runtime (gateway + internal scheduler ticker)
    Daemon {
        /// Port to listen on (use 0 for random available port)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,
    },

    /// Run one scheduler cycle now and print the report
    Tick,

    /// Execute a job immediately and wait for it to finish
    Run {
        /// Job ID
        job_id: String,
    },

    /// Show configuration, store summary and gateway health
    Status,

    /// Manage monitoring jobs
    Jobs {
        #[command(subcommand)]
        job_command: JobCommands,
    },

    /// Manage account profiles, plans and credits
    Profiles {
        #[command(subcommand)]
        profile_command: ProfileCommands,
    },

    /// Inspect cron expressions
    Schedule {
        #[command(subcommand)]
        schedule_command: ScheduleCommands,
    },
}
