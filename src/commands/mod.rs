use clap::Subcommand;

/// Monitoring job subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum JobCommands {
    /// List all jobs with their scheduling state
    List,
    /// Create a monitoring job
    Add {
        /// Owning profile id
        #[arg(long)]
        owner: String,
        /// Prompt sent to every target model
        #[arg(long)]
        query: String,
        /// 5-field cron expression (omit for manual-only)
        #[arg(long, default_value = "")]
        schedule: String,
        /// Target as `model` or `model:search` (repeatable)
        #[arg(long = "target", required = true)]
        targets: Vec<String>,
        /// Create the job paused
        #[arg(long)]
        paused: bool,
    },
    /// Delete a job with its rules, runs and evaluations
    Remove {
        /// Job ID
        id: String,
    },
    /// Stop scheduling a job
    Pause {
        /// Job ID
        id: String,
    },
    /// Resume scheduling a paused job
    Resume {
        /// Job ID
        id: String,
    },
    /// Attach a grading rule to a job
    Rule {
        /// Job ID
        job_id: String,
        /// Short rule name
        #[arg(long)]
        name: String,
        /// Criterion the judge grades against
        #[arg(long)]
        description: String,
        /// binary, ranking or sentiment
        #[arg(long = "type", default_value = "binary")]
        rule_type: String,
    },
    /// Show recorded runs and their evaluations
    Runs {
        /// Job ID
        job_id: String,
    },
}

/// Profile subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ProfileCommands {
    /// List profiles with plan and credit balance
    List,
    /// Create a profile
    Add {
        #[arg(long)]
        email: Option<String>,
        /// free, pro or enterprise
        #[arg(long, default_value = "free")]
        plan: String,
        /// Starting balance (defaults to the plan's monthly allowance)
        #[arg(long)]
        credits: Option<i64>,
    },
    /// Change a profile's plan
    Plan {
        /// Profile ID
        id: String,
        /// free, pro or enterprise
        plan: String,
    },
    /// Add credits to a profile
    Grant {
        /// Profile ID
        id: String,
        amount: i64,
    },
}

/// Schedule expression subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleCommands {
    /// Classify an expression and show which plans may use it
    Classify {
        /// 5-field cron expression
        expression: String,
    },
    /// Print upcoming trigger times
    Next {
        /// 5-field cron expression
        expression: String,
        #[arg(short, long, default_value_t = 3)]
        count: usize,
    },
    /// Build a daily/weekly/monthly expression aligned to a time
    Align {
        /// manual, daily, weekly or monthly
        kind: String,
        /// RFC 3339 anchor (defaults to now)
        #[arg(long)]
        at: Option<String>,
    },
}
