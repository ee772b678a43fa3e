mod backoff;
mod expression;
mod lock;
mod repository;
mod types;

pub mod scheduler;

pub use backoff::BackoffPolicy;
pub(crate) use expression::format_timestamp;
pub use expression::{
    MAX_ALIGNED_DAY_OF_MONTH, ScheduleKind, aligned_expression, classify, describe, next_trigger,
    validate,
};
pub use lock::{AcquireOutcome, LockObservation, LockState, try_acquire};
pub use repository::{JobStore, SqliteJobStore, StoreFuture};
pub use scheduler::{DispatchReport, DispatchStatus, Dispatcher, DispatcherSettings};
pub use types::{
    DueJob, Evaluation, Job, NewEvaluation, NewJob, NewRun, Profile, Rule, RuleType, Run, RunOutcome,
    Target,
};

use crate::commands::{JobCommands, ProfileCommands, ScheduleCommands};
use crate::config::Config;
use crate::platform::plans::{
    PlanTier, estimate_monthly_runs, is_model_allowed, is_schedule_allowed, schedule_tiers,
};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

async fn open_store(config: &Config) -> Result<SqliteJobStore> {
    SqliteJobStore::open(&config.resolved_database_path()).await
}

fn display_time(at: Option<DateTime<Utc>>) -> String {
    at.map_or_else(|| "now".into(), |d| d.to_rfc3339())
}

pub async fn handle_command(command: JobCommands, config: &Config) -> Result<()> {
    let store = open_store(config).await?;
    match command {
        JobCommands::List => {
            let jobs = store.list_jobs().await?;
            if jobs.is_empty() {
                println!("No monitoring jobs yet.");
                println!("\nUsage:");
                println!(
                    "  promptwatch jobs add --owner <profile> --query 'best CRM for startups' \\\n      --schedule '0 9 * * *' --target openai/gpt-5-nano --target perplexity/sonar:search"
                );
                return Ok(());
            }

            println!("Jobs ({}):", jobs.len());
            for job in jobs {
                let state = if job.is_running {
                    "running"
                } else if job.is_active {
                    "active"
                } else {
                    "paused"
                };
                let next = if job.is_scheduled() {
                    display_time(job.next_run_at)
                } else {
                    "manual".into()
                };
                println!(
                    "- {} | {} | {} | next={} | failures={}\n    query: {}\n    targets: {}",
                    job.id,
                    describe(&job.schedule_cron),
                    state,
                    next,
                    job.failed_attempts,
                    job.query_text,
                    job.targets
                        .iter()
                        .map(|t| if t.web_search {
                            format!("{} (search)", t.model)
                        } else {
                            t.model.clone()
                        })
                        .collect::<Vec<_>>()
                        .join(", ")
                );
            }
            Ok(())
        }
        JobCommands::Add {
            owner,
            query,
            schedule,
            targets,
            paused,
        } => {
            let profile = store
                .get_profile(&owner)
                .await?
                .with_context(|| format!("Profile '{owner}' not found"))?;
            let targets = targets
                .iter()
                .map(|raw| raw.parse::<Target>().map_err(anyhow::Error::msg))
                .collect::<Result<Vec<_>>>()?;

            if !is_schedule_allowed(&schedule, profile.plan) {
                anyhow::bail!(
                    "{} schedules are not available on the {} plan",
                    classify(&schedule),
                    profile.plan
                );
            }
            if let Some(target) = targets
                .iter()
                .find(|t| !is_model_allowed(&t.model, profile.plan))
            {
                anyhow::bail!(
                    "Model {} is not available on the {} plan",
                    target.model,
                    profile.plan
                );
            }

            let job = store
                .create_job(NewJob {
                    user_id: profile.id,
                    query_text: query,
                    schedule_cron: schedule,
                    targets,
                    is_active: !paused,
                })
                .await?;
            println!("Added job {}", job.id);
            println!("  Schedule: {}", describe(&job.schedule_cron));
            if job.is_scheduled() {
                println!("  Next    : {}", display_time(job.next_run_at));
            }
            println!("  Targets : {}", job.targets.len());
            Ok(())
        }
        JobCommands::Remove { id } => {
            store.delete_job(&id).await?;
            println!("Removed job {id}");
            Ok(())
        }
        JobCommands::Pause { id } => {
            store.set_job_active(&id, false).await?;
            println!("Paused job {id}");
            Ok(())
        }
        JobCommands::Resume { id } => {
            store.set_job_active(&id, true).await?;
            println!("Resumed job {id}");
            Ok(())
        }
        JobCommands::Rule {
            job_id,
            name,
            description,
            rule_type,
        } => {
            let rule_type = rule_type
                .parse::<RuleType>()
                .map_err(|_| anyhow::anyhow!("Unknown rule type '{rule_type}'"))?;
            store
                .get_job(&job_id)
                .await?
                .with_context(|| format!("Job '{job_id}' not found"))?;
            let rule = store
                .add_rule(&job_id, &name, &description, rule_type)
                .await?;
            println!("Added {} rule {} to job {job_id}", rule.rule_type, rule.id);
            Ok(())
        }
        JobCommands::Runs { job_id } => {
            let runs = store.runs_for_job(&job_id).await?;
            if runs.is_empty() {
                println!("No runs recorded for job {job_id}.");
                return Ok(());
            }
            for run in runs {
                println!(
                    "- {} | {} | {}{} | tokens in={} out={}",
                    run.id,
                    run.executed_at.to_rfc3339(),
                    run.model_used,
                    if run.web_search_enabled {
                        " (search)"
                    } else {
                        ""
                    },
                    run.input_tokens,
                    run.output_tokens
                );
                for evaluation in store.evaluations_for_run(&run.id).await? {
                    println!(
                        "    rule {} score={} {}",
                        evaluation.rule_id, evaluation.score, evaluation.reasoning
                    );
                }
            }
            Ok(())
        }
    }
}

pub async fn handle_profile_command(command: ProfileCommands, config: &Config) -> Result<()> {
    let store = open_store(config).await?;
    match command {
        ProfileCommands::List => {
            let profiles = store.list_profiles().await?;
            if profiles.is_empty() {
                println!("No profiles yet.");
                return Ok(());
            }
            for profile in profiles {
                println!(
                    "- {} | {} | plan={} | credits={}",
                    profile.id,
                    profile.email.as_deref().unwrap_or("-"),
                    profile.plan,
                    profile.credits_balance
                );
            }
            Ok(())
        }
        ProfileCommands::Add {
            email,
            plan,
            credits,
        } => {
            let plan = parse_plan(&plan)?;
            let credits = credits.unwrap_or_else(|| plan.monthly_credits());
            let profile = store.create_profile(email.as_deref(), plan, credits).await?;
            println!(
                "Added profile {} (plan={}, credits={})",
                profile.id, profile.plan, profile.credits_balance
            );
            Ok(())
        }
        ProfileCommands::Plan { id, plan } => {
            let plan = parse_plan(&plan)?;
            store.set_plan(&id, plan).await?;
            println!("Profile {id} is now on the {plan} plan");
            Ok(())
        }
        ProfileCommands::Grant { id, amount } => {
            let balance = store.grant_credits(&id, amount).await?;
            println!("Profile {id} balance: {balance}");
            Ok(())
        }
    }
}

pub fn handle_schedule_command(command: ScheduleCommands) -> Result<()> {
    match command {
        ScheduleCommands::Classify { expression } => {
            let kind = classify(&expression);
            if kind != ScheduleKind::Manual {
                validate(&expression)?;
            }
            let tiers = schedule_tiers(kind)
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            println!("{kind}: {}", describe(&expression));
            println!("  Plans     : {tiers}");
            println!("  Runs/month: {}", estimate_monthly_runs(&expression));
            Ok(())
        }
        ScheduleCommands::Next { expression, count } => {
            let mut from = Utc::now();
            for _ in 0..count.max(1) {
                from = next_trigger(&expression, from)?;
                println!("{}", from.to_rfc3339());
            }
            Ok(())
        }
        ScheduleCommands::Align { kind, at } => {
            let kind = kind
                .parse::<ScheduleKind>()
                .map_err(|_| anyhow::anyhow!("Unknown schedule kind '{kind}'"))?;
            let at = match at {
                Some(raw) => DateTime::parse_from_rfc3339(&raw)
                    .with_context(|| format!("Invalid RFC 3339 time '{raw}'"))?
                    .with_timezone(&Utc),
                None => Utc::now(),
            };
            let expression = aligned_expression(kind, at)
                .with_context(|| format!("{kind} schedules have no aligned form"))?;
            println!("{expression}");
            Ok(())
        }
    }
}

fn parse_plan(raw: &str) -> Result<PlanTier> {
    raw.parse::<PlanTier>()
        .map_err(|_| anyhow::anyhow!("Unknown plan '{raw}' (expected free, pro or enterprise)"))
}
