use crate::config::Config;
use crate::config::schema::MIN_POLL_SECS;
use crate::diagnostics::health;
use crate::platform::cron::{
    BackoffPolicy, DueJob, Job, JobStore, LockState, next_trigger, validate,
};
use crate::platform::executor::{ExecuteStatus, ExecutorDispatch};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::time::{self, Duration};

const COMPONENT: &str = "scheduler";

#[derive(Debug, Clone)]
pub struct DispatcherSettings {
    pub stale_lock_timeout: chrono::Duration,
    pub backoff: BackoffPolicy,
}

impl DispatcherSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            stale_lock_timeout: config.scheduler.stale_lock_timeout(),
            backoff: BackoffPolicy {
                cap_minutes: config.scheduler.backoff_cap_minutes,
                ceiling: config.scheduler.backoff_ceiling,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DispatchStatus {
    Scheduled,
    Running,
    Backoff,
    ExecutorErrorRetryable,
    ExecutorErrorTerminal,
    FailedUpdate,
    Error,
}

/// Operational outcome for one due job in one cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub job_id: String,
    pub status: DispatchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution: Option<ExecuteStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_run_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DispatchReport {
    fn new(job: &Job, status: DispatchStatus) -> Self {
        Self::for_id(&job.id, status)
    }

    fn for_id(job_id: &str, status: DispatchStatus) -> Self {
        Self {
            job_id: job_id.to_string(),
            status,
            execution: None,
            next_run_at: None,
            retry_at: None,
            error: None,
        }
    }

    fn with_error(mut self, error: impl ToString) -> Self {
        self.error = Some(error.to_string());
        self
    }

    fn is_failure(&self) -> bool {
        matches!(
            self.status,
            DispatchStatus::FailedUpdate | DispatchStatus::Error
        )
    }
}

/// One pass over the due jobs. Jobs are handled one after another and
/// a failure for one job never stops the rest.
pub struct Dispatcher {
    store: Arc<dyn JobStore>,
    executor: Arc<dyn ExecutorDispatch>,
    settings: DispatcherSettings,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn JobStore>,
        executor: Arc<dyn ExecutorDispatch>,
        settings: DispatcherSettings,
    ) -> Self {
        Self {
            store,
            executor,
            settings,
        }
    }

    pub async fn run_cycle(&self, now: DateTime<Utc>) -> Result<Vec<DispatchReport>> {
        let jobs = self.store.due_jobs(now).await?;
        if jobs.is_empty() {
            tracing::debug!("no jobs due");
            return Ok(Vec::new());
        }

        let mut reports = Vec::with_capacity(jobs.len());
        for due in &jobs {
            let report = match due {
                DueJob::Ready(job) => self.dispatch_job(job, now).await,
                DueJob::Malformed { job_id, error } => {
                    DispatchReport::for_id(job_id, DispatchStatus::Error).with_error(error)
                }
            };
            tracing::info!(
                job_id = %report.job_id,
                status = %report.status,
                error = report.error.as_deref().unwrap_or(""),
                "dispatch result"
            );
            reports.push(report);
        }
        Ok(reports)
    }

    async fn dispatch_job(&self, job: &Job, now: DateTime<Utc>) -> DispatchReport {
        if LockState::of(job, now, self.settings.stale_lock_timeout).is_fresh() {
            return DispatchReport::new(job, DispatchStatus::Running);
        }

        let backoff = &self.settings.backoff;
        if let Some(retry_at) = backoff.blocking_until(job.failed_attempts, job.last_failure_at, now)
        {
            return DispatchReport {
                retry_at: Some(retry_at),
                ..DispatchReport::new(job, DispatchStatus::Backoff)
            };
        }
        if backoff.ceiling_reached(job.failed_attempts) {
            tracing::info!(
                job_id = %job.id,
                failed_attempts = job.failed_attempts,
                "backoff ceiling reached; resuming cron cadence"
            );
        }

        if let Err(error) = validate(&job.schedule_cron) {
            return DispatchReport::new(job, DispatchStatus::Error).with_error(error);
        }

        let mut report = match self.executor.dispatch(&job.id).await {
            Ok(ack) => DispatchReport {
                execution: Some(ack.status),
                ..DispatchReport::new(job, DispatchStatus::Scheduled)
            },
            Err(failure) if failure.is_retryable() => {
                return DispatchReport::new(job, DispatchStatus::ExecutorErrorRetryable)
                    .with_error(failure);
            }
            Err(failure) => {
                DispatchReport::new(job, DispatchStatus::ExecutorErrorTerminal).with_error(failure)
            }
        };

        let next = match next_trigger(&job.schedule_cron, now) {
            Ok(next) => next,
            Err(error) => {
                report.status = DispatchStatus::Error;
                return report.with_error(error);
            }
        };
        if let Err(error) = self.store.set_next_run(&job.id, next).await {
            report.status = DispatchStatus::FailedUpdate;
            return report.with_error(error);
        }
        report.next_run_at = Some(next);
        report
    }
}

/// Internal trigger: run a cycle every `poll_secs`.
pub async fn run(dispatcher: Arc<Dispatcher>, poll_secs: u64) -> Result<()> {
    let mut interval = time::interval(Duration::from_secs(poll_secs.max(MIN_POLL_SECS)));
    health::mark_component_ok(COMPONENT);

    loop {
        interval.tick().await;

        match dispatcher.run_cycle(Utc::now()).await {
            Ok(reports) => {
                if let Some(failed) = reports.iter().find(|r| r.is_failure()) {
                    health::mark_component_error(
                        COMPONENT,
                        format!("job {} {}", failed.job_id, failed.status),
                    );
                } else {
                    health::mark_component_ok(COMPONENT);
                }
            }
            Err(e) => {
                health::mark_component_error(COMPONENT, e.to_string());
                tracing::warn!("Scheduler query failed: {e}");
            }
        }
    }
}
