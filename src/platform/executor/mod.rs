//! Job execution.
//!
//! `execute` does the synchronous part (load, lock check, credit check,
//! conditional acquire) and acknowledges. Everything after that runs on a
//! detached task that visits each target in order, records runs, hands them
//! to the judge and finally settles the job. Every exit path of the detached
//! task releases the lock, including a panic inside target processing.

mod dispatch;

pub use dispatch::{DispatchFailure, DispatchFuture, ExecutorDispatch};

use crate::config::Config;
use crate::error::ExecutorError;
use crate::llm::{CompletionRequest, Provider};
use crate::platform::cron::{
    AcquireOutcome, Job, JobStore, LockState, NewRun, Profile, RunOutcome, Target, try_acquire,
};
use crate::platform::judge::Judge;
use crate::platform::plans::{PlanTier, is_model_allowed};
use chrono::Utc;
use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::task::TaskTracker;

#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    pub stale_lock_timeout: chrono::Duration,
    pub model_timeout: Duration,
}

impl ExecutorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            stale_lock_timeout: config.scheduler.stale_lock_timeout(),
            model_timeout: Duration::from_secs(config.executor.model_timeout_secs.max(1)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ExecuteStatus {
    Started,
    AlreadyRunning,
}

/// Synchronous acknowledgement returned before any target runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteAck {
    pub success: bool,
    pub status: ExecuteStatus,
    pub job_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ExecuteAck {
    fn started(job_id: &str) -> Self {
        Self {
            success: true,
            status: ExecuteStatus::Started,
            job_id: job_id.to_string(),
            message: Some("Execution started".into()),
        }
    }

    fn already_running(job_id: &str) -> Self {
        Self {
            success: true,
            status: ExecuteStatus::AlreadyRunning,
            job_id: job_id.to_string(),
            message: Some("Job is already running".into()),
        }
    }
}

/// Per-target result collected by the detached phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetOutcome {
    pub model: String,
    pub web_search: bool,
    pub run_id: Option<String>,
    pub error: Option<String>,
}

impl TargetOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Clone)]
pub struct Executor {
    store: Arc<dyn JobStore>,
    provider: Arc<dyn Provider>,
    judge: Judge,
    settings: ExecutorSettings,
    tasks: TaskTracker,
}

impl Executor {
    pub fn new(
        store: Arc<dyn JobStore>,
        provider: Arc<dyn Provider>,
        judge: Judge,
        settings: ExecutorSettings,
    ) -> Self {
        Self {
            store,
            provider,
            judge,
            settings,
            tasks: TaskTracker::new(),
        }
    }

    pub fn judge(&self) -> &Judge {
        &self.judge
    }

    /// Acquire the job's lock and start the detached phase. Returns as soon
    /// as the lock outcome is known.
    pub async fn execute(&self, job_id: &str) -> Result<ExecuteAck, ExecutorError> {
        let job_id = job_id.trim();
        if job_id.is_empty() {
            return Err(ExecutorError::InvalidRequest("job_id is required".into()));
        }

        let job = self.load_job(job_id).await?;
        let now = Utc::now();

        if LockState::of(&job, now, self.settings.stale_lock_timeout).is_fresh() {
            tracing::info!(job_id = %job.id, "job already running");
            return Ok(ExecuteAck::already_running(&job.id));
        }

        let profile = self.load_profile(&job.user_id).await?;
        if profile.credits_balance <= 0 {
            return Err(ExecutorError::InsufficientCredits {
                profile_id: profile.id,
            });
        }

        let acquired = try_acquire(
            self.store.as_ref(),
            &job,
            now,
            self.settings.stale_lock_timeout,
        )
        .await
        .map_err(|e| ExecutorError::Persistence(e.to_string()))?;
        if acquired == AcquireOutcome::AlreadyRunning {
            tracing::info!(job_id = %job.id, "lost lock race; job already running");
            return Ok(ExecuteAck::already_running(&job.id));
        }

        tracing::info!(job_id = %job.id, targets = job.targets.len(), "execution started");
        let executor = self.clone();
        let detached_job_id = job.id.clone();
        self.tasks.spawn(async move {
            executor.run_detached(&detached_job_id).await;
        });

        Ok(ExecuteAck::started(&job.id))
    }

    /// Wait until every detached phase started so far has finished.
    pub async fn wait_idle(&self) {
        self.tasks.close();
        self.tasks.wait().await;
        self.tasks.reopen();
    }

    async fn load_job(&self, job_id: &str) -> Result<Job, ExecutorError> {
        self.store
            .get_job(job_id)
            .await
            .map_err(|e| ExecutorError::Persistence(e.to_string()))?
            .ok_or_else(|| ExecutorError::NotFound(format!("job {job_id}")))
    }

    async fn load_profile(&self, profile_id: &str) -> Result<Profile, ExecutorError> {
        self.store
            .get_profile(profile_id)
            .await
            .map_err(|e| ExecutorError::Persistence(e.to_string()))?
            .ok_or_else(|| ExecutorError::NotFound(format!("profile {profile_id}")))
    }

    async fn run_detached(&self, job_id: &str) {
        let result = AssertUnwindSafe(self.run_targets(job_id)).catch_unwind().await;
        let outcome = match result {
            Ok(Ok(outcomes)) if outcomes.iter().all(TargetOutcome::succeeded) => {
                tracing::info!(job_id, targets = outcomes.len(), "all targets succeeded");
                RunOutcome::Succeeded
            }
            Ok(Ok(outcomes)) => {
                let failed = outcomes.iter().filter(|o| !o.succeeded()).count();
                tracing::warn!(job_id, failed, targets = outcomes.len(), "job finished with failed targets");
                RunOutcome::Failed
            }
            Ok(Err(error)) => {
                tracing::error!(job_id, error = %error, "job execution aborted");
                RunOutcome::Failed
            }
            Err(_) => {
                tracing::error!(job_id, "job execution panicked");
                RunOutcome::Failed
            }
        };
        self.settle(job_id, outcome).await;
    }

    /// Re-validate the job and visit each target in order. Per-target
    /// failures are collected, never propagated.
    async fn run_targets(&self, job_id: &str) -> Result<Vec<TargetOutcome>, ExecutorError> {
        let job = self.load_job(job_id).await?;
        let profile = self.load_profile(&job.user_id).await?;
        if profile.credits_balance <= 0 {
            return Err(ExecutorError::InsufficientCredits {
                profile_id: profile.id,
            });
        }
        if job.targets.is_empty() {
            return Err(ExecutorError::NoTargets(job.id));
        }

        let mut outcomes = Vec::with_capacity(job.targets.len());
        for target in &job.targets {
            let outcome = match self.run_target(&job, target, profile.plan).await {
                Ok(run_id) => TargetOutcome {
                    model: target.model.clone(),
                    web_search: target.web_search,
                    run_id: Some(run_id),
                    error: None,
                },
                Err(error) => {
                    tracing::warn!(
                        job_id = %job.id,
                        model = %target.model,
                        error = %error,
                        "target failed"
                    );
                    TargetOutcome {
                        model: target.model.clone(),
                        web_search: target.web_search,
                        run_id: None,
                        error: Some(error.to_string()),
                    }
                }
            };
            outcomes.push(outcome);
        }

        if outcomes.iter().all(TargetOutcome::succeeded) {
            match self
                .store
                .decrement_credits_if_available(&profile.id, 1)
                .await
            {
                Ok(Some(balance)) => {
                    tracing::info!(job_id = %job.id, profile_id = %profile.id, balance, "credit charged");
                }
                Ok(None) => tracing::warn!(
                    job_id = %job.id,
                    profile_id = %profile.id,
                    "no credit available to charge after successful execution"
                ),
                Err(error) => tracing::error!(
                    job_id = %job.id,
                    profile_id = %profile.id,
                    error = %error,
                    "failed to charge credit"
                ),
            }
        }

        Ok(outcomes)
    }

    async fn run_target(
        &self,
        job: &Job,
        target: &Target,
        tier: PlanTier,
    ) -> Result<String, ExecutorError> {
        if !is_model_allowed(&target.model, tier) {
            return Err(ExecutorError::ModelDisallowed {
                model: target.model.clone(),
                tier: tier.to_string(),
            });
        }

        let web_search = target.web_search.then(|| tier.search_context_size());
        let request =
            CompletionRequest::new(&job.query_text, &target.model).with_web_search(web_search);
        let response =
            match tokio::time::timeout(self.settings.model_timeout, self.provider.complete(request))
                .await
            {
                Ok(Ok(response)) => response,
                Ok(Err(error)) => {
                    return Err(ExecutorError::UpstreamExecution {
                        model: target.model.clone(),
                        message: error.to_string(),
                    });
                }
                Err(_) => {
                    return Err(ExecutorError::UpstreamExecution {
                        model: target.model.clone(),
                        message: format!(
                            "timed out after {}s",
                            self.settings.model_timeout.as_secs()
                        ),
                    });
                }
            };

        let run = self
            .store
            .insert_run(NewRun {
                job_id: job.id.clone(),
                model_used: target.model.clone(),
                web_search_enabled: target.web_search,
                response_text: Some(response.text),
                input_tokens: i64::try_from(response.input_tokens).unwrap_or(i64::MAX),
                output_tokens: i64::try_from(response.output_tokens).unwrap_or(i64::MAX),
            })
            .await
            .map_err(|e| ExecutorError::Persistence(e.to_string()))?;

        if let Err(error) = self.judge.dispatch(&run.id).await {
            tracing::warn!(job_id = %job.id, run_id = %run.id, error = %error, "judge dispatch failed");
        }

        Ok(run.id)
    }

    /// Record the outcome and release the lock; fall back to a bare release
    /// if the bookkeeping update fails.
    async fn settle(&self, job_id: &str, outcome: RunOutcome) {
        let Err(error) = self.store.record_outcome(job_id, outcome, Utc::now()).await else {
            return;
        };
        tracing::error!(job_id, error = %error, "failed to record job outcome; releasing lock");

        if let Err(release_error) = self.store.release_lock(job_id).await {
            tracing::error!(
                job_id,
                error = %release_error,
                "CRITICAL: failed to release job lock; it stays held until the stale timeout"
            );
        }
    }
}
