//! Shared fixtures for store- and provider-backed unit tests.

use crate::llm::{CompletionRequest, Provider, ProviderFuture, ProviderResponse};
use crate::platform::cron::{
    DueJob, Evaluation, Job, JobStore, LockObservation, NewEvaluation, NewJob, NewRun, Profile, Rule,
    Run, RunOutcome, SqliteJobStore, StoreFuture, Target, format_timestamp,
};
use crate::platform::plans::{PlanTier, SearchContextSize};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

pub(crate) async fn temp_store() -> (TempDir, SqliteJobStore) {
    let tmp = TempDir::new().unwrap();
    let store = SqliteJobStore::open(&tmp.path().join("promptwatch.db"))
        .await
        .unwrap();
    (tmp, store)
}

pub(crate) fn target(model: &str, web_search: bool) -> Target {
    Target {
        model: model.into(),
        web_search,
    }
}

pub(crate) async fn seed_profile(store: &SqliteJobStore, plan: PlanTier, credits: i64) -> Profile {
    store
        .create_profile(Some("owner@example.com"), plan, credits)
        .await
        .unwrap()
}

pub(crate) async fn seed_job(
    store: &SqliteJobStore,
    owner: &Profile,
    schedule: &str,
    targets: Vec<Target>,
) -> Job {
    store
        .create_job(NewJob {
            user_id: owner.id.clone(),
            query_text: "best project management tool for small teams".into(),
            schedule_cron: schedule.into(),
            targets,
            is_active: true,
        })
        .await
        .unwrap()
}

/// Overwrite the scheduling columns of a job directly.
pub(crate) async fn set_job_state(
    store: &SqliteJobStore,
    job_id: &str,
    next_run_at: Option<DateTime<Utc>>,
    is_running: bool,
    run_started_at: Option<DateTime<Utc>>,
    failed_attempts: u32,
    last_failure_at: Option<DateTime<Utc>>,
) {
    sqlx::query(
        "UPDATE jobs SET next_run_at = ?, is_running = ?, run_started_at = ?,
                        failed_attempts = ?, last_failure_at = ?
         WHERE id = ?",
    )
    .bind(next_run_at.map(format_timestamp))
    .bind(is_running)
    .bind(run_started_at.map(format_timestamp))
    .bind(i64::from(failed_attempts))
    .bind(last_failure_at.map(format_timestamp))
    .bind(job_id)
    .execute(store.pool())
    .await
    .unwrap();
}

#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Text(String),
    Fail(String),
    Panic,
    Hang,
}

#[derive(Debug, Clone)]
pub(crate) struct RecordedCall {
    pub model: String,
    pub system_prompt: Option<String>,
    pub message: String,
    pub web_search: Option<SearchContextSize>,
    pub json_response: bool,
}

/// Provider whose replies are scripted per model.
pub(crate) struct ScriptedProvider {
    replies: Mutex<HashMap<String, Reply>>,
    default_reply: Reply,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedProvider {
    pub(crate) fn replying(text: &str) -> Self {
        Self {
            replies: Mutex::new(HashMap::new()),
            default_reply: Reply::Text(text.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_reply(self, model: &str, reply: Reply) -> Self {
        self.replies.lock().unwrap().insert(model.into(), reply);
        self
    }

    pub(crate) fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn complete<'a>(&'a self, request: CompletionRequest<'a>) -> ProviderFuture<'a> {
        self.calls.lock().unwrap().push(RecordedCall {
            model: request.model.into(),
            system_prompt: request.system_prompt.map(str::to_string),
            message: request.message.into(),
            web_search: request.web_search,
            json_response: request.json_response,
        });
        let reply = self
            .replies
            .lock()
            .unwrap()
            .get(request.model)
            .cloned()
            .unwrap_or_else(|| self.default_reply.clone());

        Box::pin(async move {
            match reply {
                Reply::Text(text) => Ok(ProviderResponse::with_usage(text, 12, 34)),
                Reply::Fail(message) => Err(anyhow::anyhow!(message)),
                Reply::Panic => panic!("scripted provider panic"),
                Reply::Hang => std::future::pending::<anyhow::Result<ProviderResponse>>().await,
            }
        })
    }
}

#[derive(Debug, Default)]
pub(crate) struct Faults {
    pub due_jobs: bool,
    pub insert_run: bool,
    pub record_outcome: bool,
    pub release_lock: bool,
    pub set_next_run_for: HashSet<String>,
}

/// Delegating store that fails selected operations on demand.
pub(crate) struct FaultyStore {
    inner: SqliteJobStore,
    pub faults: Mutex<Faults>,
    pub release_lock_calls: AtomicUsize,
}

impl FaultyStore {
    pub(crate) fn new(inner: SqliteJobStore) -> Self {
        Self {
            inner,
            faults: Mutex::new(Faults::default()),
            release_lock_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn inner(&self) -> &SqliteJobStore {
        &self.inner
    }

    fn injected<T: Send + 'static>(what: &'static str) -> StoreFuture<'static, T> {
        Box::pin(async move { Err(anyhow::anyhow!("injected {what} failure")) })
    }
}

impl JobStore for FaultyStore {
    fn due_jobs(&self, now: DateTime<Utc>) -> StoreFuture<'_, Vec<DueJob>> {
        if self.faults.lock().unwrap().due_jobs {
            return Self::injected("due_jobs");
        }
        self.inner.due_jobs(now)
    }

    fn get_job<'a>(&'a self, job_id: &'a str) -> StoreFuture<'a, Option<Job>> {
        self.inner.get_job(job_id)
    }

    fn get_profile<'a>(&'a self, profile_id: &'a str) -> StoreFuture<'a, Option<Profile>> {
        self.inner.get_profile(profile_id)
    }

    fn try_acquire_lock<'a>(
        &'a self,
        job_id: &'a str,
        observed: LockObservation,
        now: DateTime<Utc>,
    ) -> StoreFuture<'a, bool> {
        self.inner.try_acquire_lock(job_id, observed, now)
    }

    fn release_lock<'a>(&'a self, job_id: &'a str) -> StoreFuture<'a, ()> {
        self.release_lock_calls.fetch_add(1, Ordering::SeqCst);
        if self.faults.lock().unwrap().release_lock {
            return Self::injected("release_lock");
        }
        self.inner.release_lock(job_id)
    }

    fn record_outcome<'a>(
        &'a self,
        job_id: &'a str,
        outcome: RunOutcome,
        at: DateTime<Utc>,
    ) -> StoreFuture<'a, ()> {
        if self.faults.lock().unwrap().record_outcome {
            return Self::injected("record_outcome");
        }
        self.inner.record_outcome(job_id, outcome, at)
    }

    fn set_next_run<'a>(&'a self, job_id: &'a str, next: DateTime<Utc>) -> StoreFuture<'a, ()> {
        if self.faults.lock().unwrap().set_next_run_for.contains(job_id) {
            return Self::injected("set_next_run");
        }
        self.inner.set_next_run(job_id, next)
    }

    fn decrement_credits_if_available<'a>(
        &'a self,
        profile_id: &'a str,
        amount: i64,
    ) -> StoreFuture<'a, Option<i64>> {
        self.inner.decrement_credits_if_available(profile_id, amount)
    }

    fn insert_run(&self, run: NewRun) -> StoreFuture<'_, Run> {
        if self.faults.lock().unwrap().insert_run {
            return Self::injected("insert_run");
        }
        self.inner.insert_run(run)
    }

    fn get_run<'a>(&'a self, run_id: &'a str) -> StoreFuture<'a, Option<Run>> {
        self.inner.get_run(run_id)
    }

    fn rules_for_job<'a>(&'a self, job_id: &'a str) -> StoreFuture<'a, Vec<Rule>> {
        self.inner.rules_for_job(job_id)
    }

    fn insert_evaluation(&self, evaluation: NewEvaluation) -> StoreFuture<'_, Evaluation> {
        self.inner.insert_evaluation(evaluation)
    }
}
