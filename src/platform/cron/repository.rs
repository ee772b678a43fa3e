use super::expression::{format_timestamp, next_trigger, parse_rfc3339, validate};
use super::lock::LockObservation;
use super::types::{
    DueJob, Evaluation, Job, NewEvaluation, NewJob, NewRun, Profile, Rule, RuleType, Run, RunOutcome,
    Target,
};
use crate::platform::plans::PlanTier;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use uuid::Uuid;

pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Persistence seam for the dispatcher, executor and judge.
///
/// Lock mutations are conditional on previously observed values; everything
/// else is plain row access.
pub trait JobStore: Send + Sync {
    /// Each due row decoded on its own; undecodable rows come back as
    /// [`DueJob::Malformed`] instead of failing the query.
    fn due_jobs(&self, now: DateTime<Utc>) -> StoreFuture<'_, Vec<DueJob>>;

    fn get_job<'a>(&'a self, job_id: &'a str) -> StoreFuture<'a, Option<Job>>;

    fn get_profile<'a>(&'a self, profile_id: &'a str) -> StoreFuture<'a, Option<Profile>>;

    /// Returns `false` when the row no longer matches `observed`.
    fn try_acquire_lock<'a>(
        &'a self,
        job_id: &'a str,
        observed: LockObservation,
        now: DateTime<Utc>,
    ) -> StoreFuture<'a, bool>;

    /// Unconditional release; the last-resort path after a failed outcome update.
    fn release_lock<'a>(&'a self, job_id: &'a str) -> StoreFuture<'a, ()>;

    /// Apply failure bookkeeping for `outcome` and release the lock in one update.
    fn record_outcome<'a>(
        &'a self,
        job_id: &'a str,
        outcome: RunOutcome,
        at: DateTime<Utc>,
    ) -> StoreFuture<'a, ()>;

    fn set_next_run<'a>(&'a self, job_id: &'a str, next: DateTime<Utc>) -> StoreFuture<'a, ()>;

    /// New balance, or `None` when the balance could not cover `amount`.
    fn decrement_credits_if_available<'a>(
        &'a self,
        profile_id: &'a str,
        amount: i64,
    ) -> StoreFuture<'a, Option<i64>>;

    fn insert_run(&self, run: NewRun) -> StoreFuture<'_, Run>;

    fn get_run<'a>(&'a self, run_id: &'a str) -> StoreFuture<'a, Option<Run>>;

    fn rules_for_job<'a>(&'a self, job_id: &'a str) -> StoreFuture<'a, Vec<Rule>>;

    fn insert_evaluation(&self, evaluation: NewEvaluation) -> StoreFuture<'_, Evaluation>;
}

const JOB_COLUMNS: &str = "id, user_id, query_text, schedule_cron, is_active, target_config,
     next_run_at, is_running, run_started_at, failed_attempts, last_failure_at, created_at";

/// SQLite-backed job store.
#[derive(Clone)]
pub struct SqliteJobStore {
    pool: SqlitePool,
}

impl SqliteJobStore {
    pub async fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create database directory: {}", parent.display())
            })?;
        }

        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect(&url)
            .await
            .with_context(|| format!("Failed to open job DB: {}", db_path.display()))?;

        ensure_schema(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ── Profiles ────────────────────────────────────────────────────────────

    pub async fn create_profile(
        &self,
        email: Option<&str>,
        plan: PlanTier,
        credits: i64,
    ) -> Result<Profile> {
        let profile = Profile {
            id: Uuid::new_v4().to_string(),
            email: email.map(str::to_string),
            credits_balance: credits,
            plan,
            created_at: Utc::now(),
        };
        sqlx::query(
            "INSERT INTO profiles (id, email, credits_balance, plan, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&profile.id)
        .bind(&profile.email)
        .bind(profile.credits_balance)
        .bind(plan.as_db())
        .bind(format_timestamp(profile.created_at))
        .execute(&self.pool)
        .await
        .context("Failed to insert profile")?;
        Ok(profile)
    }

    pub async fn list_profiles(&self) -> Result<Vec<Profile>> {
        let rows = sqlx::query(
            "SELECT id, email, credits_balance, plan, created_at
             FROM profiles ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list profiles")?;
        rows.iter().map(row_to_profile).collect()
    }

    pub async fn set_plan(&self, profile_id: &str, plan: PlanTier) -> Result<()> {
        let result = sqlx::query("UPDATE profiles SET plan = ? WHERE id = ?")
            .bind(plan.as_db())
            .bind(profile_id)
            .execute(&self.pool)
            .await
            .context("Failed to update plan")?;
        if result.rows_affected() == 0 {
            anyhow::bail!("Profile '{profile_id}' not found");
        }
        Ok(())
    }

    /// Add `amount` credits and return the new balance.
    pub async fn grant_credits(&self, profile_id: &str, amount: i64) -> Result<i64> {
        let row = sqlx::query(
            "UPDATE profiles SET credits_balance = credits_balance + ?
             WHERE id = ?
             RETURNING credits_balance",
        )
        .bind(amount)
        .bind(profile_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to grant credits")?;
        match row {
            Some(row) => Ok(row.get("credits_balance")),
            None => anyhow::bail!("Profile '{profile_id}' not found"),
        }
    }

    // ── Jobs ────────────────────────────────────────────────────────────────

    pub async fn create_job(&self, new_job: NewJob) -> Result<Job> {
        let now = Utc::now();
        let schedule_cron = new_job.schedule_cron.trim().to_string();
        let next_run_at = if schedule_cron.is_empty() {
            None
        } else {
            validate(&schedule_cron)?;
            Some(next_trigger(&schedule_cron, now)?)
        };
        if new_job.targets.is_empty() {
            anyhow::bail!("A job needs at least one target");
        }

        let job = Job {
            id: Uuid::new_v4().to_string(),
            user_id: new_job.user_id,
            query_text: new_job.query_text,
            schedule_cron,
            is_active: new_job.is_active,
            targets: new_job.targets,
            next_run_at,
            is_running: false,
            run_started_at: None,
            failed_attempts: 0,
            last_failure_at: None,
            created_at: now,
        };
        let target_config =
            serde_json::to_string(&job.targets).context("Failed to encode target config")?;

        sqlx::query(
            "INSERT INTO jobs (
                id, user_id, query_text, schedule_cron, is_active, target_config,
                next_run_at, created_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&job.id)
        .bind(&job.user_id)
        .bind(&job.query_text)
        .bind(&job.schedule_cron)
        .bind(job.is_active)
        .bind(target_config)
        .bind(job.next_run_at.map(format_timestamp))
        .bind(format_timestamp(job.created_at))
        .execute(&self.pool)
        .await
        .context("Failed to insert job")?;

        Ok(job)
    }

    pub async fn list_jobs(&self) -> Result<Vec<Job>> {
        let rows = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs ORDER BY created_at ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list jobs")?;
        rows.iter().map(row_to_job).collect()
    }

    pub async fn delete_job(&self, job_id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM jobs WHERE id = ?")
            .bind(job_id)
            .execute(&self.pool)
            .await
            .context("Failed to delete job")?;
        if result.rows_affected() == 0 {
            anyhow::bail!("Job '{job_id}' not found");
        }
        Ok(())
    }

    pub async fn set_job_active(&self, job_id: &str, active: bool) -> Result<()> {
        let result = sqlx::query("UPDATE jobs SET is_active = ? WHERE id = ?")
            .bind(active)
            .bind(job_id)
            .execute(&self.pool)
            .await
            .context("Failed to update job activity")?;
        if result.rows_affected() == 0 {
            anyhow::bail!("Job '{job_id}' not found");
        }
        Ok(())
    }

    // ── Rules, runs, evaluations ────────────────────────────────────────────

    pub async fn add_rule(
        &self,
        job_id: &str,
        name: &str,
        description: &str,
        rule_type: RuleType,
    ) -> Result<Rule> {
        let rule = Rule {
            id: Uuid::new_v4().to_string(),
            job_id: job_id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            rule_type,
            created_at: Utc::now(),
        };
        sqlx::query(
            "INSERT INTO rules (id, job_id, name, description, rule_type, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&rule.id)
        .bind(&rule.job_id)
        .bind(&rule.name)
        .bind(&rule.description)
        .bind(rule.rule_type.as_db())
        .bind(format_timestamp(rule.created_at))
        .execute(&self.pool)
        .await
        .context("Failed to insert rule")?;
        Ok(rule)
    }

    pub async fn runs_for_job(&self, job_id: &str) -> Result<Vec<Run>> {
        let rows = sqlx::query(
            "SELECT id, job_id, model_used, web_search_enabled, response_text,
                    token_usage_input, token_usage_output, executed_at
             FROM runs WHERE job_id = ? ORDER BY executed_at ASC",
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list runs")?;
        rows.iter().map(row_to_run).collect()
    }

    pub async fn evaluations_for_run(&self, run_id: &str) -> Result<Vec<Evaluation>> {
        let rows = sqlx::query(
            "SELECT id, run_id, rule_id, score, reasoning, created_at
             FROM evaluations WHERE run_id = ? ORDER BY created_at ASC",
        )
        .bind(run_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list evaluations")?;
        rows.iter().map(row_to_evaluation).collect()
    }
}

impl JobStore for SqliteJobStore {
    fn due_jobs(&self, now: DateTime<Utc>) -> StoreFuture<'_, Vec<DueJob>> {
        Box::pin(async move {
            let rows = sqlx::query(&format!(
                "SELECT {JOB_COLUMNS}
                 FROM jobs
                 WHERE is_active = 1
                   AND schedule_cron IS NOT NULL
                   AND TRIM(schedule_cron) != ''
                   AND (next_run_at IS NULL OR next_run_at <= ?)
                 ORDER BY next_run_at ASC"
            ))
            .bind(format_timestamp(now))
            .fetch_all(&self.pool)
            .await
            .context("Failed to query due jobs")?;
            Ok(rows.iter().map(row_to_due_job).collect())
        })
    }

    fn get_job<'a>(&'a self, job_id: &'a str) -> StoreFuture<'a, Option<Job>> {
        Box::pin(async move {
            let row = sqlx::query(&format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = ?"))
                .bind(job_id)
                .fetch_optional(&self.pool)
                .await
                .context("Failed to load job")?;
            row.as_ref().map(row_to_job).transpose()
        })
    }

    fn get_profile<'a>(&'a self, profile_id: &'a str) -> StoreFuture<'a, Option<Profile>> {
        Box::pin(async move {
            let row = sqlx::query(
                "SELECT id, email, credits_balance, plan, created_at
                 FROM profiles WHERE id = ?",
            )
            .bind(profile_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to load profile")?;
            row.as_ref().map(row_to_profile).transpose()
        })
    }

    fn try_acquire_lock<'a>(
        &'a self,
        job_id: &'a str,
        observed: LockObservation,
        now: DateTime<Utc>,
    ) -> StoreFuture<'a, bool> {
        Box::pin(async move {
            let started_at = format_timestamp(now);
            let result = match observed {
                LockObservation::Unlocked => {
                    sqlx::query(
                        "UPDATE jobs SET is_running = 1, run_started_at = ?
                         WHERE id = ? AND is_running = 0",
                    )
                    .bind(&started_at)
                    .bind(job_id)
                    .execute(&self.pool)
                    .await
                }
                LockObservation::Stale {
                    started_at: Some(previous),
                } => {
                    sqlx::query(
                        "UPDATE jobs SET is_running = 1, run_started_at = ?
                         WHERE id = ? AND is_running = 1 AND run_started_at = ?",
                    )
                    .bind(&started_at)
                    .bind(job_id)
                    .bind(format_timestamp(previous))
                    .execute(&self.pool)
                    .await
                }
                LockObservation::Stale { started_at: None } => {
                    sqlx::query(
                        "UPDATE jobs SET is_running = 1, run_started_at = ?
                         WHERE id = ? AND is_running = 1 AND run_started_at IS NULL",
                    )
                    .bind(&started_at)
                    .bind(job_id)
                    .execute(&self.pool)
                    .await
                }
            }
            .context("Failed to acquire job lock")?;

            Ok(result.rows_affected() == 1)
        })
    }

    fn release_lock<'a>(&'a self, job_id: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            sqlx::query("UPDATE jobs SET is_running = 0, run_started_at = NULL WHERE id = ?")
                .bind(job_id)
                .execute(&self.pool)
                .await
                .context("Failed to release job lock")?;
            Ok(())
        })
    }

    fn record_outcome<'a>(
        &'a self,
        job_id: &'a str,
        outcome: RunOutcome,
        at: DateTime<Utc>,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let query = match outcome {
                RunOutcome::Succeeded => sqlx::query(
                    "UPDATE jobs
                     SET failed_attempts = 0, last_failure_at = NULL,
                         is_running = 0, run_started_at = NULL
                     WHERE id = ?",
                )
                .bind(job_id),
                RunOutcome::Failed => sqlx::query(
                    "UPDATE jobs
                     SET failed_attempts = failed_attempts + 1, last_failure_at = ?,
                         is_running = 0, run_started_at = NULL
                     WHERE id = ?",
                )
                .bind(format_timestamp(at))
                .bind(job_id),
            };
            query
                .execute(&self.pool)
                .await
                .context("Failed to record run outcome")?;
            Ok(())
        })
    }

    fn set_next_run<'a>(&'a self, job_id: &'a str, next: DateTime<Utc>) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let result = sqlx::query("UPDATE jobs SET next_run_at = ? WHERE id = ?")
                .bind(format_timestamp(next))
                .bind(job_id)
                .execute(&self.pool)
                .await
                .context("Failed to update next run")?;
            if result.rows_affected() == 0 {
                anyhow::bail!("Job '{job_id}' not found");
            }
            Ok(())
        })
    }

    fn decrement_credits_if_available<'a>(
        &'a self,
        profile_id: &'a str,
        amount: i64,
    ) -> StoreFuture<'a, Option<i64>> {
        Box::pin(async move {
            let row = sqlx::query(
                "UPDATE profiles SET credits_balance = credits_balance - ?
                 WHERE id = ? AND credits_balance >= ?
                 RETURNING credits_balance",
            )
            .bind(amount)
            .bind(profile_id)
            .bind(amount)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to decrement credits")?;
            Ok(row.map(|row| row.get("credits_balance")))
        })
    }

    fn insert_run(&self, run: NewRun) -> StoreFuture<'_, Run> {
        Box::pin(async move {
            let run = Run {
                id: Uuid::new_v4().to_string(),
                job_id: run.job_id,
                model_used: run.model_used,
                web_search_enabled: run.web_search_enabled,
                response_text: run.response_text,
                input_tokens: run.input_tokens,
                output_tokens: run.output_tokens,
                executed_at: Utc::now(),
            };
            sqlx::query(
                "INSERT INTO runs (
                    id, job_id, model_used, web_search_enabled, response_text,
                    token_usage_input, token_usage_output, executed_at
                 ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&run.id)
            .bind(&run.job_id)
            .bind(&run.model_used)
            .bind(run.web_search_enabled)
            .bind(&run.response_text)
            .bind(run.input_tokens)
            .bind(run.output_tokens)
            .bind(format_timestamp(run.executed_at))
            .execute(&self.pool)
            .await
            .context("Failed to insert run")?;
            Ok(run)
        })
    }

    fn get_run<'a>(&'a self, run_id: &'a str) -> StoreFuture<'a, Option<Run>> {
        Box::pin(async move {
            let row = sqlx::query(
                "SELECT id, job_id, model_used, web_search_enabled, response_text,
                        token_usage_input, token_usage_output, executed_at
                 FROM runs WHERE id = ?",
            )
            .bind(run_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to load run")?;
            row.as_ref().map(row_to_run).transpose()
        })
    }

    fn rules_for_job<'a>(&'a self, job_id: &'a str) -> StoreFuture<'a, Vec<Rule>> {
        Box::pin(async move {
            let rows = sqlx::query(
                "SELECT id, job_id, name, description, rule_type, created_at
                 FROM rules WHERE job_id = ? ORDER BY created_at ASC",
            )
            .bind(job_id)
            .fetch_all(&self.pool)
            .await
            .context("Failed to load rules")?;
            rows.iter().map(row_to_rule).collect()
        })
    }

    fn insert_evaluation(&self, evaluation: NewEvaluation) -> StoreFuture<'_, Evaluation> {
        Box::pin(async move {
            let evaluation = Evaluation {
                id: Uuid::new_v4().to_string(),
                run_id: evaluation.run_id,
                rule_id: evaluation.rule_id,
                score: evaluation.score,
                reasoning: evaluation.reasoning,
                created_at: Utc::now(),
            };
            sqlx::query(
                "INSERT INTO evaluations (id, run_id, rule_id, score, reasoning, created_at)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(&evaluation.id)
            .bind(&evaluation.run_id)
            .bind(&evaluation.rule_id)
            .bind(evaluation.score)
            .bind(&evaluation.reasoning)
            .bind(format_timestamp(evaluation.created_at))
            .execute(&self.pool)
            .await
            .context("Failed to insert evaluation")?;
            Ok(evaluation)
        })
    }
}

// ── Schema ──────────────────────────────────────────────────────────────────

async fn ensure_schema(pool: &SqlitePool) -> Result<()> {
    let statements = [
        "CREATE TABLE IF NOT EXISTS profiles (
            id              TEXT PRIMARY KEY,
            email           TEXT,
            credits_balance INTEGER NOT NULL DEFAULT 0,
            plan            TEXT NOT NULL DEFAULT 'free',
            created_at      TEXT NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS jobs (
            id              TEXT PRIMARY KEY,
            user_id         TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
            query_text      TEXT NOT NULL,
            schedule_cron   TEXT,
            is_active       INTEGER NOT NULL DEFAULT 1,
            target_config   TEXT NOT NULL DEFAULT '[]',
            next_run_at     TEXT,
            is_running      INTEGER NOT NULL DEFAULT 0,
            run_started_at  TEXT,
            failed_attempts INTEGER NOT NULL DEFAULT 0,
            last_failure_at TEXT,
            created_at      TEXT NOT NULL
        )",
        "CREATE INDEX IF NOT EXISTS idx_jobs_due ON jobs(is_active, next_run_at)",
        "CREATE TABLE IF NOT EXISTS rules (
            id          TEXT PRIMARY KEY,
            job_id      TEXT NOT NULL REFERENCES jobs(id) ON DELETE CASCADE,
            name        TEXT NOT NULL,
            description TEXT NOT NULL,
            rule_type   TEXT NOT NULL,
            created_at  TEXT NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS runs (
            id                 TEXT PRIMARY KEY,
            job_id             TEXT NOT NULL REFERENCES jobs(id) ON DELETE CASCADE,
            model_used         TEXT NOT NULL,
            web_search_enabled INTEGER NOT NULL DEFAULT 0,
            response_text      TEXT,
            token_usage_input  INTEGER NOT NULL DEFAULT 0,
            token_usage_output INTEGER NOT NULL DEFAULT 0,
            executed_at        TEXT NOT NULL
        )",
        "CREATE INDEX IF NOT EXISTS idx_runs_job ON runs(job_id, executed_at)",
        "CREATE TABLE IF NOT EXISTS evaluations (
            id         TEXT PRIMARY KEY,
            run_id     TEXT NOT NULL REFERENCES runs(id) ON DELETE CASCADE,
            rule_id    TEXT NOT NULL REFERENCES rules(id) ON DELETE CASCADE,
            score      REAL NOT NULL,
            reasoning  TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
    ];

    for statement in statements {
        sqlx::query(statement)
            .execute(pool)
            .await
            .context("Failed to initialize job store schema")?;
    }
    Ok(())
}

// ── Row mapping ─────────────────────────────────────────────────────────────

fn parse_optional_timestamp(raw: Option<String>) -> Result<Option<DateTime<Utc>>> {
    raw.filter(|value| !value.is_empty())
        .map(|value| parse_rfc3339(&value))
        .transpose()
}

fn row_to_due_job(row: &SqliteRow) -> DueJob {
    match row_to_job(row) {
        Ok(job) => DueJob::Ready(job),
        Err(error) => {
            let job_id: String = row.try_get("id").unwrap_or_default();
            let error = format!("{error:#}");
            tracing::warn!(job_id = %job_id, error = %error, "Due job row could not be decoded");
            DueJob::Malformed { job_id, error }
        }
    }
}

fn row_to_job(row: &SqliteRow) -> Result<Job> {
    let id: String = row.get("id");
    let target_config: String = row.get("target_config");
    let targets: Vec<Target> = serde_json::from_str(&target_config)
        .with_context(|| format!("Invalid target config for job {id}"))?;
    let failed_attempts: i64 = row.get("failed_attempts");
    let created_at: String = row.get("created_at");

    Ok(Job {
        user_id: row.get("user_id"),
        query_text: row.get("query_text"),
        schedule_cron: row
            .get::<Option<String>, _>("schedule_cron")
            .unwrap_or_default(),
        is_active: row.get("is_active"),
        targets,
        next_run_at: parse_optional_timestamp(row.get("next_run_at"))?,
        is_running: row.get("is_running"),
        run_started_at: parse_optional_timestamp(row.get("run_started_at"))?,
        failed_attempts: u32::try_from(failed_attempts.max(0)).unwrap_or(u32::MAX),
        last_failure_at: parse_optional_timestamp(row.get("last_failure_at"))?,
        created_at: parse_rfc3339(&created_at)?,
        id,
    })
}

fn row_to_profile(row: &SqliteRow) -> Result<Profile> {
    let plan: String = row.get("plan");
    let created_at: String = row.get("created_at");
    Ok(Profile {
        id: row.get("id"),
        email: row.get("email"),
        credits_balance: row.get("credits_balance"),
        plan: PlanTier::from_db(&plan),
        created_at: parse_rfc3339(&created_at)?,
    })
}

fn row_to_rule(row: &SqliteRow) -> Result<Rule> {
    let rule_type_raw: String = row.get("rule_type");
    let rule_type = rule_type_raw
        .parse::<RuleType>()
        .with_context(|| format!("Unknown rule type: {rule_type_raw}"))?;
    let created_at: String = row.get("created_at");
    Ok(Rule {
        id: row.get("id"),
        job_id: row.get("job_id"),
        name: row.get("name"),
        description: row.get("description"),
        rule_type,
        created_at: parse_rfc3339(&created_at)?,
    })
}

fn row_to_run(row: &SqliteRow) -> Result<Run> {
    let executed_at: String = row.get("executed_at");
    Ok(Run {
        id: row.get("id"),
        job_id: row.get("job_id"),
        model_used: row.get("model_used"),
        web_search_enabled: row.get("web_search_enabled"),
        response_text: row.get("response_text"),
        input_tokens: row.get("token_usage_input"),
        output_tokens: row.get("token_usage_output"),
        executed_at: parse_rfc3339(&executed_at)?,
    })
}

fn row_to_evaluation(row: &SqliteRow) -> Result<Evaluation> {
    let created_at: String = row.get("created_at");
    Ok(Evaluation {
        id: row.get("id"),
        run_id: row.get("run_id"),
        rule_id: row.get("rule_id"),
        score: row.get("score"),
        reasoning: row.get("reasoning"),
        created_at: parse_rfc3339(&created_at)?,
    })
}
