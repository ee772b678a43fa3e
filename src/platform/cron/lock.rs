//! Per-job mutual exclusion on the `(is_running, run_started_at)` pair.
//!
//! Acquisition is always a conditional update against the values last read,
//! so two racing acquirers can never both win.

use super::repository::JobStore;
use super::types::Job;
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LockState {
    Unlocked,
    Locked { started_at: DateTime<Utc> },
    /// Held past the stale timeout, or flagged without a start time.
    Stale { started_at: Option<DateTime<Utc>> },
}

/// The lock values an acquirer observed; the update must still match them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockObservation {
    Unlocked,
    Stale { started_at: Option<DateTime<Utc>> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    Acquired { started_at: DateTime<Utc> },
    AlreadyRunning,
}

impl LockState {
    pub fn of(job: &Job, now: DateTime<Utc>, stale_timeout: Duration) -> Self {
        if !job.is_running {
            return Self::Unlocked;
        }
        match job.run_started_at {
            Some(started_at) if started_at > now - stale_timeout => Self::Locked { started_at },
            started_at => Self::Stale { started_at },
        }
    }

    pub fn is_fresh(self) -> bool {
        matches!(self, Self::Locked { .. })
    }

    fn observation(self) -> Option<LockObservation> {
        match self {
            Self::Unlocked => Some(LockObservation::Unlocked),
            Self::Stale { started_at } => Some(LockObservation::Stale { started_at }),
            Self::Locked { .. } => None,
        }
    }
}

/// Take the job's lock if it is free or stale. Losing the race is an
/// `AlreadyRunning` outcome, not an error.
pub async fn try_acquire(
    store: &dyn JobStore,
    job: &Job,
    now: DateTime<Utc>,
    stale_timeout: Duration,
) -> Result<AcquireOutcome> {
    let state = LockState::of(job, now, stale_timeout);
    let Some(observed) = state.observation() else {
        return Ok(AcquireOutcome::AlreadyRunning);
    };
    if let LockState::Stale { started_at } = state {
        tracing::warn!(
            job_id = %job.id,
            started_at = ?started_at,
            "recovering stale lock"
        );
    }

    if store.try_acquire_lock(&job.id, observed, now).await? {
        Ok(AcquireOutcome::Acquired { started_at: now })
    } else {
        Ok(AcquireOutcome::AlreadyRunning)
    }
}
