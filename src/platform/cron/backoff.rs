use chrono::{DateTime, Duration, Utc};

pub const DEFAULT_BACKOFF_CAP_MINUTES: u64 = 1440;
pub const DEFAULT_BACKOFF_CEILING: u32 = 3;

/// Exponential retry delay for repeatedly failing jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub cap_minutes: u64,
    /// At or above this many consecutive failures the policy stops gating
    /// dispatch and the job falls back to its cron cadence.
    pub ceiling: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            cap_minutes: DEFAULT_BACKOFF_CAP_MINUTES,
            ceiling: DEFAULT_BACKOFF_CEILING,
        }
    }
}

impl BackoffPolicy {
    /// `min(2^failed_attempts, cap)` minutes.
    pub fn delay_minutes(&self, failed_attempts: u32) -> u64 {
        let exponential = 1_u64.checked_shl(failed_attempts).unwrap_or(u64::MAX);
        exponential.min(self.cap_minutes)
    }

    /// Earliest retry time, or `None` when backoff does not apply.
    pub fn retry_at(
        &self,
        failed_attempts: u32,
        last_failure_at: Option<DateTime<Utc>>,
    ) -> Option<DateTime<Utc>> {
        if failed_attempts == 0 {
            return None;
        }
        let last_failure_at = last_failure_at?;
        let minutes = i64::try_from(self.delay_minutes(failed_attempts)).unwrap_or(i64::MAX);
        last_failure_at.checked_add_signed(Duration::try_minutes(minutes)?)
    }

    pub fn ceiling_reached(&self, failed_attempts: u32) -> bool {
        failed_attempts >= self.ceiling
    }

    /// Pending retry time that should hold the job back at `now`.
    pub fn blocking_until(
        &self,
        failed_attempts: u32,
        last_failure_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        if self.ceiling_reached(failed_attempts) {
            return None;
        }
        self.retry_at(failed_attempts, last_failure_at)
            .filter(|retry_at| now < *retry_at)
    }
}
