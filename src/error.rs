use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for Promptwatch.
///
/// Each subsystem defines its own error variant. Library callers match on
/// these to decide between retrying and giving up; internal plumbing keeps
/// using `anyhow::Result` for ad-hoc context chains.
#[derive(Debug, Error)]
pub enum WatchError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Schedule ────────────────────────────────────────────────────────
    #[error("schedule: {0}")]
    Schedule(#[from] ScheduleError),

    // ── Executor ────────────────────────────────────────────────────────
    #[error("executor: {0}")]
    Executor(#[from] ExecutorError),

    // ── Judge ───────────────────────────────────────────────────────────
    #[error("judge: {0}")]
    Judge(#[from] JudgeError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),
}

// ─── Schedule errors ─────────────────────────────────────────────────────────

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("invalid schedule '{expression}': {reason}")]
    InvalidSchedule { expression: String, reason: String },
}

// ─── Executor errors ─────────────────────────────────────────────────────────

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecutorError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("insufficient credits for profile {profile_id}")]
    InsufficientCredits { profile_id: String },

    #[error("model {model} is not available on the {tier} plan")]
    ModelDisallowed { model: String, tier: String },

    #[error("model {model} execution failed: {message}")]
    UpstreamExecution { model: String, message: String },

    #[error("job {0} has no targets configured")]
    NoTargets(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("persistence failed: {0}")]
    Persistence(String),
}

impl ExecutorError {
    /// HTTP status surfaced to callers of the executor endpoint.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Unauthorized => 401,
            Self::InsufficientCredits { .. } => 402,
            Self::ModelDisallowed { .. } => 403,
            Self::InvalidRequest(_) => 400,
            Self::NoTargets(_) => 422,
            Self::UpstreamExecution { .. } => 502,
            Self::Persistence(_) => 500,
        }
    }

    pub fn is_retryable(&self) -> bool {
        is_retryable_status(self.status_code())
    }
}

/// Transport-level classification shared by every dispatch path:
/// rate limiting and server-side failures are worth another attempt,
/// everything else is a terminal rejection.
pub fn is_retryable_status(status: u16) -> bool {
    status == 429 || status >= 500
}

// ─── Judge errors ────────────────────────────────────────────────────────────

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JudgeError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("judge request failed: {0}")]
    UpstreamJudge(String),

    #[error("persistence failed: {0}")]
    Persistence(String),
}

pub type Result<T> = std::result::Result<T, WatchError>;
