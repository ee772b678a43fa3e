use serde::{Deserialize, Serialize};

pub const MIN_POLL_SECS: u64 = 5;
pub const DEFAULT_STALE_LOCK_TIMEOUT_MINUTES: u64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Cadence of the internal dispatcher ticker (daemon mode only)
    #[serde(default = "default_poll_secs")]
    pub poll_secs: u64,
    /// Run dispatcher cycles from inside the daemon instead of waiting
    /// for an external trigger to call `/scheduler`
    #[serde(default)]
    pub internal_trigger: bool,
    /// A lock older than this is presumed abandoned
    #[serde(default = "default_stale_lock_timeout_minutes")]
    pub stale_lock_timeout_minutes: u64,
    #[serde(default = "default_backoff_cap_minutes")]
    pub backoff_cap_minutes: u64,
    /// Failure count at which backoff stops gating dispatch
    #[serde(default = "default_backoff_ceiling")]
    pub backoff_ceiling: u32,
    /// Remote executor endpoint; in-process dispatch when unset
    #[serde(default)]
    pub executor_url: Option<String>,
    #[serde(default = "default_dispatch_timeout_secs")]
    pub dispatch_timeout_secs: u64,
}

fn default_poll_secs() -> u64 {
    60
}

fn default_stale_lock_timeout_minutes() -> u64 {
    DEFAULT_STALE_LOCK_TIMEOUT_MINUTES
}

fn default_backoff_cap_minutes() -> u64 {
    1440
}

fn default_backoff_ceiling() -> u32 {
    3
}

fn default_dispatch_timeout_secs() -> u64 {
    30
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_secs: default_poll_secs(),
            internal_trigger: false,
            stale_lock_timeout_minutes: default_stale_lock_timeout_minutes(),
            backoff_cap_minutes: default_backoff_cap_minutes(),
            backoff_ceiling: default_backoff_ceiling(),
            executor_url: None,
            dispatch_timeout_secs: default_dispatch_timeout_secs(),
        }
    }
}

impl SchedulerConfig {
    pub fn stale_lock_timeout(&self) -> chrono::Duration {
        let minutes = i64::try_from(self.stale_lock_timeout_minutes).unwrap_or(i64::MAX);
        chrono::Duration::try_minutes(minutes).unwrap_or(chrono::Duration::MAX)
    }

    pub fn effective_poll_secs(&self) -> u64 {
        self.poll_secs.max(MIN_POLL_SECS)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Upper bound for a single model call
    #[serde(default = "default_model_timeout_secs")]
    pub model_timeout_secs: u64,
    #[serde(default = "default_openrouter_base_url")]
    pub openrouter_base_url: String,
}

fn default_model_timeout_secs() -> u64 {
    300
}

fn default_openrouter_base_url() -> String {
    "https://openrouter.ai/api/v1".into()
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            model_timeout_secs: default_model_timeout_secs(),
            openrouter_base_url: default_openrouter_base_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeConfig {
    #[serde(default = "default_judge_model")]
    pub model: String,
    #[serde(default = "default_judge_temperature")]
    pub temperature: f64,
    #[serde(default = "default_judge_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_judge_model() -> String {
    "openai/gpt-5-nano".into()
}

fn default_judge_temperature() -> f64 {
    0.3
}

fn default_judge_timeout_secs() -> u64 {
    120
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            model: default_judge_model(),
            temperature: default_judge_temperature(),
            timeout_secs: default_judge_timeout_secs(),
        }
    }
}
