use super::expression::{ScheduleKind, classify};
use crate::platform::plans::PlanTier;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// One (model, search-enabled) pair a job executes against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub model: String,
    #[serde(default)]
    pub web_search: bool,
}

/// `model` or `model:search`, as accepted on the command line.
impl FromStr for Target {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        let (model, web_search) = match raw.rsplit_once(':') {
            Some((model, "search")) => (model, true),
            Some((_, flag)) => return Err(format!("unknown target flag '{flag}' in '{raw}'")),
            None => (raw, false),
        };
        if model.is_empty() {
            return Err("target model must not be empty".into());
        }
        Ok(Self {
            model: model.to_string(),
            web_search,
        })
    }
}

/// A recurring monitoring prompt and its scheduling state.
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub id: String,
    pub user_id: String,
    pub query_text: String,
    /// Five-field cron expression; empty means manual-only.
    pub schedule_cron: String,
    pub is_active: bool,
    pub targets: Vec<Target>,
    /// `None` means due now.
    pub next_run_at: Option<DateTime<Utc>>,
    pub is_running: bool,
    pub run_started_at: Option<DateTime<Utc>>,
    pub failed_attempts: u32,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Job {
    pub fn schedule_kind(&self) -> ScheduleKind {
        classify(&self.schedule_cron)
    }

    pub fn is_scheduled(&self) -> bool {
        !self.schedule_cron.trim().is_empty()
    }
}

/// A row returned by the due-job query. A row that cannot be decoded
/// is surfaced by id so one bad job never blocks the others.
#[derive(Debug, Clone)]
pub enum DueJob {
    Ready(Job),
    Malformed { job_id: String, error: String },
}

#[derive(Debug, Clone)]
pub struct NewJob {
    pub user_id: String,
    pub query_text: String,
    pub schedule_cron: String,
    pub targets: Vec<Target>,
    pub is_active: bool,
}

/// Owner of jobs; carries the credit balance and plan tier.
#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub id: String,
    pub email: Option<String>,
    pub credits_balance: i64,
    pub plan: PlanTier,
    pub created_at: DateTime<Utc>,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum RuleType {
    Binary,
    Ranking,
    Sentiment,
}

impl RuleType {
    pub(crate) fn as_db(self) -> &'static str {
        match self {
            Self::Binary => "binary",
            Self::Ranking => "ranking",
            Self::Sentiment => "sentiment",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Rule {
    pub id: String,
    pub job_id: String,
    pub name: String,
    pub description: String,
    pub rule_type: RuleType,
    pub created_at: DateTime<Utc>,
}

/// One recorded execution of one target.
#[derive(Debug, Clone, Serialize)]
pub struct Run {
    pub id: String,
    pub job_id: String,
    pub model_used: String,
    pub web_search_enabled: bool,
    pub response_text: Option<String>,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub executed_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewRun {
    pub job_id: String,
    pub model_used: String,
    pub web_search_enabled: bool,
    pub response_text: Option<String>,
    pub input_tokens: i64,
    pub output_tokens: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub id: String,
    pub run_id: String,
    pub rule_id: String,
    pub score: f64,
    pub reasoning: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewEvaluation {
    pub run_id: String,
    pub rule_id: String,
    pub score: f64,
    pub reasoning: String,
}

/// Job-level result of one asynchronous execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Succeeded,
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_parses_search_suffix() {
        let plain: Target = "openai/gpt-5-nano".parse().unwrap();
        assert!(!plain.web_search);
        let search: Target = "perplexity/sonar:search".parse().unwrap();
        assert_eq!(search.model, "perplexity/sonar");
        assert!(search.web_search);
    }

    #[test]
    fn target_rejects_unknown_flag_and_empty_model() {
        assert!("openai/gpt-5-nano:fast".parse::<Target>().is_err());
        assert!(":search".parse::<Target>().is_err());
    }
}
