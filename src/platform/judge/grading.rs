//! Rule grading through a judge model.

use crate::error::JudgeError;
use crate::llm::{CompletionRequest, Provider};
use crate::platform::cron::{Rule, RuleType};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const MISSING_REASONING: &str = "No reasoning provided";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Grade {
    pub score: f64,
    pub reasoning: String,
}

#[derive(Debug, Clone)]
pub struct JudgeSettings {
    pub model: String,
    pub temperature: f64,
    pub timeout: Duration,
}

impl JudgeSettings {
    pub fn from_config(config: &crate::config::JudgeConfig) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.temperature,
            timeout: Duration::from_secs(config.timeout_secs.max(1)),
        }
    }
}

fn scoring_instructions(rule_type: RuleType) -> &'static str {
    match rule_type {
        RuleType::Binary => {
            "Decide whether the response satisfies the criterion. \
             Score 1 if it does and 0 if it does not."
        }
        RuleType::Ranking => {
            "Find the position at which the subject of the criterion appears in any \
             ranked or ordered list within the response. Score that position as an \
             integer starting at 1, or 0 if the subject does not appear."
        }
        RuleType::Sentiment => {
            "Rate the sentiment the response expresses toward the subject of the \
             criterion on a continuous scale from -1 (very negative) through 0 \
             (neutral or absent) to 1 (very positive)."
        }
    }
}

pub fn system_prompt(rule_type: RuleType, criterion: &str) -> String {
    format!(
        "You grade AI assistant responses against a single criterion.\n\n\
         Criterion: {criterion}\n\n\
         {instructions}\n\n\
         Reply with a JSON object only: {{\"score\": <number>, \"reasoning\": \"<one or two sentences>\"}}",
        instructions = scoring_instructions(rule_type),
    )
}

pub fn user_message(response_text: &str) -> String {
    format!("Response to evaluate:\n\n{response_text}")
}

#[derive(Deserialize)]
struct RawGrade {
    score: Option<serde_json::Value>,
    reasoning: Option<String>,
}

fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn try_parse_grade(raw: &str) -> Result<Grade, String> {
    let unfenced = strip_code_fences(raw);
    let start = unfenced.find('{').ok_or("no JSON object found")?;
    let end = unfenced.rfind('}').ok_or("no JSON object found")?;
    if end < start {
        return Err("no JSON object found".into());
    }

    let parsed: RawGrade =
        serde_json::from_str(&unfenced[start..=end]).map_err(|e| e.to_string())?;
    let score = match parsed.score {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|score| score.is_finite())
    .ok_or("missing numeric score")?;

    Ok(Grade {
        score,
        reasoning: parsed
            .reasoning
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| MISSING_REASONING.to_string()),
    })
}

/// Malformed judge output degrades to a zero score with a diagnostic.
pub fn parse_grade(raw: &str) -> Grade {
    try_parse_grade(raw).unwrap_or_else(|error| Grade {
        score: 0.0,
        reasoning: format!("Failed to parse judge response: {error}"),
    })
}

/// Grade `response_text` against one rule.
pub async fn grade(
    provider: &dyn Provider,
    settings: &JudgeSettings,
    response_text: &str,
    rule: &Rule,
) -> Result<Grade, JudgeError> {
    let system = system_prompt(rule.rule_type, &rule.description);
    let message = user_message(response_text);
    let request = CompletionRequest::new(&message, &settings.model)
        .with_system(&system)
        .with_temperature(settings.temperature)
        .json();

    match tokio::time::timeout(settings.timeout, provider.complete(request)).await {
        Ok(Ok(response)) => Ok(parse_grade(&response.text)),
        Ok(Err(error)) => Err(JudgeError::UpstreamJudge(error.to_string())),
        Err(_) => Err(JudgeError::UpstreamJudge(format!(
            "judge timed out after {}s",
            settings.timeout.as_secs()
        ))),
    }
}
