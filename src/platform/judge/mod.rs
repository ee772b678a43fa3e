//! Asynchronous grading of recorded runs against their job's rules.

mod grading;

pub use grading::{Grade, JudgeSettings, grade, parse_grade, system_prompt, user_message};

use crate::error::JudgeError;
use crate::llm::Provider;
use crate::platform::cron::{JobStore, NewEvaluation, Run};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::task::TaskTracker;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JudgeAck {
    pub success: bool,
    pub status: &'static str,
    pub run_id: String,
}

/// Summary of one background evaluation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluationSummary {
    pub evaluated: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct Judge {
    store: Arc<dyn JobStore>,
    provider: Arc<dyn Provider>,
    settings: JudgeSettings,
    tasks: TaskTracker,
}

impl Judge {
    pub fn new(
        store: Arc<dyn JobStore>,
        provider: Arc<dyn Provider>,
        settings: JudgeSettings,
    ) -> Self {
        Self {
            store,
            provider,
            settings,
            tasks: TaskTracker::new(),
        }
    }

    /// Verify the run exists and start grading it in the background.
    pub async fn dispatch(&self, run_id: &str) -> Result<JudgeAck, JudgeError> {
        let run = self
            .store
            .get_run(run_id)
            .await
            .map_err(|e| JudgeError::Persistence(e.to_string()))?
            .ok_or_else(|| JudgeError::NotFound(format!("run {run_id}")))?;

        let judge = self.clone();
        self.tasks.spawn(async move {
            let run_id = run.id.clone();
            match judge.evaluate_run(&run).await {
                Ok(summary) => tracing::info!(
                    run_id = %run_id,
                    evaluated = summary.evaluated,
                    failed = summary.failed,
                    "run evaluation finished"
                ),
                Err(error) => tracing::error!(run_id = %run_id, error = %error, "run evaluation failed"),
            }
        });

        Ok(JudgeAck {
            success: true,
            status: "started",
            run_id: run_id.to_string(),
        })
    }

    /// Grade `run` against every rule of its job, one rule at a time.
    /// A failing rule is logged and does not stop the remaining rules.
    pub async fn evaluate_run(&self, run: &Run) -> Result<EvaluationSummary, JudgeError> {
        let mut summary = EvaluationSummary::default();
        let Some(response_text) = run
            .response_text
            .as_deref()
            .filter(|text| !text.trim().is_empty())
        else {
            tracing::debug!(run_id = %run.id, "run has no response text; skipping evaluation");
            return Ok(summary);
        };

        let rules = self
            .store
            .rules_for_job(&run.job_id)
            .await
            .map_err(|e| JudgeError::Persistence(e.to_string()))?;
        if rules.is_empty() {
            tracing::debug!(run_id = %run.id, job_id = %run.job_id, "job has no rules");
            return Ok(summary);
        }

        for rule in &rules {
            let graded = match grade(self.provider.as_ref(), &self.settings, response_text, rule).await
            {
                Ok(graded) => graded,
                Err(error) => {
                    tracing::warn!(run_id = %run.id, rule_id = %rule.id, error = %error, "rule grading failed");
                    summary.failed += 1;
                    continue;
                }
            };

            let evaluation = NewEvaluation {
                run_id: run.id.clone(),
                rule_id: rule.id.clone(),
                score: graded.score,
                reasoning: graded.reasoning,
            };
            match self.store.insert_evaluation(evaluation).await {
                Ok(_) => summary.evaluated += 1,
                Err(error) => {
                    tracing::warn!(run_id = %run.id, rule_id = %rule.id, error = %error, "failed to store evaluation");
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }

    /// Wait for every background evaluation started so far.
    pub async fn wait_idle(&self) {
        self.tasks.close();
        self.tasks.wait().await;
        self.tasks.reopen();
    }
}

#[cfg(test)]
mod tests;
