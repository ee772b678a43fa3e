use super::*;
use crate::platform::cron::{Rule, RuleType, SqliteJobStore};
use crate::platform::plans::PlanTier;
use crate::platform::test_support::{
    Reply, ScriptedProvider, seed_job, seed_profile, target, temp_store,
};
use chrono::Utc;
use std::time::Duration;

fn settings() -> JudgeSettings {
    JudgeSettings {
        model: "openai/gpt-5-nano".into(),
        temperature: 0.3,
        timeout: Duration::from_secs(5),
    }
}

fn rule(rule_type: RuleType, description: &str) -> Rule {
    Rule {
        id: "rule-1".into(),
        job_id: "job-1".into(),
        name: "mention".into(),
        description: description.into(),
        rule_type,
        created_at: Utc::now(),
    }
}

async fn seeded_run(store: &SqliteJobStore, response_text: Option<&str>) -> Run {
    let owner = seed_profile(store, PlanTier::Pro, 10).await;
    let job = seed_job(store, &owner, "0 9 * * *", vec![target("openai/gpt-5-nano", false)]).await;
    store
        .insert_run(crate::platform::cron::NewRun {
            job_id: job.id,
            model_used: "openai/gpt-5-nano".into(),
            web_search_enabled: false,
            response_text: response_text.map(str::to_string),
            input_tokens: 10,
            output_tokens: 20,
        })
        .await
        .unwrap()
}

#[test]
fn parse_grade_accepts_plain_json() {
    let grade = parse_grade(r#"{"score": 1, "reasoning": "Acme is named first."}"#);
    assert_eq!(grade.score, 1.0);
    assert_eq!(grade.reasoning, "Acme is named first.");
}

#[test]
fn parse_grade_strips_code_fences_and_prose() {
    let raw = "```json\nHere you go: {\"score\": -0.5, \"reasoning\": \"Mildly critical\"}\n```";
    let grade = parse_grade(raw);
    assert_eq!(grade.score, -0.5);
    assert_eq!(grade.reasoning, "Mildly critical");
}

#[test]
fn parse_grade_defaults_missing_reasoning() {
    let grade = parse_grade(r#"{"score": 3}"#);
    assert_eq!(grade.score, 3.0);
    assert_eq!(grade.reasoning, "No reasoning provided");
}

#[test]
fn parse_grade_accepts_numeric_string_score() {
    assert_eq!(parse_grade(r#"{"score": "2"}"#).score, 2.0);
}

#[test]
fn parse_grade_degrades_on_malformed_output() {
    for raw in ["I cannot grade this.", r#"{"reasoning": "no score"}"#, "{not json}"] {
        let grade = parse_grade(raw);
        assert_eq!(grade.score, 0.0, "raw: {raw}");
        assert!(
            grade.reasoning.starts_with("Failed to parse judge response:"),
            "raw: {raw}"
        );
    }
}

#[test]
fn system_prompts_differ_by_rule_type_and_carry_criterion() {
    let binary = system_prompt(RuleType::Binary, "Mentions Acme");
    let ranking = system_prompt(RuleType::Ranking, "Mentions Acme");
    let sentiment = system_prompt(RuleType::Sentiment, "Mentions Acme");
    for prompt in [&binary, &ranking, &sentiment] {
        assert!(prompt.contains("Criterion: Mentions Acme"));
        assert!(prompt.contains("\"score\""));
    }
    assert!(binary.contains("Score 1"));
    assert!(ranking.contains("position"));
    assert!(sentiment.contains("-1"));
    assert_ne!(binary, ranking);
}

#[tokio::test]
async fn grade_sends_judge_model_and_json_request() {
    let provider = ScriptedProvider::replying(r#"{"score": 1, "reasoning": "yes"}"#);
    let graded = grade(
        &provider,
        &settings(),
        "Acme is the best choice.",
        &rule(RuleType::Binary, "Mentions Acme"),
    )
    .await
    .unwrap();
    assert_eq!(graded.score, 1.0);

    let calls = provider.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].model, "openai/gpt-5-nano");
    assert!(calls[0].json_response);
    assert_eq!(calls[0].message, "Response to evaluate:\n\nAcme is the best choice.");
    assert!(calls[0].system_prompt.as_deref().unwrap().contains("Mentions Acme"));
}

#[tokio::test]
async fn grade_surfaces_transport_failure_as_upstream_error() {
    let provider = ScriptedProvider::replying("unused").with_reply(
        "openai/gpt-5-nano",
        Reply::Fail("OpenRouter API error (503): overloaded".into()),
    );
    let err = grade(&provider, &settings(), "text", &rule(RuleType::Binary, "x"))
        .await
        .unwrap_err();
    assert!(matches!(err, JudgeError::UpstreamJudge(message) if message.contains("503")));
}

#[tokio::test]
async fn grade_times_out() {
    let provider =
        ScriptedProvider::replying("unused").with_reply("openai/gpt-5-nano", Reply::Hang);
    let settings = JudgeSettings {
        timeout: Duration::from_millis(50),
        ..settings()
    };
    let err = grade(&provider, &settings, "text", &rule(RuleType::Binary, "x"))
        .await
        .unwrap_err();
    assert!(matches!(err, JudgeError::UpstreamJudge(message) if message.contains("timed out")));
}

#[tokio::test]
async fn dispatch_rejects_unknown_run() {
    let (_tmp, store) = temp_store().await;
    let judge = Judge::new(
        Arc::new(store),
        Arc::new(ScriptedProvider::replying("{}")),
        settings(),
    );
    let err = judge.dispatch("missing").await.unwrap_err();
    assert_eq!(err, JudgeError::NotFound("run missing".into()));
}

#[tokio::test]
async fn dispatch_writes_one_evaluation_per_rule() {
    let (_tmp, store) = temp_store().await;
    let run = seeded_run(&store, Some("1. Acme 2. Globex")).await;
    store
        .add_rule(&run.job_id, "mentioned", "Mentions Acme", RuleType::Binary)
        .await
        .unwrap();
    store
        .add_rule(&run.job_id, "rank", "Position of Globex", RuleType::Ranking)
        .await
        .unwrap();

    let provider = Arc::new(ScriptedProvider::replying(
        r#"{"score": 2, "reasoning": "second"}"#,
    ));
    let judge = Judge::new(Arc::new(store.clone()), provider.clone(), settings());
    let ack = judge.dispatch(&run.id).await.unwrap();
    assert!(ack.success);
    assert_eq!(ack.status, "started");
    judge.wait_idle().await;

    let evaluations = store.evaluations_for_run(&run.id).await.unwrap();
    assert_eq!(evaluations.len(), 2);
    assert!(evaluations.iter().all(|e| e.score == 2.0));
    assert_eq!(provider.calls().len(), 2);
}

#[tokio::test]
async fn run_without_response_text_is_skipped() {
    let (_tmp, store) = temp_store().await;
    let run = seeded_run(&store, None).await;
    store
        .add_rule(&run.job_id, "mentioned", "Mentions Acme", RuleType::Binary)
        .await
        .unwrap();
    let provider = Arc::new(ScriptedProvider::replying(r#"{"score": 1}"#));
    let judge = Judge::new(Arc::new(store.clone()), provider.clone(), settings());

    let summary = judge.evaluate_run(&run).await.unwrap();
    assert_eq!(summary, EvaluationSummary::default());
    assert!(provider.calls().is_empty());
}

#[tokio::test]
async fn job_without_rules_is_skipped() {
    let (_tmp, store) = temp_store().await;
    let run = seeded_run(&store, Some("text")).await;
    let provider = Arc::new(ScriptedProvider::replying(r#"{"score": 1}"#));
    let judge = Judge::new(Arc::new(store), provider.clone(), settings());

    let summary = judge.evaluate_run(&run).await.unwrap();
    assert_eq!(summary.evaluated, 0);
    assert!(provider.calls().is_empty());
}

#[tokio::test]
async fn malformed_judge_output_is_stored_as_zero_score() {
    let (_tmp, store) = temp_store().await;
    let run = seeded_run(&store, Some("text")).await;
    store
        .add_rule(&run.job_id, "mentioned", "Mentions Acme", RuleType::Binary)
        .await
        .unwrap();
    let judge = Judge::new(
        Arc::new(store.clone()),
        Arc::new(ScriptedProvider::replying("definitely yes")),
        settings(),
    );

    let summary = judge.evaluate_run(&run).await.unwrap();
    assert_eq!(summary.evaluated, 1);
    let evaluations = store.evaluations_for_run(&run.id).await.unwrap();
    assert_eq!(evaluations[0].score, 0.0);
    assert!(evaluations[0].reasoning.starts_with("Failed to parse judge response:"));
}

#[tokio::test]
async fn failing_rule_does_not_stop_remaining_rules() {
    let (_tmp, store) = temp_store().await;
    let run = seeded_run(&store, Some("text")).await;
    for name in ["a", "b"] {
        store
            .add_rule(&run.job_id, name, "Mentions Acme", RuleType::Binary)
            .await
            .unwrap();
    }
    let judge = Judge::new(
        Arc::new(store.clone()),
        Arc::new(
            ScriptedProvider::replying("unused")
                .with_reply("openai/gpt-5-nano", Reply::Fail("upstream 500".into())),
        ),
        settings(),
    );

    let summary = judge.evaluate_run(&run).await.unwrap();
    assert_eq!(summary.evaluated, 0);
    assert_eq!(summary.failed, 2);
    assert!(store.evaluations_for_run(&run.id).await.unwrap().is_empty());
}
