mod common;

use std::{fs, num::NonZeroU32, sync::Arc};

use chartgen::{
    artifacts::{ArtifactStore, RunStatus, RunSummary},
    errors::ServiceError,
    pipeline::run_batch,
    prompts::PromptStore,
    ChartRequest, Outcome, Pipeline, PipelineError,
};
use common::{chart_code, Run, ScriptedLlm, ScriptedRunner};

fn pipeline(llm: Arc<ScriptedLlm>, runs: Vec<Run>, root: &std::path::Path, max: u32) -> Pipeline {
    Pipeline::new(
        llm,
        Arc::new(PromptStore::builtin()),
        Arc::new(ScriptedRunner::new(runs)),
        ArtifactStore::new(root),
        NonZeroU32::new(max).unwrap(),
    )
}

#[tokio::test]
async fn process_writes_plan_code_image_and_summary() {
    let root = tempfile::tempdir().unwrap();
    let llm = Arc::new(ScriptedLlm::new(["  Use a line chart of yearly spending.\n".to_string(), chart_code("line")]));
    let pipeline = pipeline(llm.clone(), vec![Run::Render], root.path(), 3);

    let request = ChartRequest::new("budget_factor1_1", "{\"years\": [2020, 2021]}", 1);
    let report = pipeline.process(&request).await.unwrap();

    let dir = root.path().join("budget_factor1_1");
    assert!(report.outcome.is_success());
    assert_eq!(
        fs::read_to_string(&report.plan_path).unwrap(),
        "Use a line chart of yearly spending."
    );
    assert!(dir.join("budget_factor1_1_chart_code.py").is_file());
    assert!(dir.join("budget_factor1_1_design.png").is_file());
    assert!(!dir.join("budget_factor1_1_failed_code.py").exists());

    let summary: RunSummary =
        serde_json::from_str(&fs::read_to_string(dir.join("budget_factor1_1_summary.json")).unwrap()).unwrap();
    assert_eq!(summary.status, RunStatus::Success);
    assert_eq!(summary.attempts, 1);
    assert_eq!(summary.max_retries, 3);
    assert_eq!(summary.last_error, None);

    let prompts = llm.user_prompts();
    assert!(prompts[0].contains("Factor 1"));
    assert!(prompts[0].contains("2020"));
    assert!(prompts[1].contains("Use a line chart of yearly spending."));
}

#[tokio::test]
async fn plan_failure_clears_stale_results_of_the_same_id() {
    let root = tempfile::tempdir().unwrap();
    let dir = root.path().join("r1");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("r1_design.png"), b"old").unwrap();
    fs::write(dir.join("r1_failed_code.py"), "old").unwrap();

    let llm = Arc::new(ScriptedLlm::default());
    llm.push_error(ServiceError::EmptyResponse);
    let pipeline = pipeline(llm, vec![], root.path(), 3);

    let err = pipeline.process(&ChartRequest::new("r1", "data", 2)).await.unwrap_err();
    assert!(matches!(err, PipelineError::Service(ServiceError::EmptyResponse)));
    assert!(!dir.join("r1_design.png").exists());
    assert!(!dir.join("r1_failed_code.py").exists());
    assert!(!dir.join("r1_design_plan.txt").exists());
    assert!(!dir.join("r1_summary.json").exists());
}

#[tokio::test]
async fn invalid_ids_are_rejected_before_any_model_call() {
    let root = tempfile::tempdir().unwrap();
    let llm = Arc::new(ScriptedLlm::new(["plan"]));
    let pipeline = pipeline(llm.clone(), vec![], root.path(), 3);

    let err = pipeline.process(&ChartRequest::new("../escape", "data", 2)).await.unwrap_err();
    assert!(matches!(err, PipelineError::Artifact(_)));
    assert_eq!(llm.call_count(), 0);
}

fn three_requests() -> Vec<ChartRequest> {
    vec![
        ChartRequest::new("a", "dataset a", 1),
        ChartRequest::new("b", "dataset b", 2),
        ChartRequest::new("c", "dataset c", 3),
    ]
}

#[tokio::test]
async fn batch_continues_past_exhaustion_and_errors() {
    let root = tempfile::tempdir().unwrap();
    // a: plan + two failing candidates; b: plan call fails; c: plan + one good candidate.
    let llm = Arc::new(ScriptedLlm::new(["plan a".to_string(), chart_code("a1"), chart_code("a2")]));
    llm.push_error(ServiceError::EmptyResponse);
    llm.push("plan c");
    llm.push(&chart_code("c1"));
    let pipeline = pipeline(
        llm,
        vec![Run::Fail(1, "ZeroDivisionError"), Run::Fail(1, "ZeroDivisionError"), Run::Render],
        root.path(),
        2,
    );

    let mut seen = Vec::new();
    let report = run_batch(&pipeline, &three_requests(), false, |req, _| seen.push(req.id.clone())).await;

    assert_eq!(seen, ["a", "b", "c"]);
    assert_eq!(report.exhausted, ["a"]);
    assert_eq!(report.errored.len(), 1);
    assert_eq!(report.errored[0].0, "b");
    assert_eq!(report.succeeded, ["c"]);
    assert!(report.skipped.is_empty());
    assert_eq!(report.total(), 3);

    let a = root.path().join("a");
    assert!(a.join("a_failed_code.py").is_file());
    assert!(!a.join("a_design.png").exists());
    let summary: RunSummary = serde_json::from_str(&fs::read_to_string(a.join("a_summary.json")).unwrap()).unwrap();
    assert_eq!(summary.status, RunStatus::Exhausted);
    assert_eq!(summary.attempts, 2);
    assert_eq!(summary.last_error.as_deref(), Some("ZeroDivisionError"));

    assert!(root.path().join("c").join("c_design.png").is_file());
}

#[tokio::test]
async fn fail_fast_skips_the_remaining_requests() {
    let root = tempfile::tempdir().unwrap();
    let llm = Arc::new(ScriptedLlm::new(["plan a".to_string(), chart_code("a1")]));
    llm.push_error(ServiceError::EmptyResponse);
    let pipeline = pipeline(llm.clone(), vec![Run::Render], root.path(), 3);

    let mut outcomes = Vec::new();
    let report = run_batch(&pipeline, &three_requests(), true, |req, result| {
        outcomes.push((req.id.clone(), matches!(result, Ok(r) if matches!(r.outcome, Outcome::Success { .. }))));
    })
    .await;

    assert_eq!(outcomes, [("a".to_string(), true), ("b".to_string(), false)]);
    assert_eq!(report.succeeded, ["a"]);
    assert_eq!(report.skipped, ["c"]);
    assert_eq!(llm.call_count(), 3);
}
