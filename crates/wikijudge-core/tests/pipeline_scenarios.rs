use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use wikijudge_core::anchors::{extract_anchors, AnchorOptions};
use wikijudge_core::engine::status::STATUS_INTERRUPTED;
use wikijudge_core::engine::{
    cancel_pair, BatchOrchestrator, CancelSignal, CaseRunner, CaseSettings, ExecutionStatus,
    RunMode,
};
use wikijudge_core::judge::{JudgeRequest, JudgeRunner, ScriptedRunner};
use wikijudge_core::model::{BatchConfig, CaseSpec, CaseVars, Language};
use wikijudge_core::scoring::{ActionLevel, Verdict};
use wikijudge_core::{JudgeError, PipelineError};

const STAGE1: &str = "stage1_fact_extractor";
const STAGE1_5: &str = "stage1_5_explanation_alignment";
const STAGE2: &str = "stage2_explanatory_judge";

fn judgement(usefulness: &str, coverage: &str, correctness: &str, hallucination: &str) -> Value {
    json!({
        "usefulness_level": usefulness,
        "coverage_level": coverage,
        "correctness_level": correctness,
        "hallucination_level": hallucination,
        "notes": format!("{usefulness}/{coverage}/{correctness}/{hallucination}"),
    })
}

/// Answers every stage; stage 1 reports no coverage counts.
fn passing_runner() -> ScriptedRunner {
    ScriptedRunner::new()
        .with_response(STAGE1, json!({"facts": [], "hallucination": []}))
        .with_response(STAGE1_5, json!({"alignment": []}))
        .with_response(STAGE2, judgement("HIGH", "HIGH", "GOOD", "NONE"))
}

struct Fixture {
    _dir: tempfile::TempDir,
    root: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        Self { _dir: dir, root }
    }

    fn case(&self, id: &str, file: &str, source: &str, wiki: &str) -> CaseSpec {
        let src = self.root.join("src").join(file);
        let md = self.root.join("wiki").join(format!("{id}.md"));
        std::fs::create_dir_all(src.parent().unwrap()).unwrap();
        std::fs::create_dir_all(md.parent().unwrap()).unwrap();
        std::fs::write(&src, source).unwrap();
        std::fs::write(&md, wiki).unwrap();
        CaseSpec {
            id: id.to_string(),
            vars: CaseVars::new(src, md),
        }
    }

    fn java_cases(&self, n: usize) -> BatchConfig {
        BatchConfig {
            cases: (1..=n)
                .map(|i| {
                    self.case(
                        &format!("case{i}"),
                        &format!("Svc{i}.java"),
                        &format!("@Service class Svc{i} {{ public void run{i}() {{}} }}"),
                        &format!("# Svc{i}"),
                    )
                })
                .collect(),
        }
    }

    fn output(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

fn orchestrator(runner: &Arc<ScriptedRunner>, out: &Path) -> BatchOrchestrator {
    BatchOrchestrator::new(CaseRunner::new(runner.clone(), CaseSettings::default()), out)
}

fn status_without_timestamp(path: &Path) -> Value {
    let mut v: Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    v.as_object_mut().unwrap().remove("timestamp");
    v
}

#[tokio::test]
async fn java_service_happy_path() {
    let fx = Fixture::new();
    let cfg = BatchConfig {
        cases: vec![fx.case(
            "user_service",
            "UserService.java",
            concat!(
                "@Service\nclass UserService {\n",
                "  public User find(Long id) { return repo.byId(id); }\n",
                "}\n",
            ),
            "# UserService\n`find` queries a user by id.\n",
        )],
    };
    let runner = Arc::new(passing_runner());
    let outcome = orchestrator(&runner, &fx.output("out"))
        .run(&cfg, RunMode::All, &CancelSignal::never())
        .await
        .unwrap();

    let row = &outcome.results[0];
    assert_eq!(row.final_score, 90.0);
    assert_eq!(row.result, "PASS");
    let record = row.record.as_ref().expect("final_score.json is attached");
    assert_eq!(record.result, Verdict::Pass);
    assert_eq!(record.engineering_action.level, ActionLevel::PrimaryReference);

    let anchors: Value = serde_json::from_str(
        &std::fs::read_to_string(fx.output("out").join("user_service/anchors.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(anchors["artifact_type"], "SERVICE");
    assert_eq!(anchors["anchors"]["classes"], json!(["UserService"]));
    assert_eq!(anchors["anchors"]["methods"], json!(["find"]));
}

#[tokio::test]
async fn hallucinated_endpoint_is_untrustworthy() {
    let fx = Fixture::new();
    let cfg = BatchConfig {
        cases: vec![fx.case(
            "user_controller",
            "UserController.java",
            concat!(
                "@RestController class UserController { ",
                "@GetMapping(\"/users\") public List<User> list() { return null; } }",
            ),
            "# UserController\nAlso exposes `/deleteAll`.",
        )],
    };
    let runner = Arc::new(
        ScriptedRunner::new()
            .with_response(STAGE1, json!({"hallucination": []}))
            .with_response(STAGE1_5, json!({}))
            .with_response(STAGE2, judgement("MEDIUM", "MEDIUM", "MINOR_ISSUES", "SEVERE")),
    );
    let outcome = orchestrator(&runner, &fx.output("out"))
        .run(&cfg, RunMode::All, &CancelSignal::never())
        .await
        .unwrap();

    let row = &outcome.results[0];
    assert_eq!(row.final_score, 9.0);
    assert_eq!(row.result, "FAIL");
    assert_eq!(
        row.record.as_ref().unwrap().engineering_action.level,
        ActionLevel::Untrustworthy
    );
}

#[test]
fn commented_sql_table_counts_once() {
    let src = "-- select * from JIBT_USER\nselect * from JIBT_USER where id = 1;\n";
    let ex = extract_anchors(src, Language::Sql, &AnchorOptions::default());
    let tables: Vec<_> = ex.anchors.get("tables").unwrap().iter().cloned().collect();
    assert_eq!(tables, ["JIBT_USER"]);
}

#[tokio::test]
async fn python_class_with_partial_coverage() {
    let fx = Fixture::new();
    let case = fx.case(
        "repo_py",
        "repo.py",
        "class Repo:\n    def load(self):\n        pass\n",
        "# Repo\n`load` reads rows.",
    );
    let runner = Arc::new(
        ScriptedRunner::new()
            .with_response(
                STAGE1,
                json!({"coverage": {"total_items": 10, "covered_items": 9}, "hallucination": []}),
            )
            .with_response(STAGE1_5, json!({}))
            .with_response(STAGE2, judgement("HIGH", "MEDIUM", "GOOD", "NONE")),
    );
    let outcome = orchestrator(&runner, &fx.output("out"))
        .run(&BatchConfig { cases: vec![case] }, RunMode::All, &CancelSignal::never())
        .await
        .unwrap();

    let row = &outcome.results[0];
    assert_eq!(row.final_score, 76.0);
    let record = row.record.as_ref().unwrap();
    assert_eq!(record.details.coverage_rate, Some(0.9));
    assert_eq!(record.engineering_action.level, ActionLevel::SafeWithCaution);
}

/// Cases 1..=3 completed, case 4 failed, case 5 never run.
async fn prior_run(fx: &Fixture, out: &Path) -> BatchConfig {
    let full = fx.java_cases(5);
    let first_four = BatchConfig {
        cases: full.cases[..4].to_vec(),
    };
    let failing = Arc::new(passing_runner().fail_for_source(&full.cases[3].vars.source_code));
    let outcome = orchestrator(&failing, out)
        .run(&first_four, RunMode::All, &CancelSignal::never())
        .await
        .unwrap();
    assert_eq!(outcome.failed_count(), 1);
    full
}

#[tokio::test]
async fn resume_runs_only_unfinished_cases() {
    let fx = Fixture::new();
    let out = fx.output("out");
    let cfg = prior_run(&fx, &out).await;

    let runner = Arc::new(passing_runner());
    let outcome = orchestrator(&runner, &out)
        .run(&cfg, RunMode::Resume, &CancelSignal::never())
        .await
        .unwrap();

    assert_eq!(outcome.executed, ["case4", "case5"]);
    for (i, case) in cfg.cases.iter().enumerate() {
        let expected = if i >= 3 { 3 } else { 0 };
        assert_eq!(runner.templates_for(&case.vars.source_code).len(), expected, "{}", case.id);
    }
    let order: Vec<_> = outcome.results.iter().map(|r| r.case_id.as_str()).collect();
    assert_eq!(order, ["case1", "case2", "case3", "case4", "case5"]);
    assert!(outcome.results.iter().all(|r| r.result == "PASS"));
}

#[tokio::test]
async fn retry_runs_only_failed_cases() {
    let fx = Fixture::new();
    let out = fx.output("out");
    let cfg = prior_run(&fx, &out).await;
    let before = ExecutionStatus::load(&out.join("execution_status.json"));
    assert!(before.is_failed("case4"));

    let runner = Arc::new(passing_runner());
    let outcome = orchestrator(&runner, &out)
        .run(&cfg, RunMode::Retry, &CancelSignal::never())
        .await
        .unwrap();

    assert_eq!(outcome.executed, ["case4"]);
    assert_eq!(runner.invocations().len(), 3);

    let after = ExecutionStatus::load(&outcome.status_path);
    assert!(after.failed.is_empty());
    assert!(after.is_completed("case4"));
    assert!(!after.is_completed("case5"));
    let results: Vec<_> = outcome.results.iter().map(|r| r.result.as_str()).collect();
    assert_eq!(results, ["PASS", "PASS", "PASS", "PASS", "PENDING"]);
}

#[tokio::test]
async fn resume_of_finished_batch_is_a_no_op() {
    let fx = Fixture::new();
    let out = fx.output("out");
    let cfg = fx.java_cases(3);
    let first = Arc::new(passing_runner());
    let done = orchestrator(&first, &out)
        .run(&cfg, RunMode::All, &CancelSignal::never())
        .await
        .unwrap();
    let before = status_without_timestamp(&done.status_path);

    let second = Arc::new(passing_runner());
    let again = orchestrator(&second, &out)
        .run(&cfg, RunMode::Resume, &CancelSignal::never())
        .await
        .unwrap();

    assert!(second.invocations().is_empty());
    assert!(again.executed.is_empty());
    assert_eq!(status_without_timestamp(&again.status_path), before);
    assert_eq!(again.results, done.results);
}

#[tokio::test]
async fn retry_without_failures_invokes_nothing() {
    let fx = Fixture::new();
    let out = fx.output("out");
    let cfg = fx.java_cases(2);
    orchestrator(&Arc::new(passing_runner()), &out)
        .run(&cfg, RunMode::All, &CancelSignal::never())
        .await
        .unwrap();

    let runner = Arc::new(passing_runner());
    let outcome = orchestrator(&runner, &out)
        .run(&cfg, RunMode::Retry, &CancelSignal::never())
        .await
        .unwrap();
    assert!(runner.invocations().is_empty());
    assert!(outcome.executed.is_empty());
}

#[tokio::test]
async fn all_matches_resume_from_empty_status() {
    let fx = Fixture::new();
    let cfg = fx.java_cases(3);
    let runner = Arc::new(passing_runner().fail_for_source(&cfg.cases[1].vars.source_code));

    let all = orchestrator(&runner, &fx.output("all"))
        .run(&cfg, RunMode::All, &CancelSignal::never())
        .await
        .unwrap();
    let resume = orchestrator(&runner, &fx.output("resume"))
        .run(&cfg, RunMode::Resume, &CancelSignal::never())
        .await
        .unwrap();

    let view = |rows: &[wikijudge_core::engine::CaseResult]| {
        rows.iter()
            .map(|r| (r.case_id.clone(), r.final_score, r.result.clone()))
            .collect::<Vec<_>>()
    };
    assert_eq!(view(&all.results), view(&resume.results));
    assert_eq!(all.results[1].result, "ERROR");
    assert_eq!(all.results[1].final_score, 0.0);
}

#[tokio::test]
async fn all_mode_reruns_every_case() {
    let fx = Fixture::new();
    let out = fx.output("out");
    let cfg = prior_run(&fx, &out).await;

    let runner = Arc::new(passing_runner());
    let outcome = orchestrator(&runner, &out)
        .run(&cfg, RunMode::All, &CancelSignal::never())
        .await
        .unwrap();
    assert_eq!(outcome.executed.len(), 5);
    assert_eq!(runner.invocations().len(), 15);
}

#[tokio::test]
async fn all_mode_on_a_subset_keeps_other_cases_status() {
    let fx = Fixture::new();
    let out = fx.output("out");
    let full = fx.java_cases(3);
    let runner = Arc::new(passing_runner().fail_for_source(&full.cases[2].vars.source_code));
    orchestrator(&runner, &out)
        .run(&full, RunMode::All, &CancelSignal::never())
        .await
        .unwrap();

    let subset = BatchConfig {
        cases: full.cases[..1].to_vec(),
    };
    let rerun = Arc::new(passing_runner());
    let outcome = orchestrator(&rerun, &out)
        .run(&subset, RunMode::All, &CancelSignal::never())
        .await
        .unwrap();
    assert_eq!(outcome.executed, ["case1"]);

    let status = ExecutionStatus::load(&outcome.status_path);
    assert!(status.is_completed("case1"));
    assert!(status.is_completed("case2"));
    assert!(status.is_failed("case3"));
}

/// Snapshots the status file when the first call for `watched` arrives.
struct StatusSnapshot {
    inner: ScriptedRunner,
    watched: PathBuf,
    status_path: PathBuf,
    seen: Mutex<Option<ExecutionStatus>>,
}

#[async_trait]
impl JudgeRunner for StatusSnapshot {
    async fn invoke(&self, request: &JudgeRequest) -> Result<Value, JudgeError> {
        let is_watched = request
            .bindings
            .get("source_code")
            .and_then(|b| b.as_file())
            .is_some_and(|p| p == self.watched.as_path());
        if is_watched {
            let mut seen = self.seen.lock().unwrap();
            if seen.is_none() {
                *seen = Some(ExecutionStatus::load(&self.status_path));
            }
        }
        self.inner.invoke(request).await
    }

    fn runner_name(&self) -> &'static str {
        "status-snapshot"
    }
}

#[tokio::test]
async fn status_is_checkpointed_during_the_run() {
    let fx = Fixture::new();
    let out = fx.output("out");
    let cfg = fx.java_cases(3);
    let runner = Arc::new(StatusSnapshot {
        inner: passing_runner(),
        watched: cfg.cases[2].vars.source_code.clone(),
        status_path: out.join("execution_status.json"),
        seen: Mutex::new(None),
    });

    BatchOrchestrator::new(CaseRunner::new(runner.clone(), CaseSettings::default()), &out)
        .with_checkpoint_every(2)
        .run(&cfg, RunMode::All, &CancelSignal::never())
        .await
        .unwrap();

    let seen = runner.seen.lock().unwrap().clone().expect("case3 was judged");
    assert!(seen.is_completed("case1"));
    assert!(seen.is_completed("case2"));
    assert!(!seen.is_completed("case3"));
}

#[tokio::test]
async fn failed_case_leaves_no_score_and_batch_continues() {
    let fx = Fixture::new();
    let out = fx.output("out");
    let cfg = fx.java_cases(3);
    let runner = Arc::new(
        ScriptedRunner::new()
            .with_response(STAGE1, json!({}))
            .with_response(STAGE1_5, json!({}))
            .with_response(STAGE2, judgement("HIGH", "VERY_HIGH", "GOOD", "NONE"))
            .with_response_for(
                &cfg.cases[2].vars.source_code,
                STAGE2,
                judgement("HIGH", "HIGH", "GOOD", "NONE"),
            ),
    );
    let outcome = orchestrator(&runner, &out)
        .run(&cfg, RunMode::All, &CancelSignal::never())
        .await
        .unwrap();

    let results: Vec<_> = outcome.results.iter().map(|r| r.result.as_str()).collect();
    assert_eq!(results, ["ERROR", "ERROR", "PASS"]);
    assert!(outcome.results[0].error.as_deref().unwrap().contains("VERY_HIGH"));
    assert!(!out.join("case1/final_score.json").exists());
    assert!(out.join("case3/final_score.json").exists());
}

#[tokio::test]
async fn missing_input_fails_the_case_without_invoking_the_judge() {
    let fx = Fixture::new();
    let mut cfg = fx.java_cases(1);
    cfg.cases[0].vars.wiki_md = fx.root.join("wiki/absent.md");
    let runner = Arc::new(passing_runner());
    let outcome = orchestrator(&runner, &fx.output("out"))
        .run(&cfg, RunMode::All, &CancelSignal::never())
        .await
        .unwrap();
    assert!(runner.invocations().is_empty());
    assert_eq!(outcome.results[0].result, "ERROR");
    assert!(outcome.results[0].error.as_deref().unwrap().contains("absent.md"));
}

#[tokio::test]
async fn cancellation_marks_case_interrupted_and_saves_status() {
    let fx = Fixture::new();
    let out = fx.output("out");
    let cfg = fx.java_cases(2);
    let runner = Arc::new(passing_runner().with_delay(Duration::from_secs(30)));
    let (handle, signal) = cancel_pair();

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.cancel();
    });
    let err = orchestrator(&runner, &out)
        .run(&cfg, RunMode::All, &signal)
        .await
        .unwrap_err();
    canceller.await.unwrap();

    assert!(matches!(err, PipelineError::Cancelled));
    let status = ExecutionStatus::load(&out.join("execution_status.json"));
    let entry = status.failed.get("case1").expect("interrupted case recorded");
    assert_eq!(entry.status, STATUS_INTERRUPTED);
    assert!(!status.is_completed("case1"));
    assert!(!status.failed.contains_key("case2"));
    assert_eq!(runner.invocations().len(), 1);
}
