//! Batch orchestrator: runs cases in config order with resumable status.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{Duration, Instant};

use super::cancel::CancelSignal;
use super::case::CaseRunner;
use super::layout::{CaseLayout, STATUS_FILE};
use super::status::{ExecutionStatus, STATUS_FAILED, STATUS_INTERRUPTED};
use crate::errors::{PipelineError, PipelineResult};
use crate::fsio::read_json;
use crate::model::{BatchConfig, CaseSpec};
use crate::scoring::FinalScoreRecord;

pub const RESULT_ERROR: &str = "ERROR";
pub const RESULT_PENDING: &str = "PENDING";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Run every configured case from scratch.
    All,
    /// Run everything not yet completed.
    #[default]
    Resume,
    /// Run only failed cases.
    Retry,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::All => "all",
            RunMode::Resume => "resume",
            RunMode::Retry => "retry",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunMode {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(RunMode::All),
            "resume" => Ok(RunMode::Resume),
            "retry" => Ok(RunMode::Retry),
            other => Err(PipelineError::Config(format!(
                "unknown mode '{other}' (expected all, resume or retry)"
            ))),
        }
    }
}

/// One row of the aggregated output, in config order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseResult {
    pub case_id: String,
    pub file: String,
    pub final_score: f64,
    /// `PASS`, `FAIL`, `ERROR` or `PENDING`.
    pub result: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<FinalScoreRecord>,
}

impl CaseResult {
    pub fn is_scored(&self) -> bool {
        self.result == "PASS" || self.result == "FAIL"
    }
}

#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub mode: RunMode,
    pub results: Vec<CaseResult>,
    /// Case ids executed by this run, in execution order.
    pub executed: Vec<String>,
    pub status_path: PathBuf,
    pub elapsed: Duration,
}

impl BatchOutcome {
    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| r.result == RESULT_ERROR).count()
    }
}

pub struct BatchOrchestrator {
    case_runner: CaseRunner,
    output_root: PathBuf,
    checkpoint_every: usize,
}

impl BatchOrchestrator {
    pub fn new(case_runner: CaseRunner, output_root: impl Into<PathBuf>) -> Self {
        Self {
            case_runner,
            output_root: output_root.into(),
            checkpoint_every: 5,
        }
    }

    pub fn with_checkpoint_every(mut self, n: usize) -> Self {
        self.checkpoint_every = n.max(1);
        self
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub fn status_path(&self) -> PathBuf {
        self.output_root.join(STATUS_FILE)
    }

    /// Cases a mode would execute, in config order.
    pub fn select<'a>(
        config: &'a BatchConfig,
        status: &ExecutionStatus,
        mode: RunMode,
    ) -> Vec<&'a CaseSpec> {
        config
            .cases
            .iter()
            .filter(|c| match mode {
                RunMode::All => true,
                RunMode::Resume => !status.is_completed(&c.id),
                RunMode::Retry => status.is_failed(&c.id),
            })
            .collect()
    }

    pub async fn run(
        &self,
        config: &BatchConfig,
        mode: RunMode,
        cancel: &CancelSignal,
    ) -> PipelineResult<BatchOutcome> {
        let started = Instant::now();
        std::fs::create_dir_all(&self.output_root)
            .map_err(|e| PipelineError::io(&self.output_root, e))?;
        let status_path = self.status_path();
        // entries of cases outside this config survive every mode
        let mut status = ExecutionStatus::load(&status_path);

        let selected = Self::select(config, &status, mode);
        tracing::info!(
            mode = %mode,
            total = config.cases.len(),
            selected = selected.len(),
            "batch starting"
        );

        let mut executed = Vec::with_capacity(selected.len());
        for (i, case) in selected.into_iter().enumerate() {
            status.forget(&case.id);
            executed.push(case.id.clone());
            let layout = CaseLayout::for_case(&self.output_root, &case.id);

            match self
                .case_runner
                .run(&case.id, &case.vars, layout.dir(), cancel)
                .await
            {
                Ok(record) => status.mark_completed(&case.id, &record),
                Err(PipelineError::Cancelled) => {
                    tracing::warn!(case_id = %case.id, "case interrupted; saving status");
                    status.mark_failed(&case.id, STATUS_INTERRUPTED, "cancelled");
                    status.save(&status_path)?;
                    return Err(PipelineError::Cancelled);
                }
                Err(e) => {
                    tracing::warn!(case_id = %case.id, error = %e, "case failed");
                    status.mark_failed(&case.id, STATUS_FAILED, e.to_string());
                }
            }

            if (i + 1) % self.checkpoint_every == 0 {
                status.save(&status_path)?;
            }
        }
        status.save(&status_path)?;

        let results = collect_results(config, &status, &self.output_root);
        Ok(BatchOutcome {
            mode,
            results,
            executed,
            status_path,
            elapsed: started.elapsed(),
        })
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Result rows for every configured case, in config order, from the status map.
pub fn collect_results(
    config: &BatchConfig,
    status: &ExecutionStatus,
    output_root: &Path,
) -> Vec<CaseResult> {
    config
        .cases
        .iter()
        .map(|case| {
            let file = file_name(&case.vars.source_code);
            if let Some(done) = status.completed.get(&case.id) {
                let path = CaseLayout::for_case(output_root, &case.id).final_score();
                let record = read_json::<FinalScoreRecord>(&path).ok();
                CaseResult {
                    case_id: case.id.clone(),
                    file,
                    final_score: done.final_score,
                    result: done.result.clone(),
                    error: None,
                    record,
                }
            } else if let Some(failed) = status.failed.get(&case.id) {
                CaseResult {
                    case_id: case.id.clone(),
                    file,
                    final_score: 0.0,
                    result: RESULT_ERROR.to_string(),
                    error: Some(failed.error.clone()),
                    record: None,
                }
            } else {
                CaseResult {
                    case_id: case.id.clone(),
                    file,
                    final_score: 0.0,
                    result: RESULT_PENDING.to_string(),
                    error: None,
                    record: None,
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::status::CompletedEntry;
    use crate::model::CaseVars;

    fn config(ids: &[&str]) -> BatchConfig {
        BatchConfig {
            cases: ids
                .iter()
                .map(|id| CaseSpec {
                    id: id.to_string(),
                    vars: CaseVars::new(format!("/src/{id}.java"), format!("/wiki/{id}.md")),
                })
                .collect(),
        }
    }

    fn status() -> ExecutionStatus {
        let mut s = ExecutionStatus::default();
        s.completed.insert(
            "a".into(),
            CompletedEntry {
                final_score: 90.0,
                result: "PASS".into(),
                status: "completed".into(),
                timestamp: "t".into(),
            },
        );
        s.mark_failed("c", STATUS_FAILED, "boom");
        s
    }

    fn ids<'a>(cfg: &'a BatchConfig, st: &ExecutionStatus, mode: RunMode) -> Vec<&'a str> {
        BatchOrchestrator::select(cfg, st, mode)
            .into_iter()
            .map(|c| c.id.as_str())
            .collect()
    }

    #[test]
    fn mode_selection() {
        let cfg = config(&["a", "b", "c", "d"]);
        let st = status();
        assert_eq!(ids(&cfg, &st, RunMode::All), ["a", "b", "c", "d"]);
        assert_eq!(ids(&cfg, &st, RunMode::Resume), ["b", "c", "d"]);
        assert_eq!(ids(&cfg, &st, RunMode::Retry), ["c"]);
    }

    #[test]
    fn results_follow_config_order() {
        let cfg = config(&["d", "c", "b", "a"]);
        let dir = tempfile::tempdir().unwrap();
        let rows = collect_results(&cfg, &status(), dir.path());
        let summary: Vec<_> = rows
            .iter()
            .map(|r| (r.case_id.as_str(), r.result.as_str(), r.final_score))
            .collect();
        assert_eq!(
            summary,
            [("d", "PENDING", 0.0), ("c", "ERROR", 0.0), ("b", "PENDING", 0.0), ("a", "PASS", 90.0)]
        );
        assert_eq!(rows[1].error.as_deref(), Some("boom"));
        assert_eq!(rows[3].file, "a.java");
    }

    #[test]
    fn modes_parse() {
        assert_eq!("RESUME".parse::<RunMode>().unwrap(), RunMode::Resume);
        assert!("sometimes".parse::<RunMode>().is_err());
        assert_eq!(RunMode::default(), RunMode::Resume);
    }
}
