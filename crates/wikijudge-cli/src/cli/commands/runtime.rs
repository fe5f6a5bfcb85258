//! Shared glue: config overrides, Ctrl-C bridging, batch execution.

use anyhow::Context;
use std::path::Path;

use wikijudge_core::config::{JudgeKind, PipelineConfig};
use wikijudge_core::engine::{
    cancel_pair, collect_results, BatchOrchestrator, BatchOutcome, CancelSignal, CaseResult,
    CaseRunner, ExecutionStatus, RunMode,
};
use wikijudge_core::model::BatchConfig;
use wikijudge_core::report::{self, console};
use wikijudge_core::PipelineError;

use super::super::args::JudgeArgs;
use crate::exit_codes::{INTERRUPTED, SUCCESS};

pub(crate) fn load_config(path: Option<&Path>) -> anyhow::Result<PipelineConfig> {
    PipelineConfig::load_or_default(path).context("failed to load pipeline config")
}

/// Config file plus command-line overrides.
pub(crate) fn pipeline_config(args: &JudgeArgs) -> anyhow::Result<PipelineConfig> {
    let mut cfg = load_config(args.config.as_deref())?;
    if let Some(dir) = &args.fixtures {
        cfg.judge.kind = JudgeKind::Fixtures;
        cfg.judge.fixtures.dir = dir.clone();
    }
    if let Some(kind) = args.judge {
        cfg.judge.kind = kind;
    }
    if args.cache {
        cfg.judge.no_cache = false;
    }
    Ok(cfg)
}

/// A cancel signal that fires on the first Ctrl-C.
pub(crate) fn ctrl_c_signal() -> CancelSignal {
    let (handle, signal) = cancel_pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("interrupt received; finishing current step and saving status");
            handle.cancel();
        }
    });
    signal
}

pub(crate) fn case_runner(cfg: &PipelineConfig) -> anyhow::Result<CaseRunner> {
    let runner = cfg.judge.build().context("failed to construct judge runner")?;
    Ok(CaseRunner::new(runner, cfg.case_settings()))
}

pub(crate) enum BatchEnd {
    Finished(BatchOutcome),
    Interrupted(Vec<CaseResult>),
}

impl BatchEnd {
    pub(crate) fn exit_code(&self) -> i32 {
        match self {
            BatchEnd::Finished(_) => SUCCESS,
            BatchEnd::Interrupted(_) => INTERRUPTED,
        }
    }

    pub(crate) fn results(&self) -> &[CaseResult] {
        match self {
            BatchEnd::Finished(outcome) => &outcome.results,
            BatchEnd::Interrupted(results) => results,
        }
    }
}

/// Run the batch and write the result tables. Failed cases are not fatal;
/// an interrupt still writes tables for whatever the status file holds.
pub(crate) async fn execute_batch(
    cfg: &PipelineConfig,
    batch: &BatchConfig,
    output: &Path,
    mode: RunMode,
) -> anyhow::Result<BatchEnd> {
    let orchestrator = BatchOrchestrator::new(case_runner(cfg)?, output)
        .with_checkpoint_every(cfg.batch.checkpoint_every);
    let cancel = ctrl_c_signal();

    let end = match orchestrator.run(batch, mode, &cancel).await {
        Ok(outcome) => {
            console::print_batch_summary(&outcome);
            BatchEnd::Finished(outcome)
        }
        Err(PipelineError::Cancelled) => {
            let status = ExecutionStatus::load(&orchestrator.status_path());
            eprintln!("interrupted; status saved to {}", orchestrator.status_path().display());
            BatchEnd::Interrupted(collect_results(batch, &status, output))
        }
        Err(e) => return Err(e).context("batch run failed"),
    };

    let paths = report::write_batch_reports(output, end.results(), mode)
        .context("failed to write reports")?;
    eprintln!("Results written to {}", paths.markdown.display());
    Ok(end)
}
