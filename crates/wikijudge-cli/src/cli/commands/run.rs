use anyhow::Context;

use wikijudge_core::model::BatchConfig;

use super::super::args::{MultiCasesCli, RunArgs};
use super::runtime::{execute_batch, pipeline_config};

pub async fn run(args: RunArgs) -> anyhow::Result<i32> {
    let cfg = pipeline_config(&args.judge)?;
    let batch = BatchConfig::load(&args.paths.cases)
        .with_context(|| format!("failed to load cases from {}", args.paths.cases.display()))?;
    let end = execute_batch(&cfg, &batch, &args.paths.output, args.mode).await?;
    Ok(end.exit_code())
}

/// Entry for the `run_multi_cases` binary.
pub async fn run_multi_cases(cli: MultiCasesCli) -> anyhow::Result<i32> {
    run(RunArgs {
        mode: cli.mode,
        paths: cli.paths,
        judge: cli.judge,
    })
    .await
}
