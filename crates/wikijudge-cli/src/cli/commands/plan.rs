use anyhow::Context;

use wikijudge_core::model::{BatchConfig, PlanSpec};
use wikijudge_core::report::PlanReport;

use super::super::args::PlanArgs;
use super::runtime::{execute_batch, pipeline_config};

pub async fn run(args: PlanArgs) -> anyhow::Result<i32> {
    let cfg = pipeline_config(&args.judge)?;
    let plan = PlanSpec::load(&args.plan)?;
    let all = BatchConfig::load(&args.paths.cases)
        .with_context(|| format!("failed to load cases from {}", args.paths.cases.display()))?;
    let batch = all.select(&plan.cases)?;
    tracing::info!(plan = %plan.name, cases = batch.cases.len(), "running plan");

    let end = execute_batch(&cfg, &batch, &args.paths.output, args.mode).await?;
    let report = PlanReport::new(&plan, args.mode, end.results().to_vec());
    let (json, _) = report.write(&args.paths.output)?;
    let s = &report.stats;
    eprintln!(
        "Plan '{}': {} total, {} passed, {} failed, {} errored ({})",
        plan.name,
        s.total,
        s.passed,
        s.failed,
        s.errored,
        json.display()
    );
    Ok(end.exit_code())
}
