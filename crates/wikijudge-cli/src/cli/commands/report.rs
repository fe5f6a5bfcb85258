use anyhow::Context;

use wikijudge_core::engine::layout::STATUS_FILE;
use wikijudge_core::engine::{collect_results, ExecutionStatus};
use wikijudge_core::model::BatchConfig;
use wikijudge_core::report::write_batch_reports;

use super::super::args::ReportArgs;
use crate::exit_codes::SUCCESS;

pub fn run(args: ReportArgs) -> anyhow::Result<i32> {
    let batch = BatchConfig::load(&args.paths.cases)
        .with_context(|| format!("failed to load cases from {}", args.paths.cases.display()))?;
    let status_path = args.paths.output.join(STATUS_FILE);
    let status = ExecutionStatus::load(&status_path);
    let results = collect_results(&batch, &status, &args.paths.output);
    let paths = write_batch_reports(&args.paths.output, &results, args.mode)?;
    eprintln!(
        "Rebuilt {} rows from {} into {}",
        results.len(),
        status_path.display(),
        paths.markdown.display()
    );
    Ok(SUCCESS)
}
