//! Result aggregation: Markdown, HTML and YAML tables, plan reports, console summary.

pub mod console;
pub mod html;
pub mod markdown;
pub mod plan;
pub mod yaml;

use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

use crate::engine::{CaseResult, RunMode};
use crate::errors::PipelineResult;
use crate::fsio::write_atomic;

pub use plan::{PlanReport, PlanStats};

pub const SUMMARY_MD: &str = "results_summary.md";
pub const SUMMARY_HTML: &str = "results_summary.html";
const TITLE: &str = "Wiki Judge Results";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReportPaths {
    pub markdown: PathBuf,
    pub html: PathBuf,
    pub yaml: PathBuf,
}

/// `final_results-<ts>.yaml`, or `final_results_retry-<ts>.yaml` for retry runs.
pub fn yaml_file_name(mode: RunMode, at: &DateTime<Local>) -> String {
    let prefix = match mode {
        RunMode::Retry => "final_results_retry",
        RunMode::All | RunMode::Resume => "final_results",
    };
    format!("{}-{}.yaml", prefix, at.format("%Y%m%d_%H%M%S"))
}

pub fn write_batch_reports(
    output_root: &Path,
    results: &[CaseResult],
    mode: RunMode,
) -> PipelineResult<BatchReportPaths> {
    let paths = BatchReportPaths {
        markdown: output_root.join(SUMMARY_MD),
        html: output_root.join(SUMMARY_HTML),
        yaml: output_root.join(yaml_file_name(mode, &Local::now())),
    };
    write_atomic(&paths.markdown, markdown::render_markdown(TITLE, results).as_bytes())?;
    write_atomic(&paths.html, html::render_html(TITLE, results).as_bytes())?;
    write_atomic(&paths.yaml, yaml::render_yaml(results)?.as_bytes())?;
    tracing::info!(
        markdown = %paths.markdown.display(),
        yaml = %paths.yaml.display(),
        "reports written"
    );
    Ok(paths)
}
