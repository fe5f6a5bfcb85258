use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::markdown::render_markdown;
use crate::engine::{CaseResult, RunMode};
use crate::errors::PipelineResult;
use crate::fsio::{write_atomic, write_json_atomic};
use crate::model::PlanSpec;

pub const PLAN_REPORT_JSON: &str = "plan_report.json";
pub const PLAN_REPORT_MD: &str = "plan_report.md";

/// Aggregate numbers over a plan's cases. Score statistics cover scored (PASS/FAIL) cases only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStats {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub errored: usize,
    pub pending: usize,
    pub max_score: Option<f64>,
    pub min_score: Option<f64>,
    pub average_score: Option<f64>,
}

impl PlanStats {
    pub fn from_results(results: &[CaseResult]) -> Self {
        let scores: Vec<f64> = results
            .iter()
            .filter(|r| r.is_scored())
            .map(|r| r.final_score)
            .collect();
        let count = |label: &str| results.iter().filter(|r| r.result == label).count();
        let average_score = if scores.is_empty() {
            None
        } else {
            let avg = scores.iter().sum::<f64>() / scores.len() as f64;
            Some((avg * 100.0).round() / 100.0)
        };
        Self {
            total: results.len(),
            passed: count("PASS"),
            failed: count("FAIL"),
            errored: count("ERROR"),
            pending: count("PENDING"),
            max_score: scores.iter().copied().reduce(f64::max),
            min_score: scores.iter().copied().reduce(f64::min),
            average_score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanReport {
    pub name: String,
    pub description: String,
    pub mode: RunMode,
    pub generated_at: String,
    pub stats: PlanStats,
    pub results: Vec<CaseResult>,
}

impl PlanReport {
    pub fn new(plan: &PlanSpec, mode: RunMode, results: Vec<CaseResult>) -> Self {
        Self {
            name: plan.name.clone(),
            description: plan.description.clone(),
            mode,
            generated_at: chrono::Local::now().to_rfc3339(),
            stats: PlanStats::from_results(&results),
            results,
        }
    }

    pub fn render_markdown(&self) -> String {
        let fmt = |v: Option<f64>| v.map_or_else(|| "N/A".to_string(), |s| s.to_string());
        let s = &self.stats;
        let mut md = render_markdown(&format!("Plan report: {}", self.name), &self.results);
        if !self.description.is_empty() {
            md.push_str(&format!("\n{}\n", self.description));
        }
        md.push_str("\n## Statistics\n\n");
        md.push_str(&format!(
            "- Total: {}\n- Passed: {}\n- Failed: {}\n- Errored: {}\n- Pending: {}\n",
            s.total, s.passed, s.failed, s.errored, s.pending
        ));
        md.push_str(&format!(
            "- Max score: {}\n- Min score: {}\n- Average score: {}\n",
            fmt(s.max_score),
            fmt(s.min_score),
            fmt(s.average_score)
        ));
        md
    }

    /// Write `plan_report.json` and `plan_report.md` into `dir`.
    pub fn write(&self, dir: &Path) -> PipelineResult<(PathBuf, PathBuf)> {
        let json = dir.join(PLAN_REPORT_JSON);
        let md = dir.join(PLAN_REPORT_MD);
        write_json_atomic(&json, self)?;
        write_atomic(&md, self.render_markdown().as_bytes())?;
        Ok((json, md))
    }
}
