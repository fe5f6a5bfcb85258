use serde::Serialize;

use crate::engine::CaseResult;
use crate::errors::PipelineError;

#[derive(Serialize)]
struct YamlRow<'a> {
    case_id: &'a str,
    final_score: f64,
    result: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

#[derive(Serialize)]
struct YamlResults<'a> {
    results: Vec<YamlRow<'a>>,
}

pub fn render_yaml(results: &[CaseResult]) -> Result<String, PipelineError> {
    let doc = YamlResults {
        results: results
            .iter()
            .map(|r| YamlRow {
                case_id: &r.case_id,
                final_score: r.final_score,
                result: &r.result,
                error: r.error.as_deref(),
            })
            .collect(),
    };
    serde_yaml::to_string(&doc)
        .map_err(|e| PipelineError::Config(format!("yaml serialization failed: {e}")))
}
