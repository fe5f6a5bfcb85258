use crate::engine::CaseResult;

fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', "<br/>")
}

/// Collapsible details for one row: the record's levels, or the error text.
pub(crate) fn details_text(row: &CaseResult) -> (String, Vec<String>) {
    if let Some(err) = &row.error {
        return ("Error occurred".to_string(), vec![err.clone()]);
    }
    let Some(rec) = &row.record else {
        return (format!("Result: {}", row.result), Vec::new());
    };
    let d = &rec.details;
    let rate = d
        .coverage_rate
        .map_or_else(|| "N/A".to_string(), |r| r.to_string());
    let summary = format!("Score: {}, Result: {}", rec.final_score, rec.result);
    let lines = vec![
        format!("Summary: {}", rec.summary),
        format!("Coverage: {}", d.coverage_level),
        format!("Usefulness: {}", d.usefulness_level),
        format!("Correctness: {}", d.correctness_level),
        format!("Hallucination: {}", d.hallucination_level),
        format!("Coverage Rate: {}", rate),
        format!("Action: {}", rec.engineering_action.level),
    ];
    (summary, lines)
}

pub fn render_markdown(title: &str, results: &[CaseResult]) -> String {
    let mut md = format!("# {title}\n\n");
    md.push_str("| Case ID | File | Result | Score | Details |\n");
    md.push_str("|--------|------|--------|-------|---------|\n");
    for row in results {
        let (summary, lines) = details_text(row);
        let details = if lines.is_empty() {
            cell(&summary)
        } else {
            format!(
                "<details><summary>{}</summary><div>{}</div></details>",
                cell(&summary),
                lines.iter().map(|l| cell(l)).collect::<Vec<_>>().join("<br/>")
            )
        };
        md.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            cell(&row.case_id),
            cell(&row.file),
            row.result,
            row.final_score,
            details
        ));
    }
    md
}
