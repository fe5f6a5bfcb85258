use super::markdown::details_text;
use crate::engine::CaseResult;

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn result_class(result: &str) -> &'static str {
    match result {
        "PASS" => "pass",
        "FAIL" => "fail",
        "ERROR" => "error",
        _ => "pending",
    }
}

pub fn render_html(title: &str, results: &[CaseResult]) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str(&format!("<title>{}</title>\n", escape(title)));
    html.push_str(
        "<style>\n\
         table { border-collapse: collapse; font-family: sans-serif; }\n\
         th, td { border: 1px solid #ccc; padding: 4px 8px; vertical-align: top; }\n\
         .pass { color: #1a7f37; } .fail { color: #cf222e; }\n\
         .error { color: #9a6700; } .pending { color: #6e7781; }\n\
         </style>\n",
    );
    html.push_str("</head>\n<body>\n");
    html.push_str(&format!("<h1>{}</h1>\n", escape(title)));
    html.push_str(
        "<table>\n<tr><th>Case ID</th><th>File</th><th>Result</th>\
         <th>Score</th><th>Details</th></tr>\n",
    );
    for row in results {
        let (summary, lines) = details_text(row);
        let body = lines
            .iter()
            .map(|l| escape(l))
            .collect::<Vec<_>>()
            .join("<br/>");
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td class=\"{}\">{}</td><td>{}</td>\
             <td><details><summary>{}</summary><div>{}</div></details></td></tr>\n",
            escape(&row.case_id),
            escape(&row.file),
            result_class(&row.result),
            escape(&row.result),
            row.final_score,
            escape(&summary),
            body
        ));
    }
    html.push_str("</table>\n</body>\n</html>\n");
    html
}
