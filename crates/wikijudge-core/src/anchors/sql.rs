use lazy_static::lazy_static;
use regex::Regex;

use super::lexer::{mask_non_code, Syntax};
use super::{AnchorOptions, AnchorSet};

pub(crate) const CATEGORIES: &[&str] = &[
    "tables",
    "operations",
    "clauses",
    "procedures",
    "functions",
    "packages",
    "package_bodies",
    "triggers",
    "with_queries",
];

lazy_static! {
    static ref TABLE: Regex = Regex::new(
        r#"(?i)\b(?:from|join|into|update)\s+"?([A-Za-z_][\w$#]*(?:"?\."?[A-Za-z_][\w$#]*)?)"#
    )
    .unwrap();
    static ref OPERATION: Regex =
        Regex::new(r"(?i)\b(select|insert|update|delete|merge|truncate)\b").unwrap();
    static ref CLAUSE: Regex = Regex::new(
        r"(?i)\b(where|group\s+by|order\s+by|having|limit|with|connect\s+by|start\s+with)\b"
    )
    .unwrap();
    static ref CREATE: Regex = Regex::new(concat!(
        r"(?i)\bcreate\s+(?:or\s+replace\s+)?(?:(?:editionable|noneditionable)\s+)?",
        r"(procedure|function|package\s+body|package|trigger)\s+",
        r"([A-Za-z_][\w$#]*(?:\.[A-Za-z_][\w$#]*)?)",
    ))
    .unwrap();
    static ref CTE: Regex = Regex::new(r"(?i)\bwith\s+([A-Za-z_][\w$#]*)\s+as\s*\(").unwrap();
    static ref WS: Regex = Regex::new(r"\s+").unwrap();
}

/// Table candidates filtered to names that look like real schema objects:
/// schema-qualified with some length, or carrying a known prefix plus `_`.
fn is_table_name(name: &str, opts: &AnchorOptions) -> bool {
    let qualified = name.contains('.');
    if qualified && name.len() >= 5 {
        return true;
    }
    let bare = name.rsplit('.').next().unwrap_or(name);
    bare.contains('_')
        && opts
            .sql_table_prefixes
            .iter()
            .any(|p| bare.starts_with(&p.to_ascii_uppercase()))
}

pub(crate) fn extract(source: &str, opts: &AnchorOptions) -> AnchorSet {
    let code = mask_non_code(source, Syntax::Sql);
    let mut anchors = AnchorSet::with_categories(CATEGORIES);

    for cap in TABLE.captures_iter(&code) {
        let name = cap[1].replace('"', "").to_ascii_uppercase();
        if is_table_name(&name, opts) {
            anchors.insert("tables", &name);
        }
    }
    for cap in OPERATION.captures_iter(&code) {
        anchors.insert("operations", &cap[1].to_ascii_lowercase());
    }
    for cap in CLAUSE.captures_iter(&code) {
        let clause = WS.replace_all(&cap[1], " ").to_ascii_lowercase();
        anchors.insert("clauses", &clause);
    }
    for cap in CREATE.captures_iter(&code) {
        let kind = WS.replace_all(&cap[1], " ").to_ascii_lowercase();
        let category = match kind.as_str() {
            "procedure" => "procedures",
            "function" => "functions",
            "package body" => "package_bodies",
            "package" => "packages",
            _ => "triggers",
        };
        anchors.insert(category, &cap[2].to_ascii_uppercase());
    }
    for cap in CTE.captures_iter(&code) {
        anchors.insert("with_queries", &cap[1]);
    }
    anchors
}
