use lazy_static::lazy_static;
use regex::Regex;

use super::lexer::{mask_non_code, Syntax};
use super::AnchorSet;

pub(crate) const CATEGORIES: &[&str] =
    &["classes", "functions", "async_functions", "decorators", "imports"];

lazy_static! {
    static ref CLASS: Regex = Regex::new(r"\bclass\s+([A-Za-z_]\w*)").unwrap();
    static ref ASYNC_DEF: Regex = Regex::new(r"\basync\s+def\s+([A-Za-z_]\w*)\s*\(").unwrap();
    static ref DEF: Regex = Regex::new(r"(\basync\s+)?\bdef\s+([A-Za-z_]\w*)\s*\(").unwrap();
    static ref DECORATOR: Regex = Regex::new(r"(?m)^\s*@([A-Za-z_][\w.]*)").unwrap();
    static ref IMPORT: Regex = Regex::new(r"(?m)^\s*(?:from|import)\s+([A-Za-z_][\w.]*)").unwrap();
}

pub(crate) fn extract(source: &str) -> AnchorSet {
    let code = mask_non_code(source, Syntax::Python);
    let mut anchors = AnchorSet::with_categories(CATEGORIES);

    for cap in CLASS.captures_iter(&code) {
        anchors.insert("classes", &cap[1]);
    }
    for cap in DEF.captures_iter(&code) {
        // `async def` lands in its own category only
        if cap.get(1).is_none() {
            anchors.insert("functions", &cap[2]);
        }
    }
    for cap in ASYNC_DEF.captures_iter(&code) {
        anchors.insert("async_functions", &cap[1]);
    }
    for cap in DECORATOR.captures_iter(&code) {
        anchors.insert("decorators", &cap[1]);
    }
    for cap in IMPORT.captures_iter(&code) {
        anchors.insert("imports", &cap[1]);
    }
    anchors
}
