use lazy_static::lazy_static;
use regex::Regex;

use super::lexer::{mask_non_code, Syntax};
use super::{AnchorOptions, AnchorSet};
use crate::model::ArtifactKind;

pub(crate) const CATEGORIES: &[&str] = &["classes", "methods", "fields", "annotations", "imports"];

lazy_static! {
    static ref TYPE_DECL: Regex =
        Regex::new(r"\b(?:class|interface|enum)\s+([A-Za-z_$][\w$]*)").unwrap();
    /// public/protected methods; group 1 is the name, never the return type.
    static ref METHOD: Regex = Regex::new(concat!(
        r"\b(?:public|protected)\s+",
        r"(?:(?:static|final|synchronized|abstract|native|default|strictfp)\s+)*",
        r"(?:<[^>]*>\s+)?[\w$.]+(?:\s*<[^(){};=]*>)?(?:\s*\[\s*\])*\s+",
        r"([A-Za-z_$][\w$]*)\s*\(",
    ))
    .unwrap();
    static ref FIELD: Regex = Regex::new(concat!(
        r"(?m)^[ \t]*(?:@[\w$.]+(?:\([^)]*\))?\s+)*",
        r"(?:(?:public|protected|private|static|final|transient|volatile)\s+)+",
        r"[\w$.]+(?:\s*<[^(){};=]*>)?(?:\s*\[\s*\])*\s+",
        r"([A-Za-z_$][\w$]*)\s*(?:[=,][^;]*)?;",
    ))
    .unwrap();
    static ref ANNOTATION: Regex = Regex::new(r"@(?:[a-z_][\w$]*\.)*([A-Z][\w$]*)").unwrap();
    static ref IMPORT: Regex =
        Regex::new(r"(?m)^\s*import\s+(?:static\s+)?([\w$.]+(?:\.\*)?)\s*;").unwrap();
    static ref ACCESSOR: Regex = Regex::new(r"^(?:get|set|is)[A-Z_]").unwrap();
}

const RESERVED: &[&str] = &["class", "interface", "enum", "return", "new", "throw"];

pub(crate) fn extract(source: &str, opts: &AnchorOptions) -> AnchorSet {
    let code = mask_non_code(source, Syntax::CLike);
    let mut anchors = AnchorSet::with_categories(CATEGORIES);

    for cap in TYPE_DECL.captures_iter(&code) {
        anchors.insert("classes", &cap[1]);
    }
    for cap in METHOD.captures_iter(&code) {
        let name = &cap[1];
        if opts.skip_accessors && ACCESSOR.is_match(name) {
            continue;
        }
        anchors.insert("methods", name);
    }
    for cap in FIELD.captures_iter(&code) {
        let name = &cap[1];
        if !RESERVED.contains(&name) {
            anchors.insert("fields", name);
        }
    }
    for cap in ANNOTATION.captures_iter(&code) {
        anchors.insert("annotations", &cap[1]);
    }
    for cap in IMPORT.captures_iter(&code) {
        anchors.insert("imports", &cap[1]);
    }
    anchors
}

pub(crate) fn classify(anchors: &AnchorSet) -> ArtifactKind {
    let has_annotation = |name: &str| anchors.contains("annotations", name);

    if has_annotation("Controller") || has_annotation("RestController") {
        ArtifactKind::Controller
    } else if has_annotation("Service") {
        ArtifactKind::Service
    } else if has_annotation("Repository") {
        ArtifactKind::Repository
    } else if !anchors.category_is_empty("fields") && anchors.category_is_empty("methods") {
        ArtifactKind::DataStructure
    } else {
        ArtifactKind::Unknown
    }
}
