//! Deterministic anchor extraction (no LM involved).
//!
//! Anchors are the named structural elements of a source file: classes,
//! methods, tables, procedures and so on. Stage 1 checks wiki coverage
//! against them. Comments and string literals never contribute anchors.

mod java;
mod lexer;
mod python;
mod sql;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::model::{ArtifactKind, Language};

/// Category name → distinct names, both sorted.
///
/// Every category defined for the language is present, even when empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnchorSet(BTreeMap<String, BTreeSet<String>>);

impl AnchorSet {
    pub(crate) fn with_categories(categories: &[&str]) -> Self {
        Self(
            categories
                .iter()
                .map(|c| (c.to_string(), BTreeSet::new()))
                .collect(),
        )
    }

    pub(crate) fn insert(&mut self, category: &str, name: &str) {
        let name = name.trim();
        if name.is_empty() {
            return;
        }
        self.0
            .entry(category.to_string())
            .or_default()
            .insert(name.to_string());
    }

    pub fn get(&self, category: &str) -> Option<&BTreeSet<String>> {
        self.0.get(category)
    }

    pub fn contains(&self, category: &str, name: &str) -> bool {
        self.0.get(category).is_some_and(|s| s.contains(name))
    }

    pub fn category_is_empty(&self, category: &str) -> bool {
        self.0.get(category).map_or(true, BTreeSet::is_empty)
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Total number of names across all categories.
    pub fn len(&self) -> usize {
        self.0.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Knobs for the extractor. Defaults match the legacy banking schemas the
/// pipeline was first pointed at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnchorOptions {
    /// Unqualified SQL table names are kept only with one of these prefixes (and an `_`).
    pub sql_table_prefixes: Vec<String>,
    /// Drop `get*`/`set*`/`is*` Java methods.
    pub skip_accessors: bool,
}

impl Default for AnchorOptions {
    fn default() -> Self {
        Self {
            sql_table_prefixes: ["JIBT", "GABT", "JIB", "GAB", "KK"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            skip_accessors: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorExtraction {
    pub anchors: AnchorSet,
    pub artifact_type: ArtifactKind,
}

/// Extract anchors and classify the artifact. Total: never fails, empty input gives empty sets.
pub fn extract_anchors(source: &str, language: Language, opts: &AnchorOptions) -> AnchorExtraction {
    match language {
        Language::Java => {
            let anchors = java::extract(source, opts);
            let artifact_type = java::classify(&anchors);
            AnchorExtraction {
                anchors,
                artifact_type,
            }
        }
        Language::Python => AnchorExtraction {
            anchors: python::extract(source),
            artifact_type: ArtifactKind::Unknown,
        },
        Language::Sql => {
            let anchors = sql::extract(source, opts);
            let artifact_type = if anchors.is_empty() {
                ArtifactKind::Unknown
            } else {
                ArtifactKind::SqlScript
            };
            AnchorExtraction {
                anchors,
                artifact_type,
            }
        }
    }
}

/// Category names produced for a language, in sorted order.
pub fn categories_for(language: Language) -> Vec<&'static str> {
    let mut cats: Vec<&'static str> = match language {
        Language::Java => java::CATEGORIES.to_vec(),
        Language::Python => python::CATEGORIES.to_vec(),
        Language::Sql => sql::CATEGORIES.to_vec(),
    };
    cats.sort_unstable();
    cats
}

/// Shape of `anchors.json`, the stage-1 `engineering_anchors` input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorReport {
    pub language: Language,
    pub artifact_type: ArtifactKind,
    pub anchors: AnchorSet,
}

impl AnchorReport {
    pub fn new(language: Language, extraction: AnchorExtraction) -> Self {
        Self {
            language,
            artifact_type: extraction.artifact_type,
            anchors: extraction.anchors,
        }
    }
}
