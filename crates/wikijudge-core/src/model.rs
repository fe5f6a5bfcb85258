use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::errors::PipelineError;

/// Source language of a judged artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Java,
    Python,
    Sql,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Java => "java",
            Language::Python => "python",
            Language::Sql => "sql",
        }
    }

    /// Language implied by a file extension. Unknown extensions fall back to Java.
    pub fn from_extension(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "sql" | "plsql" => Language::Sql,
            "py" | "txt" => Language::Python,
            _ => Language::Java,
        }
    }

    /// Explicit `language` var wins; otherwise the source extension decides.
    pub fn detect(vars: &CaseVars) -> Result<Self, PipelineError> {
        match vars.language.as_deref() {
            Some(lang) => lang.parse(),
            None => Ok(Self::from_extension(&vars.source_code)),
        }
    }
}

impl FromStr for Language {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "java" => Ok(Language::Java),
            "python" | "py" => Ok(Language::Python),
            "sql" | "plsql" | "oracle" => Ok(Language::Sql),
            _ => Err(PipelineError::UnsupportedLanguage(s.to_string())),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse classification of what a source file is; passed to the LM as context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArtifactKind {
    Controller,
    Service,
    Repository,
    DataStructure,
    Unknown,
    SqlScript,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Controller => "CONTROLLER",
            ArtifactKind::Service => "SERVICE",
            ArtifactKind::Repository => "REPOSITORY",
            ArtifactKind::DataStructure => "DATA_STRUCTURE",
            ArtifactKind::Unknown => "UNKNOWN",
            ArtifactKind::SqlScript => "SQL_SCRIPT",
        }
    }
}

impl FromStr for ArtifactKind {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CONTROLLER" => Ok(ArtifactKind::Controller),
            "SERVICE" => Ok(ArtifactKind::Service),
            "REPOSITORY" => Ok(ArtifactKind::Repository),
            "DATA_STRUCTURE" => Ok(ArtifactKind::DataStructure),
            "UNKNOWN" => Ok(ArtifactKind::Unknown),
            "SQL_SCRIPT" | "SQL" => Ok(ArtifactKind::SqlScript),
            other => Err(PipelineError::Config(format!(
                "unknown artifact_type override: {other}"
            ))),
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three LM stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageId {
    StructuralCoverage,
    ExplanationAlignment,
    EngineeringJudgement,
}

impl StageId {
    pub const ALL: [StageId; 3] = [
        StageId::StructuralCoverage,
        StageId::ExplanationAlignment,
        StageId::EngineeringJudgement,
    ];

    /// Prompt template consumed by this stage.
    pub fn template_id(&self) -> &'static str {
        match self {
            StageId::StructuralCoverage => "stage1_fact_extractor",
            StageId::ExplanationAlignment => "stage1_5_explanation_alignment",
            StageId::EngineeringJudgement => "stage2_explanatory_judge",
        }
    }

    /// Raw harness output file name.
    pub fn raw_file(&self) -> &'static str {
        match self {
            StageId::StructuralCoverage => "stage1.json",
            StageId::ExplanationAlignment => "stage1_5.json",
            StageId::EngineeringJudgement => "stage2_raw.json",
        }
    }

    /// Parsed LM JSON file name.
    pub fn result_file(&self) -> &'static str {
        match self {
            StageId::StructuralCoverage => "stage1_result.json",
            StageId::ExplanationAlignment => "stage1_5_result.json",
            StageId::EngineeringJudgement => "stage2.json",
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StageId::StructuralCoverage => "1",
            StageId::ExplanationAlignment => "1.5",
            StageId::EngineeringJudgement => "2",
        };
        f.write_str(s)
    }
}

/// Per-case variables from the batch config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseVars {
    pub source_code: PathBuf,
    pub wiki_md: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yaml_config: Option<PathBuf>,
    /// Any further template variables. Values naming an existing file are passed as file bindings.
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl CaseVars {
    pub fn new(source_code: impl Into<PathBuf>, wiki_md: impl Into<PathBuf>) -> Self {
        Self {
            source_code: source_code.into(),
            wiki_md: wiki_md.into(),
            language: None,
            artifact_type: None,
            yaml_config: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    fn resolve_against(&mut self, base: &Path) {
        let join = |p: &PathBuf| {
            if p.is_relative() {
                base.join(p)
            } else {
                p.clone()
            }
        };
        self.source_code = join(&self.source_code);
        self.wiki_md = join(&self.wiki_md);
        if let Some(y) = self.yaml_config.take() {
            self.yaml_config = Some(join(&y));
        }
        for value in self.extra.values_mut() {
            let candidate = base.join(value.as_str());
            if Path::new(value.as_str()).is_relative() && candidate.is_file() {
                *value = candidate.to_string_lossy().into_owned();
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseSpec {
    pub id: String,
    pub vars: CaseVars,
}

/// Ordered list of cases; order is the reporting order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    pub cases: Vec<CaseSpec>,
}

impl BatchConfig {
    /// Load a batch config. Relative paths are resolved against the config file's directory.
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let text = std::fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
        let mut cfg: BatchConfig = serde_yaml::from_str(&text).map_err(|e| {
            PipelineError::Config(format!("failed to parse {}: {}", path.display(), e))
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        for case in &mut cfg.cases {
            case.vars.resolve_against(base);
        }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        let mut seen = std::collections::HashSet::new();
        for case in &self.cases {
            validate_case_id(&case.id)?;
            if !seen.insert(case.id.as_str()) {
                return Err(PipelineError::Config(format!(
                    "duplicate case id: {}",
                    case.id
                )));
            }
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&CaseSpec> {
        self.cases.iter().find(|c| c.id == id)
    }

    /// Restrict to the given ids, in the order given. Unknown ids are a config error.
    pub fn select(&self, ids: &[String]) -> Result<BatchConfig, PipelineError> {
        let cases = ids
            .iter()
            .map(|id| {
                self.get(id).cloned().ok_or_else(|| {
                    PipelineError::Config(format!("plan references unknown case: {id}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let selected = BatchConfig { cases };
        selected.validate()?;
        Ok(selected)
    }
}

/// A named, ordered selection of cases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub cases: Vec<String>,
}

impl PlanSpec {
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let text = std::fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
        serde_yaml::from_str(&text).map_err(|e| {
            PipelineError::Config(format!("failed to parse plan {}: {}", path.display(), e))
        })
    }
}

/// A case id names a directory under the output root, so it must be a single plain component.
pub fn validate_case_id(id: &str) -> Result<(), PipelineError> {
    if id.trim().is_empty() {
        return Err(PipelineError::Config("case with empty id".into()));
    }
    if id.contains(['/', '\\']) || id.contains("..") || id == "." {
        return Err(PipelineError::Config(format!(
            "invalid case id '{id}': must not contain path separators or '..'"
        )));
    }
    Ok(())
}

/// `<8 hex chars of a v4 uuid>_<slug>`.
pub fn new_case_id(name: &str) -> String {
    let slug: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let slug = slug.trim_matches('_');
    let prefix = uuid::Uuid::new_v4().simple().to_string();
    if slug.is_empty() {
        prefix[..8].to_string()
    } else {
        format!("{}_{}", &prefix[..8], slug)
    }
}
