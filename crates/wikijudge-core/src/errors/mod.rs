//! Error taxonomy for the judging pipeline.
//!
//! Runner-level failures are [`JudgeError`]; the stage controller wraps them in
//! [`PipelineError::StageFailed`] so a case error always names the stage that broke.

use std::path::PathBuf;
use std::time::Duration;

use crate::model::StageId;

/// Failures of a single Judge Runner invocation.
#[derive(Debug, thiserror::Error)]
pub enum JudgeError {
    /// The harness answered, but the located output text is not a JSON object.
    #[error("judge output for '{template_id}' is not valid JSON: {reason}\n--- raw ---\n{raw}")]
    OutputInvalid {
        template_id: String,
        reason: String,
        raw: String,
    },

    #[error("judge '{template_id}' timed out after {}s", .elapsed.as_secs())]
    Timeout {
        template_id: String,
        elapsed: Duration,
    },

    /// The harness process failed or produced an unreadable result document.
    #[error("harness failed for '{template_id}': {message}")]
    Harness {
        template_id: String,
        message: String,
    },

    #[error("binding '{name}' references unreadable file {}: {source}", .path.display())]
    Binding {
        name: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("template '{template_id}': {message}")]
    Template {
        template_id: String,
        message: String,
    },

    #[error("provider error for '{template_id}': {message}")]
    Provider {
        template_id: String,
        message: String,
    },

    #[error("judge io error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl JudgeError {
    pub fn output_invalid(
        template_id: impl Into<String>,
        reason: impl Into<String>,
        raw: impl Into<String>,
    ) -> Self {
        Self::OutputInvalid {
            template_id: template_id.into(),
            reason: reason.into(),
            raw: raw.into(),
        }
    }

    pub fn harness(template_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Harness {
            template_id: template_id.into(),
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Stage-2 contained a missing or unrecognised categorical grade.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScoringError {
    #[error("scoring error: stage-2 judgement is missing '{0}'")]
    MissingField(String),

    #[error("scoring error: unrecognised value {value} for '{field}'")]
    UnknownValue { field: String, value: String },
}

impl ScoringError {
    pub fn unknown(field: &str, value: impl Into<String>) -> Self {
        Self::UnknownValue {
            field: field.to_string(),
            value: value.into(),
        }
    }
}

/// Case-level failure. Any of these aborts the case without a score.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("input file missing: {}", .0.display())]
    InputMissing(PathBuf),

    #[error("stage {stage} failed: {source}")]
    StageFailed {
        stage: StageId,
        #[source]
        source: JudgeError,
    },

    #[error(transparent)]
    Scoring(#[from] ScoringError),

    #[error("cancelled")]
    Cancelled,

    #[error("config error: {0}")]
    Config(String),

    #[error("io error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid json at {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl PipelineError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }

    pub fn stage(stage: StageId, source: JudgeError) -> Self {
        Self::StageFailed { stage, source }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
