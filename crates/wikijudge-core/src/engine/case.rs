use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

use super::cancel::CancelSignal;
use super::layout::CaseLayout;
use super::stages::{StageController, StageInputs};
use crate::anchors::{extract_anchors, AnchorOptions, AnchorReport};
use crate::errors::{PipelineError, PipelineResult};
use crate::fsio::write_json_atomic;
use crate::judge::{Binding, Bindings, JudgeRunner};
use crate::model::{ArtifactKind, CaseVars, Language};
use crate::scoring::{self, FinalScoreRecord, ScoringRules};

#[derive(Debug, Clone, Default)]
pub struct CaseSettings {
    pub anchors: AnchorOptions,
    pub scoring: ScoringRules,
    pub use_cache: bool,
}

/// Drives anchors → stages → scorer for one artifact/wiki pair.
pub struct CaseRunner {
    stages: StageController,
    settings: CaseSettings,
}

impl CaseRunner {
    pub fn new(runner: Arc<dyn JudgeRunner>, settings: CaseSettings) -> Self {
        let stages = StageController::new(runner).with_cache(settings.use_cache);
        Self { stages, settings }
    }

    pub fn settings(&self) -> &CaseSettings {
        &self.settings
    }

    /// Run one case into `output_dir`. Writes `final_score.json` only on success.
    pub async fn run(
        &self,
        case_id: &str,
        vars: &CaseVars,
        output_dir: &Path,
        cancel: &CancelSignal,
    ) -> PipelineResult<FinalScoreRecord> {
        let span = tracing::info_span!("case", case_id = %case_id);
        self.run_inner(vars, output_dir, cancel).instrument(span).await
    }

    async fn run_inner(
        &self,
        vars: &CaseVars,
        output_dir: &Path,
        cancel: &CancelSignal,
    ) -> PipelineResult<FinalScoreRecord> {
        let started = Instant::now();
        // a rerun that fails for any reason must not leave the previous score behind
        let layout = CaseLayout::new(output_dir);
        let final_path = layout.final_score();
        if final_path.exists() {
            std::fs::remove_file(&final_path).map_err(|e| PipelineError::io(&final_path, e))?;
        }
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        precheck(vars)?;
        let language = Language::detect(vars)?;
        let override_kind = vars
            .artifact_type
            .as_deref()
            .map(str::parse::<ArtifactKind>)
            .transpose()?;

        std::fs::create_dir_all(layout.dir()).map_err(|e| PipelineError::io(layout.dir(), e))?;

        let bytes = tokio::fs::read(&vars.source_code)
            .await
            .map_err(|e| PipelineError::io(&vars.source_code, e))?;
        let source = String::from_utf8_lossy(&bytes);

        let extraction = extract_anchors(&source, language, &self.settings.anchors);
        let artifact_type = override_kind.unwrap_or(extraction.artifact_type);
        tracing::info!(
            language = %language,
            artifact_type = %artifact_type,
            anchors = extraction.anchors.len(),
            "anchors extracted"
        );
        let report = AnchorReport {
            language,
            artifact_type,
            anchors: extraction.anchors,
        };
        write_json_atomic(&layout.anchors(), &report)?;

        let inputs = StageInputs {
            source_code: vars.source_code.clone(),
            wiki_md: vars.wiki_md.clone(),
            anchors: layout.anchors(),
            artifact_type,
            extras: extra_bindings(vars),
        };
        let outputs = self.stages.run_all(&inputs, &layout, cancel).await?;

        let record =
            scoring::score(&outputs.stage2, Some(&outputs.stage1), &self.settings.scoring)?;
        write_json_atomic(&final_path, &record)?;
        tracing::info!(
            final_score = record.final_score,
            result = %record.result,
            level = %record.engineering_action.level,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "case scored"
        );
        Ok(record)
    }
}

/// Every file input must exist before any stage runs.
fn precheck(vars: &CaseVars) -> PipelineResult<()> {
    let required = [Some(&vars.source_code), Some(&vars.wiki_md), vars.yaml_config.as_ref()];
    for path in required.into_iter().flatten() {
        if !path.is_file() {
            return Err(PipelineError::InputMissing(path.clone()));
        }
    }
    Ok(())
}

/// `yaml_config` plus free-form vars. Values naming an existing file bind as files.
fn extra_bindings(vars: &CaseVars) -> Bindings {
    let mut b = Bindings::new();
    for (name, value) in &vars.extra {
        let path = PathBuf::from(value);
        let binding = if path.is_file() {
            Binding::File(path)
        } else {
            Binding::Inline(value.clone())
        };
        b.insert(name.clone(), binding);
    }
    if let Some(yaml) = &vars.yaml_config {
        b.insert("yaml_config", Binding::File(yaml.clone()));
    }
    b
}
