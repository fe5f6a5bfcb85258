//! Stage controller: runs stage 1, 1.5 and 2 in order for one case.
//!
//! Each stage sees only the case inputs and the persisted results of earlier
//! stages. A stage failure aborts the remaining stages.

use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

use super::cancel::CancelSignal;
use super::layout::CaseLayout;
use crate::errors::{PipelineError, PipelineResult};
use crate::fsio::write_json_atomic;
use crate::judge::{Bindings, JudgeRequest, JudgeRunner};
use crate::model::{ArtifactKind, StageId};

/// Everything a case contributes to stage bindings.
#[derive(Debug, Clone)]
pub struct StageInputs {
    pub source_code: PathBuf,
    pub wiki_md: PathBuf,
    pub anchors: PathBuf,
    pub artifact_type: ArtifactKind,
    /// Case-level variables forwarded to every stage.
    pub extras: Bindings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StageOutputs {
    pub stage1: Value,
    pub stage1_5: Value,
    pub stage2: Value,
}

pub struct StageController {
    runner: Arc<dyn JudgeRunner>,
    use_cache: bool,
}

impl StageController {
    pub fn new(runner: Arc<dyn JudgeRunner>) -> Self {
        Self {
            runner,
            use_cache: false,
        }
    }

    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.use_cache = enabled;
        self
    }

    /// Bindings for a stage. Extras go in first so they never shadow the fixed names.
    pub fn bindings_for(stage: StageId, inputs: &StageInputs, layout: &CaseLayout) -> Bindings {
        let mut b = inputs.extras.clone();
        b = b
            .file("source_code", &inputs.source_code)
            .file("wiki_md", &inputs.wiki_md);
        match stage {
            StageId::StructuralCoverage => b.file("engineering_anchors", &inputs.anchors),
            StageId::ExplanationAlignment => {
                b.inline("artifact_type", inputs.artifact_type.as_str())
            }
            StageId::EngineeringJudgement => b
                .inline("artifact_type", inputs.artifact_type.as_str())
                .file(
                    "structural_coverage_results",
                    layout.result(StageId::StructuralCoverage),
                )
                .file(
                    "explanation_alignment_results",
                    layout.result(StageId::ExplanationAlignment),
                ),
        }
    }

    /// Run one stage and persist its parsed JSON.
    pub async fn run_stage(
        &self,
        stage: StageId,
        inputs: &StageInputs,
        layout: &CaseLayout,
        cancel: &CancelSignal,
    ) -> PipelineResult<Value> {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        let request = JudgeRequest::new(
            stage.template_id(),
            Self::bindings_for(stage, inputs, layout),
            layout.raw(stage),
        )
        .with_cache(self.use_cache);

        let span = tracing::info_span!("stage", stage = %stage, template_id = stage.template_id());
        async {
            let started = Instant::now();
            let value = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
                res = self.runner.invoke(&request) => {
                    res.map_err(|e| PipelineError::stage(stage, e))?
                }
            };
            write_json_atomic(&layout.result(stage), &value)?;
            tracing::info!(
                elapsed_ms = started.elapsed().as_millis() as u64,
                runner = self.runner.runner_name(),
                "stage complete"
            );
            Ok::<Value, PipelineError>(value)
        }
        .instrument(span)
        .await
    }

    pub async fn run_all(
        &self,
        inputs: &StageInputs,
        layout: &CaseLayout,
        cancel: &CancelSignal,
    ) -> PipelineResult<StageOutputs> {
        let stage1 = self
            .run_stage(StageId::StructuralCoverage, inputs, layout, cancel)
            .await?;
        let stage1_5 = self
            .run_stage(StageId::ExplanationAlignment, inputs, layout, cancel)
            .await?;
        let stage2 = self
            .run_stage(StageId::EngineeringJudgement, inputs, layout, cancel)
            .await?;
        Ok(StageOutputs {
            stage1,
            stage1_5,
            stage2,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::cancel::cancel_pair;
    use crate::errors::JudgeError;
    use crate::judge::ScriptedRunner;
    use serde_json::json;
    use std::time::Duration;

    fn inputs(dir: &std::path::Path) -> StageInputs {
        let src = dir.join("A.java");
        let wiki = dir.join("A.md");
        std::fs::write(&src, "class A {}").unwrap();
        std::fs::write(&wiki, "# A").unwrap();
        StageInputs {
            source_code: src,
            wiki_md: wiki,
            anchors: dir.join("out/anchors.json"),
            artifact_type: ArtifactKind::Service,
            extras: Bindings::new()
                .inline("glossary", "terms")
                .inline("artifact_type", "SHADOWED"),
        }
    }

    fn scripted() -> ScriptedRunner {
        ScriptedRunner::new()
            .with_response(
                "stage1_fact_extractor",
                json!({"coverage": {"total_items": 2, "covered_items": 2}}),
            )
            .with_response("stage1_5_explanation_alignment", json!({"alignment": "ok"}))
            .with_response("stage2_explanatory_judge", json!({"usefulness_level": "HIGH"}))
    }

    #[test]
    fn stage_bindings_follow_the_template_contracts() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = inputs(dir.path());
        let layout = CaseLayout::new(dir.path().join("out"));

        let names = |stage| {
            StageController::bindings_for(stage, &inputs, &layout)
                .names()
                .map(str::to_string)
                .collect::<Vec<_>>()
        };
        assert_eq!(
            names(StageId::StructuralCoverage),
            ["artifact_type", "engineering_anchors", "glossary", "source_code", "wiki_md"]
        );
        assert_eq!(
            names(StageId::EngineeringJudgement),
            [
                "artifact_type",
                "explanation_alignment_results",
                "glossary",
                "source_code",
                "structural_coverage_results",
                "wiki_md"
            ]
        );

        let b = StageController::bindings_for(StageId::ExplanationAlignment, &inputs, &layout);
        assert_eq!(
            b.get("artifact_type"),
            Some(&crate::judge::Binding::Inline("SERVICE".into()))
        );
        let b = StageController::bindings_for(StageId::EngineeringJudgement, &inputs, &layout);
        assert_eq!(
            b.get("structural_coverage_results").and_then(|x| x.as_file()),
            Some(layout.result(StageId::StructuralCoverage).as_path())
        );
    }

    #[tokio::test]
    async fn stages_run_in_order_and_persist_results() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = inputs(dir.path());
        let layout = CaseLayout::new(dir.path().join("out"));
        let runner = Arc::new(scripted());
        let ctl = StageController::new(runner.clone());

        let out = ctl.run_all(&inputs, &layout, &CancelSignal::never()).await.unwrap();
        assert_eq!(out.stage2["usefulness_level"], "HIGH");

        let order: Vec<_> = runner.invocations().into_iter().map(|i| i.template_id).collect();
        assert_eq!(
            order,
            ["stage1_fact_extractor", "stage1_5_explanation_alignment", "stage2_explanatory_judge"]
        );
        for stage in StageId::ALL {
            assert!(layout.result(stage).is_file(), "{stage}");
            assert!(layout.raw(stage).is_file(), "{stage}");
        }
    }

    #[tokio::test]
    async fn invalid_output_aborts_with_stage_id() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = inputs(dir.path());
        let layout = CaseLayout::new(dir.path().join("out"));
        let runner = Arc::new(
            scripted().with_raw_response("stage1_5_explanation_alignment", "no json here"),
        );
        let ctl = StageController::new(runner.clone());

        let err = ctl.run_all(&inputs, &layout, &CancelSignal::never()).await.unwrap_err();
        match err {
            PipelineError::StageFailed { stage, source } => {
                assert_eq!(stage, StageId::ExplanationAlignment);
                assert!(matches!(source, JudgeError::OutputInvalid { .. }));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(runner.invocations().len(), 2);
        assert!(!layout.result(StageId::EngineeringJudgement).exists());
    }

    #[tokio::test]
    async fn cancellation_interrupts_a_running_stage() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = inputs(dir.path());
        let layout = CaseLayout::new(dir.path().join("out"));
        let runner = Arc::new(scripted().with_delay(Duration::from_secs(30)));
        let ctl = StageController::new(runner);
        let (handle, signal) = cancel_pair();

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            handle.cancel();
        });
        let run = ctl.run_all(&inputs, &layout, &signal);
        let err = tokio::time::timeout(Duration::from_secs(5), run)
            .await
            .unwrap()
            .unwrap_err();
        assert!(err.is_cancelled());
        canceller.await.unwrap();
    }
}
