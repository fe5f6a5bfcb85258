use std::path::{Path, PathBuf};

use crate::model::StageId;

pub const ANCHORS_FILE: &str = "anchors.json";
pub const FINAL_SCORE_FILE: &str = "final_score.json";
pub const STATUS_FILE: &str = "execution_status.json";

/// File names inside one case's output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseLayout {
    dir: PathBuf,
}

impl CaseLayout {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `<output_root>/<case_id>`.
    pub fn for_case(output_root: &Path, case_id: &str) -> Self {
        Self::new(output_root.join(case_id))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn anchors(&self) -> PathBuf {
        self.dir.join(ANCHORS_FILE)
    }

    pub fn raw(&self, stage: StageId) -> PathBuf {
        self.dir.join(stage.raw_file())
    }

    pub fn result(&self, stage: StageId) -> PathBuf {
        self.dir.join(stage.result_file())
    }

    pub fn final_score(&self) -> PathBuf {
        self.dir.join(FINAL_SCORE_FILE)
    }
}
