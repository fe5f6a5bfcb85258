//! Persistent batch execution status (`execution_status.json`).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::errors::PipelineResult;
use crate::fsio::write_json_atomic;
use crate::scoring::FinalScoreRecord;

pub const STATUS_COMPLETED: &str = "completed";
pub const STATUS_FAILED: &str = "failed";
pub const STATUS_INTERRUPTED: &str = "interrupted";

fn now() -> String {
    chrono::Local::now().to_rfc3339()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedEntry {
    pub final_score: f64,
    pub result: String,
    pub status: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedEntry {
    pub status: String,
    pub error: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionStatus {
    #[serde(default)]
    pub completed: BTreeMap<String, CompletedEntry>,
    #[serde(default)]
    pub failed: BTreeMap<String, FailedEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl ExecutionStatus {
    /// Load the status file. Missing starts fresh; unreadable is logged and starts fresh.
    pub fn load(path: &Path) -> Self {
        let text = match std::fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "cannot read status file; starting fresh"
                );
                return Self::default();
            }
        };
        match serde_json::from_str(&text) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "corrupt status file; starting fresh"
                );
                Self::default()
            }
        }
    }

    /// Stamp and write atomically.
    pub fn save(&mut self, path: &Path) -> PipelineResult<()> {
        self.timestamp = Some(now());
        write_json_atomic(path, self)?;
        tracing::debug!(
            path = %path.display(),
            completed = self.completed.len(),
            failed = self.failed.len(),
            "status saved"
        );
        Ok(())
    }

    pub fn is_completed(&self, case_id: &str) -> bool {
        self.completed.contains_key(case_id)
    }

    pub fn is_failed(&self, case_id: &str) -> bool {
        self.failed.contains_key(case_id)
    }

    /// Record success; a case is never both completed and failed.
    pub fn mark_completed(&mut self, case_id: &str, record: &FinalScoreRecord) {
        self.failed.remove(case_id);
        self.completed.insert(
            case_id.to_string(),
            CompletedEntry {
                final_score: record.final_score,
                result: record.result.as_str().to_string(),
                status: STATUS_COMPLETED.to_string(),
                timestamp: now(),
            },
        );
    }

    pub fn mark_failed(&mut self, case_id: &str, status: &str, error: impl Into<String>) {
        self.completed.remove(case_id);
        self.failed.insert(
            case_id.to_string(),
            FailedEntry {
                status: status.to_string(),
                error: error.into(),
                timestamp: now(),
            },
        );
    }

    /// Drop both entries; the case is about to run again.
    pub fn forget(&mut self, case_id: &str) {
        self.completed.remove(case_id);
        self.failed.remove(case_id);
    }
}
