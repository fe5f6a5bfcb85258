use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;

use super::harness::HarnessRunner;
use super::{extract_json_object, write_raw, JudgeRequest, JudgeRunner};
use crate::errors::JudgeError;

/// Replays `<dir>/<template_id>.json` for every request.
///
/// The file may hold either a bare model answer or a full harness result
/// document; the latter is unwrapped the same way the harness runner does.
pub struct FixtureRunner {
    dir: PathBuf,
}

impl FixtureRunner {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl JudgeRunner for FixtureRunner {
    async fn invoke(&self, request: &JudgeRequest) -> Result<Value, JudgeError> {
        let template_id = request.template_id.as_str();
        let path = self.dir.join(format!("{template_id}.json"));
        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| JudgeError::io(&path, e))?;

        // touch every file binding so missing inputs fail like a real run
        for (name, binding) in request.bindings.iter() {
            if binding.as_file().is_some() {
                binding.resolve(name).await?;
            }
        }

        write_raw(&request.output_path, text.as_bytes()).await?;
        let value = extract_json_object(template_id, &text)?;
        if value.get("results").is_some() {
            return HarnessRunner::parse_result_document(template_id, &value);
        }
        Ok(value)
    }

    fn runner_name(&self) -> &'static str {
        "fixtures"
    }
}
