use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use super::{extract_json_object, write_raw, Bindings, JudgeRequest, JudgeRunner};
use crate::errors::JudgeError;

/// A recorded call.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub template_id: String,
    pub bindings: Bindings,
    pub output_path: PathBuf,
}

impl Invocation {
    pub fn source_code(&self) -> Option<&Path> {
        self.bindings.get("source_code").and_then(|b| b.as_file())
    }
}

/// Scripted runner for tests. Answers per template id (optionally per
/// source file), records every invocation, and fails for configured sources.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    responses: HashMap<String, String>,
    per_source: HashMap<(PathBuf, String), String>,
    failing_sources: HashSet<PathBuf>,
    delay: Option<Duration>,
    calls: Mutex<Vec<Invocation>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, template_id: &str, response: Value) -> Self {
        self.responses.insert(template_id.to_string(), response.to_string());
        self
    }

    /// Answer with raw text, which goes through the usual JSON extraction.
    pub fn with_raw_response(mut self, template_id: &str, text: impl Into<String>) -> Self {
        self.responses.insert(template_id.to_string(), text.into());
        self
    }

    pub fn with_response_for(
        mut self,
        source: impl Into<PathBuf>,
        template_id: &str,
        response: Value,
    ) -> Self {
        self.per_source
            .insert((source.into(), template_id.to_string()), response.to_string());
        self
    }

    pub fn fail_for_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.failing_sources.insert(source.into());
        self
    }

    /// Sleep before answering; lets tests cancel mid-call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Template ids invoked for a given source file, in call order.
    pub fn templates_for(&self, source: &Path) -> Vec<String> {
        self.invocations()
            .into_iter()
            .filter(|i| i.source_code() == Some(source))
            .map(|i| i.template_id)
            .collect()
    }
}

#[async_trait]
impl JudgeRunner for ScriptedRunner {
    async fn invoke(&self, request: &JudgeRequest) -> Result<Value, JudgeError> {
        let invocation = Invocation {
            template_id: request.template_id.clone(),
            bindings: request.bindings.clone(),
            output_path: request.output_path.clone(),
        };
        let source = invocation.source_code().map(Path::to_path_buf);
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(invocation);
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let template_id = request.template_id.as_str();
        if let Some(src) = &source {
            if self.failing_sources.contains(src) {
                return Err(JudgeError::harness(
                    template_id,
                    format!("scripted failure for {}", src.display()),
                ));
            }
        }

        let text = source
            .and_then(|src| self.per_source.get(&(src, template_id.to_string())))
            .or_else(|| self.responses.get(template_id))
            .ok_or_else(|| JudgeError::harness(template_id, "no scripted response"))?;

        write_raw(&request.output_path, text.as_bytes()).await?;
        extract_json_object(template_id, text)
    }

    fn runner_name(&self) -> &'static str {
        "scripted"
    }
}
