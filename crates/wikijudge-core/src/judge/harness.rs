use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;

use super::{extract_json_object, Binding, JudgeRequest, JudgeRunner};
use crate::errors::JudgeError;

/// Where the harness result document keeps the model's answer.
const OUTPUT_POINTER: &str = "/results/results/0/response/output";
const ERROR_POINTER: &str = "/results/results/0/error";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub program: String,
    pub args: Vec<String>,
    /// Directory holding one `<template_id>.yaml` per template.
    pub config_dir: PathBuf,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            program: "promptfoo".to_string(),
            args: vec!["eval".to_string()],
            config_dir: PathBuf::from("."),
        }
    }
}

/// Runs the external evaluation harness as a child process.
///
/// The child is killed when the invocation future is dropped, so a
/// cancelled stage never leaves a harness running.
pub struct HarnessRunner {
    config: HarnessConfig,
    timeout: Duration,
}

impl HarnessRunner {
    pub fn new(config: HarnessConfig, timeout: Duration) -> Self {
        Self { config, timeout }
    }

    /// Argument vector (without the program) for one request.
    pub fn command_args(&self, request: &JudgeRequest) -> Result<Vec<String>, JudgeError> {
        let mut args = self.config.args.clone();
        if request.no_cache {
            args.push("--no-cache".to_string());
        }
        let template = self
            .config
            .config_dir
            .join(format!("{}.yaml", request.template_id));
        args.push("--config".to_string());
        args.push(template.to_string_lossy().into_owned());

        for (name, binding) in request.bindings.iter() {
            let value = match binding {
                Binding::Inline(v) => v.clone(),
                Binding::File(path) => {
                    let abs = std::fs::canonicalize(path).map_err(|source| JudgeError::Binding {
                        name: name.to_string(),
                        path: path.clone(),
                        source,
                    })?;
                    format!("file://{}", abs.display())
                }
            };
            args.push("--var".to_string());
            args.push(format!("{name}={value}"));
        }

        args.push("--output".to_string());
        args.push(request.output_path.to_string_lossy().into_owned());
        Ok(args)
    }

    /// Pull the model answer out of a harness result document.
    pub fn parse_result_document(template_id: &str, doc: &Value) -> Result<Value, JudgeError> {
        match doc.pointer(OUTPUT_POINTER) {
            Some(Value::String(text)) => extract_json_object(template_id, text),
            Some(obj @ Value::Object(_)) => Ok(obj.clone()),
            Some(other) => extract_json_object(template_id, &other.to_string()),
            None => {
                let reason = doc
                    .pointer(ERROR_POINTER)
                    .and_then(Value::as_str)
                    .unwrap_or("result document has no response output");
                Err(JudgeError::harness(template_id, reason))
            }
        }
    }
}

fn tail(bytes: &[u8], max: usize) -> String {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim();
    let start = text
        .char_indices()
        .rev()
        .nth(max.saturating_sub(1))
        .map_or(0, |(i, _)| i);
    text[start..].to_string()
}

#[async_trait]
impl JudgeRunner for HarnessRunner {
    async fn invoke(&self, request: &JudgeRequest) -> Result<Value, JudgeError> {
        let template_id = request.template_id.as_str();
        let args = self.command_args(request)?;
        if let Some(dir) = request.output_path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| JudgeError::io(dir, e))?;
        }

        tracing::debug!(template_id, program = %self.config.program, ?args, "spawning harness");
        let started = Instant::now();
        let child = Command::new(&self.config.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                JudgeError::harness(
                    template_id,
                    format!("failed to spawn '{}': {}", self.config.program, e),
                )
            })?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(res) => res.map_err(|e| JudgeError::harness(template_id, e.to_string()))?,
            Err(_) => {
                return Err(JudgeError::Timeout {
                    template_id: template_id.to_string(),
                    elapsed: started.elapsed(),
                })
            }
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;

        if !output.status.success() {
            return Err(JudgeError::harness(
                template_id,
                format!("exited with {}: {}", output.status, tail(&output.stderr, 2000)),
            ));
        }
        tracing::info!(template_id, elapsed_ms, "harness finished");

        let text = tokio::fs::read_to_string(&request.output_path)
            .await
            .map_err(|e| JudgeError::io(&request.output_path, e))?;
        let doc: Value = serde_json::from_str(&text).map_err(|e| {
            JudgeError::harness(
                template_id,
                format!("unreadable result document {}: {}", request.output_path.display(), e),
            )
        })?;
        Self::parse_result_document(template_id, &doc)
    }

    fn runner_name(&self) -> &'static str {
        "harness"
    }
}
