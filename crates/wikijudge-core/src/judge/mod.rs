//! Judge Runner capability: `(template id, bindings) → JSON object`.
//!
//! The pipeline never talks to a model directly. It hands a [`JudgeRequest`]
//! to a [`JudgeRunner`] and receives the parsed JSON body of the answer.
//! Implementations differ in how they reach the model:
//!
//! - [`HarnessRunner`] shells out to an external evaluation harness.
//! - [`LlmRunner`] renders a template itself and calls an
//!   [`LlmClient`](crate::providers::llm::LlmClient).
//! - [`FixtureRunner`] replays canned answers from disk.
//! - [`CachingRunner`] wraps any of the above with an on-disk cache.
//! - [`ScriptedRunner`] is the in-process test double.

mod cache;
mod extract;
mod fake;
mod fixtures;
mod harness;
mod llm;

pub use cache::CachingRunner;
pub use extract::extract_json_object;
pub use fake::{Invocation, ScriptedRunner};
pub use fixtures::FixtureRunner;
pub use harness::{HarnessConfig, HarnessRunner};
pub use llm::{render_template, LlmRunner};

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::errors::JudgeError;

/// One template variable. Files are read and inlined by runners that need the text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    Inline(String),
    File(PathBuf),
}

impl Binding {
    /// The binding's text content.
    pub async fn resolve(&self, name: &str) -> Result<String, JudgeError> {
        match self {
            Binding::Inline(s) => Ok(s.clone()),
            Binding::File(path) => {
                let bytes = tokio::fs::read(path).await.map_err(|source| JudgeError::Binding {
                    name: name.to_string(),
                    path: path.clone(),
                    source,
                })?;
                Ok(String::from_utf8_lossy(&bytes).into_owned())
            }
        }
    }

    pub fn as_file(&self) -> Option<&Path> {
        match self {
            Binding::File(p) => Some(p),
            Binding::Inline(_) => None,
        }
    }
}

/// Named bindings, ordered by name so invocations are reproducible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings(BTreeMap<String, Binding>);

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.0.insert(name.into(), Binding::File(path.into()));
        self
    }

    pub fn inline(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), Binding::Inline(value.into()));
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, binding: Binding) {
        self.0.insert(name.into(), binding);
    }

    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.0.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Binding)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Resolve every binding to text.
    pub async fn resolve_all(&self) -> Result<BTreeMap<String, String>, JudgeError> {
        let mut out = BTreeMap::new();
        for (name, binding) in &self.0 {
            out.insert(name.clone(), binding.resolve(name).await?);
        }
        Ok(out)
    }
}

#[derive(Debug, Clone)]
pub struct JudgeRequest {
    pub template_id: String,
    pub bindings: Bindings,
    /// Where the runner leaves its raw output.
    pub output_path: PathBuf,
    /// Skip any response cache for this call.
    pub no_cache: bool,
}

impl JudgeRequest {
    pub fn new(
        template_id: impl Into<String>,
        bindings: Bindings,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            template_id: template_id.into(),
            bindings,
            output_path: output_path.into(),
            no_cache: true,
        }
    }

    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.no_cache = !enabled;
        self
    }
}

#[async_trait]
pub trait JudgeRunner: Send + Sync {
    /// Run one template and return the parsed JSON object.
    async fn invoke(&self, request: &JudgeRequest) -> Result<Value, JudgeError>;

    fn runner_name(&self) -> &'static str;
}

#[async_trait]
impl<T: JudgeRunner + ?Sized> JudgeRunner for std::sync::Arc<T> {
    async fn invoke(&self, request: &JudgeRequest) -> Result<Value, JudgeError> {
        (**self).invoke(request).await
    }

    fn runner_name(&self) -> &'static str {
        (**self).runner_name()
    }
}

pub(crate) async fn write_raw(path: &Path, body: &[u8]) -> Result<(), JudgeError> {
    if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| JudgeError::io(dir, e))?;
    }
    tokio::fs::write(path, body)
        .await
        .map_err(|e| JudgeError::io(path, e))
}
