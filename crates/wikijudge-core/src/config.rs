//! Pipeline configuration (`wikijudge.yaml`). Every field has a default, so an
//! absent file and an empty file behave the same.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::anchors::AnchorOptions;
use crate::engine::CaseSettings;
use crate::errors::PipelineError;
use crate::judge::{
    CachingRunner, FixtureRunner, HarnessConfig, HarnessRunner, JudgeRunner, LlmRunner,
};
use crate::providers::llm::openai::{OpenAIClient, DEFAULT_BASE_URL};
use crate::providers::llm::LlmClient;
use crate::scoring::ScoringRules;

pub const DEFAULT_CONFIG_FILE: &str = "wikijudge.yaml";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JudgeKind {
    #[default]
    Harness,
    Llm,
    Fixtures,
}

impl FromStr for JudgeKind {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "harness" => Ok(Self::Harness),
            "llm" => Ok(Self::Llm),
            "fixtures" => Ok(Self::Fixtures),
            other => Err(PipelineError::Config(format!(
                "unknown judge kind '{other}' (expected harness, llm or fixtures)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub base_url: String,
    pub model: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub templates_dir: PathBuf,
    pub cache_dir: Option<PathBuf>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            temperature: 0.0,
            max_tokens: 4096,
            templates_dir: PathBuf::from("prompts"),
            cache_dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixtureSettings {
    pub dir: PathBuf,
}

impl Default for FixtureSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("fixtures"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JudgeSettings {
    pub kind: JudgeKind,
    pub timeout_secs: u64,
    pub no_cache: bool,
    pub harness: HarnessConfig,
    pub llm: LlmSettings,
    pub fixtures: FixtureSettings,
}

impl Default for JudgeSettings {
    fn default() -> Self {
        Self {
            kind: JudgeKind::default(),
            timeout_secs: 1800,
            no_cache: true,
            harness: HarnessConfig::default(),
            llm: LlmSettings::default(),
            fixtures: FixtureSettings::default(),
        }
    }
}

impl JudgeSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Construct the configured runner.
    pub fn build(&self) -> Result<Arc<dyn JudgeRunner>, PipelineError> {
        let runner: Arc<dyn JudgeRunner> = match self.kind {
            JudgeKind::Harness => {
                Arc::new(HarnessRunner::new(self.harness.clone(), self.timeout()))
            }
            JudgeKind::Fixtures => Arc::new(FixtureRunner::new(self.fixtures.dir.clone())),
            JudgeKind::Llm => {
                let llm = &self.llm;
                let api_key = std::env::var(&llm.api_key_env).ok().filter(|k| !k.is_empty());
                if api_key.is_none() && llm.base_url == DEFAULT_BASE_URL {
                    return Err(PipelineError::Config(format!(
                        "judge kind 'llm' targets {} but {} is not set",
                        DEFAULT_BASE_URL, llm.api_key_env
                    )));
                }
                let client: Arc<dyn LlmClient> = Arc::new(
                    OpenAIClient::new(llm.model.clone(), api_key, llm.temperature, llm.max_tokens)
                        .with_base_url(llm.base_url.clone()),
                );
                let inner = LlmRunner::new(client, llm.templates_dir.clone(), self.timeout());
                match &llm.cache_dir {
                    Some(dir) => Arc::new(CachingRunner::new(inner, dir.clone())),
                    None => Arc::new(inner),
                }
            }
        };
        tracing::debug!(runner = runner.runner_name(), "judge runner ready");
        Ok(runner)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSettings {
    /// Persist the status file after this many processed cases.
    pub checkpoint_every: usize,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self { checkpoint_every: 5 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub judge: JudgeSettings,
    pub anchors: AnchorOptions,
    pub scoring: ScoringRules,
    pub batch: BatchSettings,
}

impl PipelineConfig {
    pub fn from_yaml(text: &str) -> Result<Self, PipelineError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
            .map_err(|e| PipelineError::Config(format!("invalid pipeline config: {e}")))
    }

    /// Load from `path`; relative directories resolve against the file's directory.
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let text = std::fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
        let mut cfg = Self::from_yaml(&text).map_err(|e| match e {
            PipelineError::Config(msg) => {
                PipelineError::Config(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })?;
        cfg.resolve_against(path.parent().unwrap_or_else(|| Path::new(".")));
        Ok(cfg)
    }

    /// `path` if given, else `./wikijudge.yaml` when present, else defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, PipelineError> {
        match path {
            Some(p) => Self::load(p),
            None => {
                let local = Path::new(DEFAULT_CONFIG_FILE);
                if local.is_file() {
                    Self::load(local)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    fn resolve_against(&mut self, base: &Path) {
        let fix = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        fix(&mut self.judge.harness.config_dir);
        fix(&mut self.judge.llm.templates_dir);
        fix(&mut self.judge.fixtures.dir);
        if let Some(dir) = self.judge.llm.cache_dir.as_mut() {
            fix(dir);
        }
    }

    pub fn case_settings(&self) -> CaseSettings {
        CaseSettings {
            anchors: self.anchors.clone(),
            scoring: self.scoring.clone(),
            use_cache: !self.judge.no_cache,
        }
    }
}
