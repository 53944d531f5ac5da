//! Runtime configuration, read from a TOML file. Every field has a default
//! so a missing file or a partial file both work.

use crate::error::{ConfigError, LlmError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "autoqa.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub crawl: CrawlConfig,
    pub sandbox: SandboxConfig,
    pub paths: PathsConfig,
    /// Upper bound on test cases generated and executed at once per page.
    pub workers: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            crawl: CrawlConfig::default(),
            sandbox: SandboxConfig::default(),
            paths: PathsConfig::default(),
            workers: 1,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load `path` if given, else `autoqa.toml` in the working directory if it
    /// exists, else the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    Self::load(fallback)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}

/// Which of the two configured models a client is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelRole {
    /// Page analysis and test-case synthesis. Replies are JSON documents.
    Analysis,
    /// Script generation. Replies are source code.
    Scripting,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// `openai`, `groq`, or any name when `base_url` is set.
    pub provider: String,
    pub base_url: Option<String>,
    pub analysis_model: String,
    pub scripting_model: String,
    pub temperature: f32,
    /// Environment variable holding the API key. Defaults per provider.
    pub api_key_env: Option<String>,
    pub timeout_secs: u64,
    pub attempts: usize,
    pub backoff_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            base_url: None,
            analysis_model: "gpt-4o".to_string(),
            scripting_model: "gpt-4o".to_string(),
            temperature: 0.3,
            api_key_env: None,
            timeout_secs: 120,
            attempts: 2,
            backoff_ms: 1000,
        }
    }
}

impl LlmConfig {
    pub fn resolved_base_url(&self) -> Result<String, LlmError> {
        if let Some(base) = &self.base_url {
            return Ok(base.trim_end_matches('/').to_string());
        }
        match self.provider.to_ascii_lowercase().as_str() {
            "openai" => Ok("https://api.openai.com/v1".to_string()),
            "groq" => Ok("https://api.groq.com/openai/v1".to_string()),
            other => Err(LlmError::UnsupportedProvider(other.to_string())),
        }
    }

    pub fn resolved_api_key_env(&self) -> String {
        if let Some(var) = &self.api_key_env {
            return var.clone();
        }
        match self.provider.to_ascii_lowercase().as_str() {
            "openai" => "OPENAI_API_KEY".to_string(),
            "groq" => "GROQ_API_KEY".to_string(),
            _ => "AUTOQA_API_KEY".to_string(),
        }
    }

    pub fn model_for(&self, role: ModelRole) -> &str {
        match role {
            ModelRole::Analysis => &self.analysis_model,
            ModelRole::Scripting => &self.scripting_model,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    pub max_depth: usize,
    /// Pause before each page load.
    pub pacing_ms: u64,
    pub navigation_timeout_secs: u64,
    pub attempts: usize,
    pub backoff_ms: u64,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_depth: 2,
            pacing_ms: 1000,
            navigation_timeout_secs: 10,
            attempts: 3,
            backoff_ms: 500,
        }
    }
}

impl CrawlConfig {
    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    pub interpreter: String,
    pub timeout_secs: u64,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            interpreter: "python3".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub scripts_dir: PathBuf,
    pub reports_dir: PathBuf,
    pub fixture_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            scripts_dir: PathBuf::from("test_scripts"),
            reports_dir: PathBuf::from("reports"),
            fixture_file: PathBuf::from("auth_test_data.json"),
        }
    }
}
