use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failures talking to the text-generation backend.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Response contained no message content")]
    EmptyResponse,

    #[error("Missing API key: environment variable {0} is not set")]
    MissingApiKey(String),

    #[error("Unsupported provider '{0}' (set llm.base_url for custom endpoints)")]
    UnsupportedProvider(String),

    #[error("Call timed out after {0:?}")]
    Timeout(Duration),
}

impl LlmError {
    pub fn is_transient(&self) -> bool {
        match self {
            LlmError::Http(e) => e.is_timeout() || e.is_connect(),
            LlmError::Api { status, .. } => *status == 429 || *status >= 500,
            LlmError::Timeout(_) => true,
            _ => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("Failed to read fixture file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Fixture file {} is not valid JSON: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Fixture file {} must contain a JSON object", .path.display())]
    NotAnObject { path: PathBuf },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Text generation setup failed: {0}")]
    Llm(#[from] LlmError),

    #[error("Artifact error: {0}")]
    Artifact(#[from] ArtifactError),
}

pub type Result<T> = std::result::Result<T, WorkflowError>;
