pub mod analyze;
pub mod artifacts;
pub mod config;
pub mod crawl;
pub mod error;
pub mod fixtures;
pub mod generate;
pub mod llm;
pub mod metadata;
pub mod payload;
pub mod report;
pub mod sandbox;
pub mod synthesize;
pub mod workflow;

pub use analyze::SemanticAnalyzer;
pub use artifacts::ArtifactStore;
pub use config::{Config, ModelRole};
pub use error::{ArtifactError, ConfigError, FixtureError, LlmError, WorkflowError};
pub use fixtures::FixtureData;
pub use generate::{GeneratedScript, ScriptGenerator, validate_script_structure};
pub use llm::{CallPolicy, ChatClient, TextGenerator};
pub use metadata::PageMetadata;
pub use report::{Report, ResultLog, TestRecord};
pub use sandbox::{ExecutionResult, Sandbox};
pub use synthesize::{CredentialOverride, Synthesizer, TestCaseSpec, TestType};
pub use workflow::{PageOutcome, Pipeline, WorkflowMode, WorkflowOutcome};
