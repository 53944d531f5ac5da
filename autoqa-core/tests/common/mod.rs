// Shared fakes for pipeline tests
#![allow(dead_code)]

use async_trait::async_trait;
use autoqa_core::analyze::ANALYST_SYSTEM_PROMPT;
use autoqa_core::generate::SCRIPT_SYSTEM_PROMPT;
use autoqa_core::synthesize::QA_SYSTEM_PROMPT;
use autoqa_core::{Config, LlmError, TextGenerator};
use std::path::Path;
use std::sync::Mutex;

/// Passes the validator and exits 0 under `sh`.
pub const PASSING_SCRIPT: &str = "```python\nfrom selenium import webdriver 2>/dev/null\n: By.ID find_element\necho PASS\nexit 0\n```";

/// Passes the validator and exits 1 under `sh`.
pub const FAILING_SCRIPT: &str = "```python\nfrom selenium import webdriver 2>/dev/null\n: By.ID\necho 'element not found' >&2\nexit 1\n```";

/// Fails the validator.
pub const INVALID_SCRIPT: &str = "```python\nprint('no automation here')\n```";

/// Answers by role: the system prompt picks analysis, synthesis or
/// scripting. Script replies are chosen by the first needle found in the
/// user prompt. A missing reply is a permanent API error.
#[derive(Default)]
pub struct FakeGenerator {
    pub analysis: Option<String>,
    pub cases: Option<String>,
    pub scripts: Vec<(String, String)>,
    pub prompts: Mutex<Vec<(String, String)>>,
}

impl FakeGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_analysis(mut self, reply: &str) -> Self {
        self.analysis = Some(reply.to_string());
        self
    }

    pub fn with_cases(mut self, reply: &str) -> Self {
        self.cases = Some(reply.to_string());
        self
    }

    pub fn with_script(mut self, needle: &str, reply: &str) -> Self {
        self.scripts.push((needle.to_string(), reply.to_string()));
        self
    }

    /// User prompts sent with the given system prompt.
    pub fn prompts_for(&self, system: &str) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, _)| s == system)
            .map(|(_, u)| u.clone())
            .collect()
    }

    pub fn synthesis_prompts(&self) -> Vec<String> {
        self.prompts_for(QA_SYSTEM_PROMPT)
    }
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String, LlmError> {
        self.prompts
            .lock()
            .unwrap()
            .push((system_prompt.to_string(), user_prompt.to_string()));

        let reply = if system_prompt == ANALYST_SYSTEM_PROMPT {
            self.analysis.clone()
        } else if system_prompt == QA_SYSTEM_PROMPT {
            self.cases.clone()
        } else if system_prompt == SCRIPT_SYSTEM_PROMPT {
            self.scripts
                .iter()
                .find(|(needle, _)| user_prompt.contains(needle.as_str()))
                .map(|(_, reply)| reply.clone())
        } else {
            None
        };

        reply.ok_or(LlmError::Api {
            status: 400,
            message: "no canned reply".to_string(),
        })
    }
}

/// A config that keeps every artifact under `root` and never sleeps.
pub fn test_config(root: &Path) -> Config {
    let mut config = Config::default();
    config.paths.scripts_dir = root.join("test_scripts");
    config.paths.reports_dir = root.join("reports");
    config.paths.fixture_file = root.join("auth_test_data.json");
    config.crawl.pacing_ms = 0;
    config.crawl.attempts = 1;
    config.crawl.backoff_ms = 0;
    config.llm.attempts = 1;
    config.llm.backoff_ms = 0;
    config.llm.timeout_secs = 10;
    config.sandbox.interpreter = "sh".to_string();
    config.sandbox.timeout_secs = 10;
    config
}

pub fn write_fixture(root: &Path, content: &str) {
    std::fs::write(root.join("auth_test_data.json"), content).unwrap();
}

pub const LOGIN_PAGE: &str = r#"<html><head><title>Sign in</title></head><body>
<form id="login" action="/session" method="post">
  <input type="text" name="username" id="user">
  <input type="password" name="password" id="pass">
  <button type="submit" id="go">Log in</button>
</form>
</body></html>"#;

pub const CONTACT_PAGE: &str = r#"<html><head><title>Contact</title></head><body>
<form id="contact">
  <input type="email" name="email">
  <textarea name="message"></textarea>
  <button type="submit">Send</button>
</form>
</body></html>"#;
