use crate::artifacts::ArtifactStore;
use crate::llm::{CallPolicy, TextGenerator, generate_with_policy};
use crate::metadata::PageMetadata;
use crate::payload::extract_payload;
use crate::synthesize::TestCaseSpec;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info};

pub const SCRIPT_SYSTEM_PROMPT: &str =
    "You are a Selenium expert. Generate complete, runnable Python test scripts.";

const DRIVER_SETUP: &str = r#"from selenium import webdriver
from selenium.webdriver.chrome.service import Service
from webdriver_manager.chrome import ChromeDriverManager

service = Service(ChromeDriverManager().install())
driver = webdriver.Chrome(service=service)"#;

const READY_STATE_WAIT: &str = "Wait for the page to finish loading with \
WebDriverWait(driver, 30).until(lambda d: d.execute_script('return document.readyState') == 'complete') \
before interacting with it.";

const JQUERY_WAIT: &str = "The page uses jQuery. After loading and after every action that triggers \
AJAX, wait until d.execute_script('return window.jQuery == undefined || jQuery.active == 0') is true.";

const CAPTCHA_HANDLING: &str = "The page is protected by a CAPTCHA. Detect it with common selectors \
(iframe[src*='recaptcha'], iframe[src*='hcaptcha'], .g-recaptcha, .h-captcha, .cf-turnstile). \
If one is present, print instructions asking a human to solve it in the open browser, then wait up \
to 120 seconds for it to disappear, and fail the test with a clear message if it times out.";

/// Outcome of generating one script. `source` is empty when generation
/// failed; `artifact` is set once an accepted script has been saved.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedScript {
    pub test_case: TestCaseSpec,
    pub source: String,
    pub valid: bool,
    pub artifact: Option<PathBuf>,
}

/// A script is worth running only if it imports the automation library and
/// locates at least one element.
pub fn validate_script_structure(source: &str) -> bool {
    let has_import = source.lines().map(str::trim_start).any(|line| {
        (line.starts_with("from selenium") && line.contains(" import "))
            || line.starts_with("import selenium")
    });
    let has_locator = source.contains("By.") || source.contains("find_element");

    has_import && has_locator
}

pub struct ScriptGenerator {
    generator: Arc<dyn TextGenerator>,
    policy: CallPolicy,
    artifacts: Arc<ArtifactStore>,
}

impl ScriptGenerator {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        policy: CallPolicy,
        artifacts: Arc<ArtifactStore>,
    ) -> Self {
        Self {
            generator,
            policy,
            artifacts,
        }
    }

    pub async fn generate(
        &self,
        test_case: TestCaseSpec,
        metadata: &PageMetadata,
        page_source: &str,
    ) -> GeneratedScript {
        let prompt = build_script_prompt(&test_case, metadata, page_source);

        let source = match generate_with_policy(
            self.generator.as_ref(),
            SCRIPT_SYSTEM_PROMPT,
            &prompt,
            &self.policy,
        )
        .await
        {
            Ok(reply) => {
                debug!("Raw script reply for '{}': {}", test_case.name, reply);
                extract_payload(&reply, "python").to_string()
            }
            Err(e) => {
                error!("Script generation failed for '{}': {}", test_case.name, e);
                String::new()
            }
        };

        let valid = validate_script_structure(&source);
        let artifact = if valid {
            match self.artifacts.persist_script(&test_case.name, &source) {
                Ok(path) => Some(path),
                Err(e) => {
                    error!("Failed to save script for '{}': {}", test_case.name, e);
                    None
                }
            }
        } else {
            info!("Generated script for '{}' failed validation", test_case.name);
            None
        };

        GeneratedScript {
            test_case,
            source,
            valid,
            artifact,
        }
    }
}

pub fn build_script_prompt(
    test_case: &TestCaseSpec,
    metadata: &PageMetadata,
    page_source: &str,
) -> String {
    let mut requirements = vec![READY_STATE_WAIT];
    if page_source.to_ascii_lowercase().contains("jquery") {
        requirements.push(JQUERY_WAIT);
    }
    if metadata.has_captcha_indicator() {
        requirements.push(CAPTCHA_HANDLING);
    }

    let requirements = requirements
        .iter()
        .enumerate()
        .map(|(i, r)| format!("{}. {}", i + 1, r))
        .collect::<Vec<_>>()
        .join("\n");

    let spec = serde_json::to_string_pretty(test_case).unwrap_or_default();

    format!(
        r#"Write a Python Selenium 4 script that implements this test case exactly:
{spec}

Target URL: {url}

Initialize the driver exactly like this:
{DRIVER_SETUP}

Never use the legacy form webdriver.Chrome(ChromeDriverManager().install()).

Requirements:
{requirements}

Locate elements with By and explicit waits. Use the selectors from the test case
where they match the page. Print a clear PASS or FAIL line, exit with a non-zero
status on failure, and always call driver.quit() in a finally block.

Page metadata:
{metadata}

HTML:
{page_source}

Return only the script in a single ```python fenced block."#,
        url = metadata.url(),
        metadata = metadata.to_json_pretty(),
    )
}
