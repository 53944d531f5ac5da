//! Turning page metadata into concrete test cases.

use crate::fixtures::FixtureData;
use crate::llm::{CallPolicy, TextGenerator, generate_with_policy};
use crate::metadata::PageMetadata;
use crate::payload::parse_json_payload;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub const QA_SYSTEM_PROMPT: &str = "You are a senior QA engineer. Generate comprehensive, \
executable test cases for web pages. Reply with JSON only.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", from = "String")]
pub enum TestType {
    Functional,
    AuthPositive,
    AuthNegative,
}

impl TestType {
    pub fn is_auth(self) -> bool {
        matches!(self, TestType::AuthPositive | TestType::AuthNegative)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TestType::Functional => "functional",
            TestType::AuthPositive => "auth-positive",
            TestType::AuthNegative => "auth-negative",
        }
    }
}

// Models get creative with the spelling ("auth_negative", "Auth Positive").
// Anything mentioning auth is an auth case; everything else is functional.
impl From<String> for TestType {
    fn from(raw: String) -> Self {
        let normalized = raw.trim().to_ascii_lowercase().replace(['_', ' '], "-");
        if !normalized.contains("auth") {
            TestType::Functional
        } else if normalized.contains("neg") {
            TestType::AuthNegative
        } else {
            TestType::AuthPositive
        }
    }
}

impl std::fmt::Display for TestType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One test case as proposed by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCaseSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub test_type: TestType,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub selectors: BTreeMap<String, String>,
    #[serde(default)]
    pub validation: String,
    #[serde(default)]
    pub test_data: BTreeMap<String, Value>,
}

/// Values from the command line that take precedence over the fixture file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialOverride {
    pub username: Option<String>,
    pub password: Option<String>,
}

pub struct Synthesizer {
    generator: Arc<dyn TextGenerator>,
    policy: CallPolicy,
    fixture_path: PathBuf,
    credentials: CredentialOverride,
}

impl Synthesizer {
    pub fn new(generator: Arc<dyn TextGenerator>, policy: CallPolicy, fixture_path: PathBuf) -> Self {
        Self {
            generator,
            policy,
            fixture_path,
            credentials: CredentialOverride::default(),
        }
    }

    pub fn with_credentials(mut self, credentials: CredentialOverride) -> Self {
        self.credentials = credentials;
        self
    }

    /// Fixture data for this page, if the page needs any and the file loads.
    pub fn fixtures_for(&self, metadata: &PageMetadata) -> Option<FixtureData> {
        if !metadata.auth_required() && !metadata.has_contact_form() {
            return None;
        }

        match FixtureData::load(&self.fixture_path) {
            Ok(data) => {
                let data = data.with_credentials(
                    self.credentials.username.as_deref(),
                    self.credentials.password.as_deref(),
                );
                if data.is_empty() {
                    warn!("Test data in {} has no usable values", self.fixture_path.display());
                    return None;
                }
                Some(data)
            }
            Err(e) => {
                error!("Failed to load test data: {}", e);
                None
            }
        }
    }

    pub async fn synthesize(&self, metadata: &PageMetadata, page_source: &str) -> Vec<TestCaseSpec> {
        let fixtures = self.fixtures_for(metadata);
        let prompt = build_synthesis_prompt(metadata, page_source, fixtures.as_ref());

        let reply = match generate_with_policy(
            self.generator.as_ref(),
            QA_SYSTEM_PROMPT,
            &prompt,
            &self.policy,
        )
        .await
        {
            Ok(reply) => reply,
            Err(e) => {
                error!("Test generation failed: {}", e);
                return Vec::new();
            }
        };

        let Some(mut cases) = parse_test_cases(&reply) else {
            error!("Could not parse test cases from model reply");
            debug!("Raw test case reply: {}", reply);
            return Vec::new();
        };

        match &fixtures {
            Some(data) => {
                for name in audit_fixture_usage(&cases, data) {
                    warn!("Test '{}' does not appear to use the provided test data", name);
                }
            }
            None => cases.retain(|case| {
                if case.test_type.is_auth() {
                    warn!(
                        "Discarding {} test '{}': no fixture data available",
                        case.test_type, case.name
                    );
                    false
                } else {
                    true
                }
            }),
        }

        info!("Generated {} test cases for {}", cases.len(), metadata.url());
        cases
    }
}

/// Parse `{"test_cases": [...]}` or a bare array. `None` when the reply has
/// no usable list at all; malformed entries inside a list are skipped.
pub fn parse_test_cases(reply: &str) -> Option<Vec<TestCaseSpec>> {
    let items = match parse_json_payload(reply)? {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("test_cases") {
            Some(Value::Array(items)) => items,
            _ => return None,
        },
        _ => return None,
    };

    let cases = items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value::<TestCaseSpec>(item) {
            Ok(case) => Some(case),
            Err(e) => {
                warn!("Skipping malformed test case #{}: {}", index + 1, e);
                None
            }
        })
        .collect();

    Some(cases)
}

/// Names of auth cases whose steps mention none of the fixture values.
pub fn audit_fixture_usage<'a>(cases: &'a [TestCaseSpec], fixtures: &FixtureData) -> Vec<&'a str> {
    let literals = fixtures.literal_values();

    cases
        .iter()
        .filter(|case| case.test_type.is_auth())
        .filter(|case| {
            !case
                .steps
                .iter()
                .any(|step| literals.iter().any(|value| step.contains(value.as_str())))
        })
        .map(|case| case.name.as_str())
        .collect()
}

fn pretty(value: &impl Serialize) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "null".to_string())
}

pub fn build_synthesis_prompt(
    metadata: &PageMetadata,
    page_source: &str,
    fixtures: Option<&FixtureData>,
) -> String {
    let mut prompt = format!(
        "Generate test cases for the page at {url}.\n\n\
         Page metadata:\n{metadata}\n\n\
         Selector hints:\n\
         - Title: {title}\n\
         - Forms: {forms}\n\
         - Buttons: {buttons}\n",
        url = metadata.url(),
        metadata = metadata.to_json_pretty(),
        title = metadata.field("title").unwrap_or(Value::Null),
        forms = metadata.field("forms").unwrap_or(Value::Null),
        buttons = metadata.field("buttons").unwrap_or(Value::Null),
    );

    match fixtures {
        Some(data) => {
            prompt.push_str(&format!(
                "\nUse this test data:\n{data}\n\n\
                 Test data rules:\n\
                 1. Positive auth tests (auth-positive) MUST type the EXACT values from credentials.valid.\n\
                 2. Negative auth tests (auth-negative) MUST type values from credentials.invalid.\n\
                 3. Include at least one negative test that leaves a required field empty.\n\
                 4. Apply the same rules to contact_form.valid and contact_form.invalid.\n\
                 5. Never invent credentials or form values when test data is provided.\n\n\
                 Authentication requirements of this page:\n{auth}\n",
                data = pretty(data),
                auth = pretty(&metadata.auth_requirements()),
            ));
        }
        None => prompt.push_str(
            "\nNo test data is available. Do not generate auth-positive or auth-negative tests; \
             generate functional tests only.\n",
        ),
    }

    if metadata.has_contact_form() {
        prompt.push_str(&format!(
            "\nThe page has a contact form with these fields:\n{fields}\n\
             Negative contact form tests must check for error messages shown on the page.\n",
            fields = pretty(&metadata.contact_form_fields()),
        ));
    }

    prompt.push_str(&format!(
        r#"
Reply with exactly one JSON object of this shape:
{{
    "test_cases": [
        {{
            "name": "descriptive test name",
            "type": "functional, auth-positive or auth-negative",
            "steps": ["step 1", "step 2"],
            "selectors": {{"element name": "CSS selector or XPath"}},
            "validation": "expected outcome",
            "test_data": {{"field": "value"}}
        }}
    ]
}}

HTML:
{page_source}"#
    ));

    prompt
}
