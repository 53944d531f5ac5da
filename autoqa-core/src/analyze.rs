use crate::llm::{CallPolicy, TextGenerator, generate_with_policy};
use crate::metadata::PageMetadata;
use crate::payload::parse_json_payload;
use autoqa_scanner::StructuralFacts;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, error, warn};

pub const ANALYST_SYSTEM_PROMPT: &str =
    "You are a web page analyst. Extract structural and functional metadata from HTML.";

fn analysis_prompt(page_source: &str) -> String {
    format!(
        r#"Analyze this HTML and return a single JSON object with exactly these keys:
{{
    "auth_requirements": {{
        "auth_required": true or false,
        "auth_type": "login, registration, password reset, or none",
        "auth_fields": ["names of the credential fields"]
    }},
    "contact_form_fields": ["names of contact form fields, empty if there is no contact form"],
    "main_content": "short description of the page purpose",
    "key_actions": ["the main things a user can do here"],
    "content_hierarchy": ["major sections in document order"],
    "interactive_patterns": ["modals, tabs, carousels, dynamic loading and similar"],
    "security_indicators": ["CAPTCHA, CSRF tokens, rate limiting notices and similar"]
}}

HTML:
{page_source}"#
    )
}

/// Asks the analysis model what the page is for. Always yields an object;
/// anything unusable becomes `{}`.
pub struct SemanticAnalyzer {
    generator: Arc<dyn TextGenerator>,
    policy: CallPolicy,
}

impl SemanticAnalyzer {
    pub fn new(generator: Arc<dyn TextGenerator>, policy: CallPolicy) -> Self {
        Self { generator, policy }
    }

    pub async fn analyze(&self, page_source: &str) -> Map<String, Value> {
        let reply = match generate_with_policy(
            self.generator.as_ref(),
            ANALYST_SYSTEM_PROMPT,
            &analysis_prompt(page_source),
            &self.policy,
        )
        .await
        {
            Ok(reply) => reply,
            Err(e) => {
                error!("Semantic analysis failed: {}", e);
                return Map::new();
            }
        };

        debug!("Raw analysis reply: {}", reply);

        match parse_json_payload(&reply) {
            Some(Value::Object(fields)) => fields,
            Some(_) => {
                warn!("Analysis reply was JSON but not an object, ignoring it");
                Map::new()
            }
            None => {
                warn!("Could not parse analysis reply as JSON");
                Map::new()
            }
        }
    }

    pub async fn build_metadata(&self, structural: StructuralFacts, page_source: &str) -> PageMetadata {
        let semantic = self.analyze(page_source).await;
        PageMetadata::new(structural, semantic)
    }
}
