use autoqa_scanner::StructuralFacts;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

const CAPTCHA_MARKERS: [&str; 4] = ["captcha", "recaptcha", "hcaptcha", "turnstile"];

/// Everything known about one page: deterministic structure plus whatever
/// the semantic analyzer produced. Semantic keys win on collision in the
/// merged view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageMetadata {
    pub structural: StructuralFacts,
    pub semantic: Map<String, Value>,
}

impl PageMetadata {
    pub fn new(structural: StructuralFacts, semantic: Map<String, Value>) -> Self {
        Self {
            structural,
            semantic,
        }
    }

    pub fn merged(&self) -> Map<String, Value> {
        let mut merged = match serde_json::to_value(&self.structural) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        merged.extend(self.semantic.clone());
        merged
    }

    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(&self.merged()).unwrap_or_else(|_| "{}".to_string())
    }

    /// A field from the merged view without building the whole map.
    pub fn field(&self, key: &str) -> Option<Value> {
        if let Some(value) = self.semantic.get(key) {
            return Some(value.clone());
        }
        match serde_json::to_value(&self.structural) {
            Ok(Value::Object(mut map)) => map.remove(key),
            _ => None,
        }
    }

    pub fn url(&self) -> &str {
        &self.structural.url
    }

    pub fn title(&self) -> &str {
        &self.structural.title
    }

    pub fn auth_requirements(&self) -> Option<&Map<String, Value>> {
        self.semantic.get("auth_requirements")?.as_object()
    }

    pub fn auth_required(&self) -> bool {
        self.auth_requirements()
            .and_then(|auth| auth.get("auth_required"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn contact_form_fields(&self) -> &[Value] {
        self.semantic
            .get("contact_form_fields")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn has_contact_form(&self) -> bool {
        !self.contact_form_fields().is_empty()
    }

    /// Security indicators reported by the analyzer, lowercased.
    pub fn security_indicators(&self) -> Vec<String> {
        self.semantic
            .get("security_indicators")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_ascii_lowercase)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn has_captcha_indicator(&self) -> bool {
        self.security_indicators()
            .iter()
            .any(|indicator| CAPTCHA_MARKERS.iter().any(|m| indicator.contains(m)))
    }
}

impl Serialize for PageMetadata {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.merged().serialize(serializer)
    }
}
