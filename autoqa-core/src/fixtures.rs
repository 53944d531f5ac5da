//! Known-valid and known-invalid input values supplied by the user.
//!
//! The file is a JSON object with three optional sections:
//!
//! ```json
//! {
//!   "credentials": {"valid": {"username": "..."}, "invalid": {"username": "..."}},
//!   "registration_fields": {"email": {"valid": ["..."], "invalid": ["..."]}},
//!   "contact_form": {"valid": {"name": "..."}, "invalid": {"email": "..."}}
//! }
//! ```
//!
//! A section with the wrong shape is skipped with a warning instead of
//! failing the whole file.

use crate::error::FixtureError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValueSets {
    pub valid: Map<String, Value>,
    pub invalid: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldSamples {
    pub valid: Vec<Value>,
    pub invalid: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FixtureData {
    pub credentials: ValueSets,
    pub registration_fields: BTreeMap<String, FieldSamples>,
    pub contact_form: ValueSets,
}

impl FixtureData {
    pub fn load(path: &Path) -> Result<Self, FixtureError> {
        let content = std::fs::read_to_string(path).map_err(|source| FixtureError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let document: Value =
            serde_json::from_str(&content).map_err(|source| FixtureError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        match document {
            Value::Object(sections) => {
                debug!("Loaded fixture data from {}", path.display());
                Ok(Self::from_sections(&sections))
            }
            _ => Err(FixtureError::NotAnObject {
                path: path.to_path_buf(),
            }),
        }
    }

    pub fn from_sections(sections: &Map<String, Value>) -> Self {
        let registration_fields = match sections.get("registration_fields") {
            Some(Value::Object(fields)) => fields
                .iter()
                .filter_map(|(name, samples)| {
                    section::<FieldSamples>(samples, &format!("registration_fields.{}", name))
                        .map(|samples| (name.clone(), samples))
                })
                .collect(),
            Some(_) => {
                warn!("Ignoring fixture section 'registration_fields': expected an object");
                BTreeMap::new()
            }
            None => BTreeMap::new(),
        };

        Self {
            credentials: sections
                .get("credentials")
                .and_then(|v| section(v, "credentials"))
                .unwrap_or_default(),
            registration_fields,
            contact_form: sections
                .get("contact_form")
                .and_then(|v| section(v, "contact_form"))
                .unwrap_or_default(),
        }
    }

    /// Replace the valid username and/or password.
    pub fn with_credentials(mut self, username: Option<&str>, password: Option<&str>) -> Self {
        if let Some(username) = username {
            self.credentials
                .valid
                .insert("username".to_string(), Value::String(username.to_string()));
        }
        if let Some(password) = password {
            self.credentials
                .valid
                .insert("password".to_string(), Value::String(password.to_string()));
        }
        self
    }

    /// Every non-empty string value in the file. Used to check that a
    /// generated auth test really types fixture values.
    pub fn literal_values(&self) -> Vec<String> {
        let maps = [
            &self.credentials.valid,
            &self.credentials.invalid,
            &self.contact_form.valid,
            &self.contact_form.invalid,
        ];

        let from_maps = maps.into_iter().flat_map(|m| m.values());
        let from_samples = self
            .registration_fields
            .values()
            .flat_map(|s| s.valid.iter().chain(s.invalid.iter()));

        let mut values: Vec<String> = from_maps
            .chain(from_samples)
            .filter_map(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
            .collect();
        values.sort();
        values.dedup();
        values
    }

    pub fn is_empty(&self) -> bool {
        self.credentials == ValueSets::default()
            && self.contact_form == ValueSets::default()
            && self.registration_fields.is_empty()
    }
}

fn section<T: DeserializeOwned>(value: &Value, name: &str) -> Option<T> {
    match serde_json::from_value(value.clone()) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!("Ignoring fixture section '{}': {}", name, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_fixture(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_full_document() {
        let file = write_fixture(
            r#"{
                "credentials": {
                    "valid": {"username": "alice", "password": "s3cret"},
                    "invalid": {"username": "nobody", "password": "wrong"}
                },
                "registration_fields": {
                    "email": {"valid": ["a@b.test"], "invalid": ["not-an-email"]}
                },
                "contact_form": {
                    "valid": {"name": "Alice", "message": "Hello"},
                    "invalid": {"email": "bad@"}
                }
            }"#,
        );

        let data = FixtureData::load(file.path()).unwrap();
        assert_eq!(data.credentials.valid["username"], json!("alice"));
        assert_eq!(data.registration_fields["email"].invalid, vec![json!("not-an-email")]);
        assert_eq!(data.contact_form.invalid["email"], json!("bad@"));
    }

    #[test]
    fn test_bad_section_is_ignored() {
        let file = write_fixture(
            r#"{
                "credentials": "oops",
                "registration_fields": {"email": 5, "phone": {"valid": ["555-0100"]}},
                "contact_form": {"valid": {"name": "Bob"}}
            }"#,
        );

        let data = FixtureData::load(file.path()).unwrap();
        assert_eq!(data.credentials, ValueSets::default());
        assert!(!data.registration_fields.contains_key("email"));
        assert_eq!(data.registration_fields["phone"].valid, vec![json!("555-0100")]);
        assert_eq!(data.contact_form.valid["name"], json!("Bob"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = FixtureData::load(&dir.path().join("absent.json"));
        assert!(matches!(result, Err(FixtureError::Io { .. })));
    }

    #[test]
    fn test_invalid_json_and_non_object() {
        let broken = write_fixture("{ nope");
        assert!(matches!(
            FixtureData::load(broken.path()),
            Err(FixtureError::Parse { .. })
        ));

        let array = write_fixture("[1, 2]");
        assert!(matches!(
            FixtureData::load(array.path()),
            Err(FixtureError::NotAnObject { .. })
        ));
    }

    #[test]
    fn test_credential_override() {
        let data = FixtureData::default().with_credentials(Some("cli-user"), None);

        assert_eq!(data.credentials.valid["username"], json!("cli-user"));
        assert!(!data.credentials.valid.contains_key("password"));
    }

    #[test]
    fn test_literal_values_skip_blank_and_non_strings() {
        let sections = json!({
            "credentials": {"valid": {"username": "alice", "password": ""}, "invalid": {"attempts": 3}},
            "registration_fields": {"zip": {"valid": ["12345", "  "], "invalid": ["abc"]}},
            "contact_form": {"valid": {"name": "alice"}}
        });
        let data = FixtureData::from_sections(sections.as_object().unwrap());

        assert_eq!(data.literal_values(), vec!["12345", "abc", "alice"]);
    }

    #[test]
    fn test_document_with_only_bad_sections_is_empty() {
        let file = write_fixture(r#"{"credentials": "alice", "contact_form": [1, 2]}"#);

        let data = FixtureData::load(file.path()).unwrap();
        assert!(data.is_empty());
        assert!(!data.with_credentials(Some("alice"), None).is_empty());
    }
}
