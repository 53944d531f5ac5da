use serde::{Deserialize, Serialize};

/// Deterministic, DOM-derived facts about one page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuralFacts {
    pub title: String,
    pub url: String,
    pub forms: Vec<FormFacts>,
    pub buttons: Vec<InteractiveElement>,
    pub tables: Vec<TableFacts>,
    pub key_flows: KeyFlows,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormFacts {
    pub id: Option<String>,
    pub action: Option<String>,
    pub method: Option<String>,
    pub inputs: Vec<FormInput>,
    pub buttons: Vec<FormButton>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormInput {
    #[serde(rename = "type")]
    pub input_type: Option<String>,
    pub name: Option<String>,
    pub id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormButton {
    #[serde(rename = "type")]
    pub button_type: Option<String>,
    pub text: String,
    pub id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractiveElement {
    pub tag: String,
    pub text: String,
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub element_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableFacts {
    pub id: Option<String>,
    pub headers: Vec<String>,
    pub row_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyFlows {
    pub main_navigation: Vec<Option<String>>,
    pub primary_actions: Vec<String>,
}
