//! Data Model: Website, Section, Subsection, Element, Translation, ContentItem
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Website {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub languages: Vec<Language>,
    #[serde(default)]
    pub sections: Vec<Section>,
}

impl Website {
    pub fn section(&self, section_id: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == section_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub sub_name: Option<String>,
    #[serde(default)]
    pub order: Option<i64>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub subsections: Vec<Subsection>,
    /// Join rows some backends return instead of (or next to) `subsections`
    #[serde(default)]
    pub section_items: Vec<SectionItem>,
}

impl Section {
    /// All subsections of the section, direct ones first, then those reached
    /// through section items. A subsection reachable both ways is kept once.
    pub fn subsections(&self) -> Vec<&Subsection> {
        let mut out: Vec<&Subsection> = Vec::new();
        let via_items = self.section_items.iter().flat_map(|item| item.subsections.iter());
        for sub in self.subsections.iter().chain(via_items) {
            if !out.iter().any(|s| s.id == sub.id) {
                out.push(sub);
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionItem {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub order: Option<i64>,
    #[serde(default)]
    pub subsections: Vec<Subsection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subsection {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub order: Option<i64>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub elements: Vec<Element>,
}

impl Subsection {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            order: None,
            is_active: true,
            created_at: None,
            elements: Vec::new(),
        }
    }

    pub fn with_order(mut self, order: i64) -> Self {
        self.order = Some(order);
        self
    }

    pub fn with_element(mut self, element: Element) -> Self {
        self.elements.push(element);
        self
    }

    /// First element whose name equals `name` exactly
    pub fn element(&self, name: &str) -> Option<&Element> {
        self.elements.iter().find(|e| e.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub element_type: ElementType,
    #[serde(default)]
    pub default_content: String,
    #[serde(default)]
    pub translations: Vec<Translation>,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub file_mime_type: Option<String>,
    #[serde(default)]
    pub order: Option<i64>,
}

impl Element {
    pub fn text(id: impl Into<String>, name: impl Into<String>, default_content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            element_type: ElementType::Text,
            default_content: default_content.into(),
            translations: Vec::new(),
            file_url: None,
            file_mime_type: None,
            order: None,
        }
    }

    pub fn with_translation(mut self, language_id: impl Into<String>, content: impl Into<String>) -> Self {
        let n = self.translations.len();
        self.translations.push(Translation {
            id: format!("{}-t{}", self.id, n),
            content: content.into(),
            language: LanguageRef {
                language_id: language_id.into(),
            },
        });
        self
    }

    pub fn with_type(mut self, element_type: ElementType) -> Self {
        self.element_type = element_type;
        self
    }

    pub fn with_file(mut self, url: impl Into<String>, mime: impl Into<String>) -> Self {
        self.file_url = Some(url.into());
        self.file_mime_type = Some(mime.into());
        self
    }

    pub fn with_order(mut self, order: i64) -> Self {
        self.order = Some(order);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    #[default]
    Text,
    Image,
    File,
    Boolean,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Translation {
    #[serde(rename = "_id", default)]
    pub id: String,
    pub content: String,
    pub language: LanguageRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageRef {
    #[serde(rename = "languageID")]
    pub language_id: String,
}

/// A UI language. Direction is resolved outside the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    pub code: String,
    #[serde(default)]
    pub direction: Direction,
}

impl Language {
    pub fn ltr(code: impl Into<String>) -> Self {
        Self { code: code.into(), direction: Direction::Ltr }
    }

    pub fn rtl(code: impl Into<String>) -> Self {
        Self { code: code.into(), direction: Direction::Rtl }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Ltr,
    Rtl,
}

/// A resolved field value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
    Nested(serde_json::Value),
}

impl FieldValue {
    pub fn empty() -> Self {
        FieldValue::Text(String::new())
    }

    /// Text view of the value; lists are joined with ", "
    pub fn as_text(&self) -> String {
        match self {
            FieldValue::Text(s) => s.clone(),
            FieldValue::List(items) => items.join(", "),
            FieldValue::Nested(serde_json::Value::String(s)) => s.clone(),
            FieldValue::Nested(serde_json::Value::Null) => String::new(),
            FieldValue::Nested(v) => v.to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::List(items) => items.iter().all(|s| s.trim().is_empty()),
            FieldValue::Nested(serde_json::Value::Null) => true,
            FieldValue::Nested(serde_json::Value::String(s)) => s.trim().is_empty(),
            FieldValue::Nested(_) => false,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Text(s) => s.trim().parse().ok(),
            FieldValue::Nested(v) => v.as_f64().or_else(|| v.as_str().and_then(|s| s.trim().parse().ok())),
            FieldValue::List(_) => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

/// One localized output record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: String,
    pub order: i64,
    #[serde(flatten)]
    pub fields: BTreeMap<String, FieldValue>,
}

impl ContentItem {
    pub fn new(id: impl Into<String>, order: i64) -> Self {
        Self { id: id.into(), order, fields: BTreeMap::new() }
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// Text of a field, empty when the field is absent
    pub fn text(&self, field: &str) -> String {
        self.fields.get(field).map(FieldValue::as_text).unwrap_or_default()
    }
}

/// Stable item id: `{subsection_id}-{group_index}`
pub fn item_id(subsection_id: &str, group_index: u32) -> String {
    format!("{}-{}", subsection_id, group_index)
}

fn default_true() -> bool {
    true
}
