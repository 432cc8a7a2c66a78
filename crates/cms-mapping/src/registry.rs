//! Named mappings loaded from YAML.
//!
//! ```yaml
//! version: "1.0"
//! mappings:
//!   faq:
//!     description: FAQ entries
//!     fields:
//!       question: "FAQ {index} - Question"
//!       answer: "FAQ {index} - Answer"
//!       link: { element: "FAQ {index} - Link", primary_language: true }
//!       icon: { indexed: "FAQ {index} - Icon", default: "help" }
//!       color: { constant: "#0ea5e9" }
//!     required: [question]
//!     max_items: 10
//!     policy: skip_missing
//!     filter:
//!       require_non_empty: [answer]
//!     sort: order
//!     labels:
//!       title: Title
//!     items_key: Item
//! ```

use crate::field_map::{FieldMappingSpec, FieldRule, MappingOptions, Rule, ScanPolicy};
use crate::filter::{Predicate, SortKey};
use crate::pattern::NamePattern;
use crate::{ContentMapping, SpecError};
use cms_core::FieldValue;
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Deserialize)]
pub struct RegistryFile {
    pub version: String,
    #[serde(default)]
    pub mappings: BTreeMap<String, MappingDef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MappingDef {
    #[serde(default)]
    pub description: String,
    pub fields: BTreeMap<String, RuleDef>,
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default)]
    pub max_items: Option<u32>,
    #[serde(default)]
    pub policy: ScanPolicy,
    #[serde(default)]
    pub filter: Option<FilterDef>,
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, RuleDef>,
    #[serde(default)]
    pub items_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FilterDef {
    #[serde(default)]
    pub require_non_empty: Vec<String>,
}

/// A rule as written in YAML: shorthand string or full form
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RuleDef {
    Short(String),
    Full(FullRuleDef),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FullRuleDef {
    #[serde(default)]
    pub element: Option<String>,
    #[serde(default)]
    pub indexed: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub constant: Option<serde_json::Value>,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default, alias = "primaryLanguage")]
    pub primary_language: bool,
    #[serde(default)]
    pub list: bool,
}

/// A compiled registry entry
#[derive(Debug, Clone)]
pub struct NamedMapping {
    pub name: String,
    pub description: String,
    pub content: ContentMapping,
    /// Section-level labels read from the main subsection
    pub labels: FieldMappingSpec,
    /// Marks item subsections so they are not taken as the main one
    pub items_key: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct MappingRegistry {
    pub version: String,
    mappings: BTreeMap<String, NamedMapping>,
}

impl MappingRegistry {
    /// Load and compile a registry from a YAML file
    pub fn load(path: &str) -> Result<Self, SpecError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SpecError::Read(format!("{}: {}", path, e)))?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, SpecError> {
        let file: RegistryFile =
            serde_yaml::from_str(yaml).map_err(|e| SpecError::Parse(e.to_string()))?;

        let mut mappings = BTreeMap::new();
        for (name, def) in file.mappings {
            let mapping = compile_mapping(&name, def)?;
            mappings.insert(name, mapping);
        }

        tracing::info!(version = %file.version, count = mappings.len(), "mapping registry loaded");
        Ok(Self {
            version: file.version,
            mappings,
        })
    }

    pub fn get(&self, name: &str) -> Option<&NamedMapping> {
        self.mappings.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.mappings.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

fn compile_mapping(name: &str, def: MappingDef) -> Result<NamedMapping, SpecError> {
    if def.fields.is_empty() {
        return Err(SpecError::EmptyMapping(name.to_string()));
    }

    let mut spec = FieldMappingSpec::new();
    for (field, rule) in &def.fields {
        spec = spec.field(field.clone(), compile_rule(name, field, rule)?);
    }
    for field in &def.required {
        if !def.fields.contains_key(field) {
            return Err(SpecError::InvalidRule {
                mapping: name.to_string(),
                field: field.clone(),
                reason: "required field is not declared".to_string(),
            });
        }
        spec = spec.required(field.clone());
    }

    let mut labels = FieldMappingSpec::new();
    for (field, rule) in &def.labels {
        labels = labels.field(field.clone(), compile_rule(name, field, rule)?);
    }

    let filter = match def.filter {
        Some(f) if !f.require_non_empty.is_empty() => {
            if let Some(field) = f.require_non_empty.iter().find(|f| !def.fields.contains_key(*f)) {
                return Err(SpecError::InvalidRule {
                    mapping: name.to_string(),
                    field: field.clone(),
                    reason: "filtered field is not declared".to_string(),
                });
            }
            Predicate::RequireNonEmpty(f.require_non_empty)
        }
        _ => Predicate::KeepAll,
    };

    let options = MappingOptions {
        max_items: def.max_items,
        policy: def.policy,
    };

    Ok(NamedMapping {
        name: name.to_string(),
        description: def.description,
        content: ContentMapping {
            spec,
            options,
            filter,
            sort: def.sort.as_deref().map(SortKey::parse).unwrap_or_default(),
            stages: Vec::new(),
        },
        labels,
        items_key: def.items_key,
    })
}

fn compile_rule(mapping: &str, field: &str, def: &RuleDef) -> Result<FieldRule, SpecError> {
    let full = match def {
        RuleDef::Short(s) => return Ok(FieldRule::from(s.as_str())),
        RuleDef::Full(full) => full,
    };

    let invalid = |reason: &str| SpecError::InvalidRule {
        mapping: mapping.to_string(),
        field: field.to_string(),
        reason: reason.to_string(),
    };

    let rule = match (&full.element, &full.indexed, &full.path, &full.constant) {
        (Some(element), None, None, None) => match Rule::parse(element) {
            // An explicit element name is never a path, even with a leading `_`
            Rule::Path(_) => Rule::element(element),
            other => other,
        },
        (None, Some(template), None, None) => {
            let pattern = NamePattern::compile(template);
            if !pattern.is_indexed() {
                return Err(invalid("indexed template has no {index} placeholder"));
            }
            Rule::Indexed(pattern)
        }
        (None, None, Some(path), None) => Rule::Path(path.trim_start_matches('$').trim_start_matches('.').to_string()),
        (None, None, None, Some(value)) => Rule::Constant(constant_value(value)),
        (None, None, None, None) => return Err(invalid("one of element, indexed, path or constant is needed")),
        _ => return Err(invalid("element, indexed, path and constant are exclusive")),
    };

    let mut rule = FieldRule::new(rule);
    if let Some(default) = &full.default {
        rule = rule.with_default(default.clone());
    }
    if full.primary_language {
        rule = rule.primary_language();
    }
    if full.list {
        rule = rule.as_list();
    }
    Ok(rule)
}

fn constant_value(value: &serde_json::Value) -> FieldValue {
    match value {
        serde_json::Value::String(s) => FieldValue::Text(s.clone()),
        serde_json::Value::Array(items) if items.iter().all(|v| v.is_string()) => FieldValue::List(
            items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect(),
        ),
        other => FieldValue::Nested(other.clone()),
    }
}
