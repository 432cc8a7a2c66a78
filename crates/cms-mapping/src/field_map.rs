//! Field mapping declarations.
//!
//! A `FieldMappingSpec` maps output field names to extraction rules. Rules
//! come from code (builder, computed closures) or from YAML (see
//! `registry`). String shorthand:
//!
//! - contains `{index}` → indexed element template
//! - starts with `_` → path into the subsection record (`_id`, `_createdAt`)
//! - anything else → literal element name

use crate::pattern::NamePattern;
use crate::translation::{self, Resolution};
use cms_core::{Element, FieldValue, Subsection};
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;

/// Pure function computing a field from the subsection and group
pub type ComputeFn = Arc<dyn Fn(&RuleContext<'_>) -> FieldValue + Send + Sync>;

#[derive(Clone)]
pub enum Rule {
    Element(NamePattern),
    Indexed(NamePattern),
    Path(String),
    Constant(FieldValue),
    Computed(ComputeFn),
}

impl Rule {
    pub fn parse(s: &str) -> Self {
        let pattern = NamePattern::compile(s);
        if pattern.is_indexed() {
            Rule::Indexed(pattern)
        } else if s.starts_with('_') {
            Rule::Path(s.to_string())
        } else {
            Rule::Element(pattern)
        }
    }

    pub fn element(name: &str) -> Self {
        Rule::Element(NamePattern::compile(name))
    }

    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(&RuleContext<'_>) -> FieldValue + Send + Sync + 'static,
    {
        Rule::Computed(Arc::new(f))
    }

    /// Name pattern for rules that match elements by name
    pub fn pattern(&self) -> Option<&NamePattern> {
        match self {
            Rule::Element(p) | Rule::Indexed(p) => Some(p),
            _ => None,
        }
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Element(p) => write!(f, "Element({:?})", p.original()),
            Rule::Indexed(p) => write!(f, "Indexed({:?})", p.original()),
            Rule::Path(p) => write!(f, "Path({:?})", p),
            Rule::Constant(v) => write!(f, "Constant({:?})", v),
            Rule::Computed(_) => write!(f, "Computed(<fn>)"),
        }
    }
}

/// A rule plus its per-field options
#[derive(Debug, Clone)]
pub struct FieldRule {
    pub rule: Rule,
    /// Used when the rule resolves to an empty value
    pub default: Option<String>,
    pub resolution: Resolution,
    /// Collect every matching element instead of the first
    pub list: bool,
}

impl FieldRule {
    pub fn new(rule: Rule) -> Self {
        Self {
            rule,
            default: None,
            resolution: Resolution::Active,
            list: false,
        }
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Always read the first authored language (URLs, codes)
    pub fn primary_language(mut self) -> Self {
        self.resolution = Resolution::Primary;
        self
    }

    pub fn as_list(mut self) -> Self {
        self.list = true;
        self
    }
}

impl From<Rule> for FieldRule {
    fn from(rule: Rule) -> Self {
        FieldRule::new(rule)
    }
}

impl From<&str> for FieldRule {
    fn from(s: &str) -> Self {
        FieldRule::new(Rule::parse(s))
    }
}

/// Output field name → extraction rule, plus the minimal-presence set
#[derive(Debug, Clone, Default)]
pub struct FieldMappingSpec {
    fields: Vec<(String, FieldRule)>,
    required: Vec<String>,
}

impl FieldMappingSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a field
    pub fn field(mut self, name: impl Into<String>, rule: impl Into<FieldRule>) -> Self {
        let name = name.into();
        let rule = rule.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = rule,
            None => self.fields.push((name, rule)),
        }
        self
    }

    pub fn computed<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&RuleContext<'_>) -> FieldValue + Send + Sync + 'static,
    {
        self.field(name, Rule::computed(f))
    }

    /// Marks a field as part of the minimal-presence set
    pub fn required(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.required.contains(&name) {
            self.required.push(name);
        }
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldRule)> {
        self.fields.iter().map(|(n, r)| (n.as_str(), r))
    }

    pub fn required_fields(&self) -> &[String] {
        &self.required
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn has_indexed_rules(&self) -> bool {
        self.fields.iter().any(|(_, r)| matches!(r.rule, Rule::Indexed(_)))
    }

    /// Whether any field matches elements by name
    pub fn has_name_rules(&self) -> bool {
        self.fields.iter().any(|(_, r)| r.rule.pattern().is_some())
    }
}

/// What to do with a group missing a minimal-presence field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanPolicy {
    /// Stop scanning the subsection at the first such group. Complete groups
    /// after it are dropped too, even when the incomplete one sits mid-run.
    StopAtFirstMissing,
    /// Skip the group and keep scanning
    #[default]
    SkipMissing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MappingOptions {
    /// Highest group index considered per subsection
    pub max_items: Option<u32>,
    pub policy: ScanPolicy,
}

impl MappingOptions {
    pub fn with_max_items(mut self, max: u32) -> Self {
        self.max_items = Some(max);
        self
    }

    pub fn with_policy(mut self, policy: ScanPolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// What a computed rule sees
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub subsection: &'a Subsection,
    /// `None` for single-item subsections
    pub group_index: Option<u32>,
    pub language: &'a str,
}

impl<'a> RuleContext<'a> {
    /// First element whose name matches `name_or_template` in this group
    pub fn element(&self, name_or_template: &str) -> Option<&'a Element> {
        let pattern = NamePattern::compile(name_or_template);
        let group = self.group_index.unwrap_or(0);
        self.subsection.elements.iter().find(|e| {
            let m = pattern.matches(&e.name);
            if pattern.is_indexed() {
                m.group() == Some(group)
            } else {
                m.is_match
            }
        })
    }

    /// Localized text of an element, empty when absent
    pub fn text(&self, name_or_template: &str) -> String {
        self.element(name_or_template)
            .map(|e| translation::resolve(e, self.language))
            .unwrap_or_default()
    }

    pub fn primary_text(&self, name_or_template: &str) -> String {
        self.element(name_or_template)
            .map(translation::resolve_primary)
            .unwrap_or_default()
    }

    /// Localized text, or `fallback` when it resolves empty
    pub fn text_or(&self, name_or_template: &str, fallback: &str) -> String {
        let text = self.text(name_or_template);
        if text.is_empty() {
            fallback.to_string()
        } else {
            text
        }
    }
}
