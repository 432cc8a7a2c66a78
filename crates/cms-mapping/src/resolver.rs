//! Field mapping resolution for one subsection.
//!
//! Elements are partitioned into index groups by matching every name rule.
//! A subsection without indexed groups yields one item (group 0); otherwise
//! one item per observed index, ascending. When the spec has name rules and
//! no element matches any of them, the subsection yields nothing. Indices that no element carries
//! are gaps and are skipped. A group missing a minimal-presence field either
//! ends the scan or is skipped, per `ScanPolicy`.

use crate::field_map::{FieldMappingSpec, FieldRule, MappingOptions, Rule, RuleContext, ScanPolicy};
use crate::translation::{self, Resolution};
use cms_core::{item_id, ContentItem, Element, ElementType, FieldValue, Subsection};
use serde_json::Value;
use std::cell::OnceCell;
use std::collections::{BTreeMap, HashMap};

/// Fields carried on the item itself rather than in `fields`
const RESERVED_FIELDS: [&str; 2] = ["id", "order"];

type Groups<'a> = BTreeMap<u32, HashMap<&'a str, Vec<&'a Element>>>;

pub fn resolve_subsection(
    subsection: &Subsection,
    spec: &FieldMappingSpec,
    options: &MappingOptions,
    language: &str,
) -> Vec<ContentItem> {
    let groups = partition(subsection, spec);
    let resolver = GroupResolver {
        subsection,
        spec,
        groups: &groups,
        language,
        raw: OnceCell::new(),
    };

    if groups.is_empty() && spec.has_name_rules() {
        tracing::debug!(subsection = %subsection.id, "no element matches any rule");
        return Vec::new();
    }

    let has_indexed_groups = groups.keys().any(|g| *g > 0);
    if !has_indexed_groups {
        let item = resolver.build(0, None);
        return match missing_required(&item, spec) {
            Some(field) => {
                tracing::debug!(subsection = %subsection.id, field, "single item missing required field");
                Vec::new()
            }
            None => vec![item],
        };
    }

    let mut items = Vec::new();
    let indices = groups
        .keys()
        .copied()
        .filter(|g| *g > 0)
        .filter(|g| options.max_items.map_or(true, |max| *g <= max));

    for index in indices {
        let item = resolver.build(index, Some(index));
        if let Some(field) = missing_required(&item, spec) {
            match options.policy {
                ScanPolicy::StopAtFirstMissing => {
                    tracing::debug!(subsection = %subsection.id, index, field, "stopping scan at incomplete group");
                    break;
                }
                ScanPolicy::SkipMissing => {
                    tracing::debug!(subsection = %subsection.id, index, field, "skipping incomplete group");
                    continue;
                }
            }
        }
        items.push(item);
    }

    items
}

fn partition<'a>(subsection: &'a Subsection, spec: &'a FieldMappingSpec) -> Groups<'a> {
    let mut groups: Groups<'a> = BTreeMap::new();
    for element in &subsection.elements {
        for (field, rule) in spec.fields() {
            let Some(pattern) = rule.rule.pattern() else { continue };
            if let Some(group) = pattern.matches(&element.name).group() {
                groups
                    .entry(group)
                    .or_default()
                    .entry(field)
                    .or_default()
                    .push(element);
            }
        }
    }
    groups
}

fn missing_required<'s>(item: &ContentItem, spec: &'s FieldMappingSpec) -> Option<&'s str> {
    spec.required_fields()
        .iter()
        .map(String::as_str)
        .filter(|f| !RESERVED_FIELDS.contains(f))
        .find(|f| item.get(f).map_or(true, FieldValue::is_empty))
}

struct GroupResolver<'a> {
    subsection: &'a Subsection,
    spec: &'a FieldMappingSpec,
    groups: &'a Groups<'a>,
    language: &'a str,
    raw: OnceCell<Value>,
}

impl<'a> GroupResolver<'a> {
    fn build(&self, group: u32, group_index: Option<u32>) -> ContentItem {
        let mut fields = BTreeMap::new();
        let mut explicit_order = None;

        for (name, field_rule) in self.spec.fields() {
            let value = self.evaluate(name, field_rule, group, group_index);
            match name {
                "id" => {}
                "order" => explicit_order = value.as_number().map(|n| n.round() as i64),
                _ => {
                    fields.insert(name.to_string(), value);
                }
            }
        }

        let order = explicit_order
            .or(self.subsection.order)
            .unwrap_or(i64::from(group));

        ContentItem {
            id: item_id(&self.subsection.id, group),
            order,
            fields,
        }
    }

    fn evaluate(&self, name: &str, field_rule: &FieldRule, group: u32, group_index: Option<u32>) -> FieldValue {
        let value = match &field_rule.rule {
            Rule::Element(_) => self.matched_value(name, 0, field_rule),
            Rule::Indexed(_) => self.matched_value(name, group, field_rule),
            Rule::Path(path) => path_value(self.raw(), path),
            Rule::Constant(v) => v.clone(),
            Rule::Computed(f) => f(&RuleContext {
                subsection: self.subsection,
                group_index,
                language: self.language,
            }),
        };

        match &field_rule.default {
            Some(default) if value.is_empty() => FieldValue::Text(default.clone()),
            _ => value,
        }
    }

    fn matched_value(&self, name: &str, group: u32, field_rule: &FieldRule) -> FieldValue {
        let elements = self
            .groups
            .get(&group)
            .and_then(|fields| fields.get(name))
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        if field_rule.list {
            let mut sorted: Vec<&Element> = elements.to_vec();
            sorted.sort_by_key(|e| e.order.unwrap_or(i64::MAX));
            let values = sorted
                .into_iter()
                .map(|e| element_value(e, self.language, field_rule.resolution))
                .filter(|v| !v.is_empty())
                .collect();
            return FieldValue::List(values);
        }

        elements
            .first()
            .map(|e| FieldValue::Text(element_value(e, self.language, field_rule.resolution)))
            .unwrap_or_else(FieldValue::empty)
    }

    fn raw(&self) -> &Value {
        self.raw
            .get_or_init(|| serde_json::to_value(self.subsection).unwrap_or(Value::Null))
    }
}

/// Image and file elements resolve to their URL when one is set
fn element_value(element: &Element, language: &str, resolution: Resolution) -> String {
    if matches!(element.element_type, ElementType::Image | ElementType::File) {
        if let Some(url) = element.file_url.as_deref().filter(|u| !u.is_empty()) {
            return url.to_string();
        }
    }
    translation::resolve_with(element, language, resolution)
}

/// Dotted path into the subsection's wire form. A leading `_` on a segment
/// is dropped when the literal key is absent (`_createdAt` → `createdAt`).
fn path_value(raw: &Value, path: &str) -> FieldValue {
    let mut current = raw;
    for segment in path.split('.') {
        let next = match current {
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => current
                .get(segment)
                .or_else(|| segment.strip_prefix('_').and_then(|s| current.get(s))),
        };
        match next {
            Some(v) => current = v,
            None => return FieldValue::empty(),
        }
    }

    match current {
        Value::Null => FieldValue::empty(),
        Value::String(s) => FieldValue::Text(s.clone()),
        Value::Number(n) => FieldValue::Text(n.to_string()),
        Value::Bool(b) => FieldValue::Text(b.to_string()),
        other => FieldValue::Nested(other.clone()),
    }
}
