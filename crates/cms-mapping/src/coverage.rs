//! Rule coverage check.
//!
//! Element names act as an implicit schema: a typo in a rule or in the CMS
//! silently resolves to an empty field. `check_coverage` runs every name
//! rule against a dataset and reports the rules nothing matched, so fixture
//! tests can assert full coverage.

use crate::field_map::FieldMappingSpec;
use cms_core::Subsection;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CoverageReport {
    /// Fields whose rule matched at least one element
    pub matched: Vec<String>,
    /// Fields whose rule matched nothing
    pub unmatched: Vec<String>,
    /// Element names no rule matched
    pub unclaimed_elements: Vec<String>,
}

impl CoverageReport {
    pub fn is_complete(&self) -> bool {
        self.unmatched.is_empty()
    }
}

pub fn check_coverage<'a, I>(spec: &FieldMappingSpec, subsections: I) -> CoverageReport
where
    I: IntoIterator<Item = &'a Subsection>,
{
    let subsections: Vec<&Subsection> = subsections.into_iter().collect();
    let mut report = CoverageReport::default();

    for (field, rule) in spec.fields() {
        let Some(pattern) = rule.rule.pattern() else { continue };
        let hit = subsections
            .iter()
            .flat_map(|s| s.elements.iter())
            .any(|e| pattern.matches(&e.name).is_match);
        if hit {
            report.matched.push(field.to_string());
        } else {
            report.unmatched.push(field.to_string());
        }
    }

    for element in subsections.iter().flat_map(|s| s.elements.iter()) {
        let claimed = spec
            .fields()
            .filter_map(|(_, r)| r.rule.pattern())
            .any(|p| p.matches(&element.name).is_match);
        if !claimed && !report.unclaimed_elements.contains(&element.name) {
            report.unclaimed_elements.push(element.name.clone());
        }
    }

    report
}
