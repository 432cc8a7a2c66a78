//! Runs the field mapping across every subsection of a section and
//! flattens the results into one collection.

use crate::field_map::{FieldMappingSpec, MappingOptions};
use crate::resolver::resolve_subsection;
use cms_core::{ContentItem, Subsection};
use std::collections::HashSet;

/// Concatenates per-subsection items in input order. Inactive subsections
/// are skipped and an item id seen twice is kept once (first wins), which
/// happens when one subsection is reachable through several section items.
pub fn aggregate<'a, I>(
    subsections: I,
    spec: &FieldMappingSpec,
    options: &MappingOptions,
    language: &str,
) -> Vec<ContentItem>
where
    I: IntoIterator<Item = &'a Subsection>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for subsection in subsections {
        if !subsection.is_active {
            tracing::debug!(subsection = %subsection.id, "skipping inactive subsection");
            continue;
        }
        for item in resolve_subsection(subsection, spec, options, language) {
            if seen.insert(item.id.clone()) {
                out.push(item);
            }
        }
    }

    out
}
