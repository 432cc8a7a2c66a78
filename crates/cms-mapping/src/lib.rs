//! CMS Mapping: generic CMS records to localized content items
//!
//! Turns the Section → Subsection → Element → Translation tree into flat,
//! ordered `ContentItem` collections, driven by a caller-declared
//! `FieldMappingSpec`.
//!
//! # Example
//!
//! ```ignore
//! use cms_mapping::{map_content, ContentMapping, FieldMappingSpec};
//!
//! let mapping = ContentMapping::new(
//!     FieldMappingSpec::new()
//!         .field("question", "FAQ {index} - Question")
//!         .field("answer", "FAQ {index} - Answer")
//!         .required("question"),
//! );
//!
//! let mapped = map_content(section.subsections(), &mapping, &ctx)?;
//! for item in &mapped.items {
//!     println!("{} {}", item.id, item.text("question"));
//! }
//! ```

pub mod pattern;
pub mod translation;
pub mod field_map;
pub mod resolver;
pub mod aggregate;
pub mod filter;
pub mod coverage;
pub mod registry;

pub use aggregate::aggregate;
pub use coverage::{check_coverage, CoverageReport};
pub use field_map::{FieldMappingSpec, FieldRule, MappingOptions, Rule, RuleContext, ScanPolicy};
pub use filter::{FilterStage, Predicate, SortKey, SortStage};
pub use pattern::{match_name, NameMatch, NamePattern};
pub use registry::{MappingRegistry, NamedMapping};
pub use resolver::resolve_subsection;
pub use translation::Resolution;

use cms_core::{ContentItem, PipelineRunner, RenderContext, Stage, StageError, StageProof, Subsection};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Everything needed to turn a section into its final item collection
#[derive(Clone, Default)]
pub struct ContentMapping {
    pub spec: FieldMappingSpec,
    pub options: MappingOptions,
    pub filter: Predicate,
    pub sort: SortKey,
    /// Extra stages run after sorting, in order
    pub stages: Vec<Arc<dyn Stage>>,
}

impl fmt::Debug for ContentMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentMapping")
            .field("spec", &self.spec)
            .field("options", &self.options)
            .field("filter", &self.filter)
            .field("sort", &self.sort)
            .field("stages", &self.stages.iter().map(|s| s.id()).collect::<Vec<_>>())
            .finish()
    }
}

impl ContentMapping {
    pub fn new(spec: FieldMappingSpec) -> Self {
        Self {
            spec,
            ..Self::default()
        }
    }

    pub fn with_options(mut self, options: MappingOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_filter(mut self, filter: Predicate) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_sort(mut self, sort: SortKey) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }
}

/// Final items plus the per-stage proofs
#[derive(Debug, Clone, Serialize)]
pub struct MappedContent {
    pub items: Vec<ContentItem>,
    pub pipeline_id: String,
    pub proofs: Vec<StageProof>,
}

impl MappedContent {
    /// Fingerprint of the final collection
    pub fn fingerprint(&self) -> Option<&str> {
        self.proofs.last().map(|p| p.out_hash.as_str())
    }
}

/// Errors raised while loading mapping declarations. Missing elements and
/// translations are never errors.
#[derive(Debug, Error)]
pub enum SpecError {
    #[error("failed to read mappings: {0}")]
    Read(String),
    #[error("failed to parse mappings: {0}")]
    Parse(String),
    #[error("mapping '{0}' declares no fields")]
    EmptyMapping(String),
    #[error("mapping '{mapping}', field '{field}': {reason}")]
    InvalidRule {
        mapping: String,
        field: String,
        reason: String,
    },
}

/// aggregate → filter → sort (→ extra stages) for one section in the
/// context's language
pub fn map_content<'a, I>(
    subsections: I,
    mapping: &ContentMapping,
    ctx: &RenderContext,
) -> Result<MappedContent, StageError>
where
    I: IntoIterator<Item = &'a Subsection>,
{
    let items = aggregate(subsections, &mapping.spec, &mapping.options, ctx.language_code());

    let mut stages: Vec<Box<dyn Stage>> = vec![
        Box::new(FilterStage::new(mapping.filter.clone())),
        Box::new(SortStage::new(mapping.sort.clone())),
    ];
    stages.extend(mapping.stages.iter().map(|s| Box::new(s.clone()) as Box<dyn Stage>));
    let runner = PipelineRunner::new(stages);
    let (items, proofs) = runner.run(items, ctx)?;

    Ok(MappedContent {
        items,
        pipeline_id: runner.pipeline_id().to_string(),
        proofs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cms_core::{Element, Language};

    #[test]
    fn test_end_to_end_single_item() {
        let sub = Subsection::new("s1", "Hero")
            .with_order(0)
            .with_element(Element::text("e1", "Title", "Hello").with_translation("ar", "مرحبا"));
        let mapping = ContentMapping::new(FieldMappingSpec::new().field("id", "_id").field("title", "Title"));

        let ar = map_content([&sub], &mapping, &RenderContext::new("w", Language::rtl("ar"))).unwrap();
        assert_eq!(
            serde_json::to_value(&ar.items).unwrap(),
            serde_json::json!([{ "id": "s1-0", "title": "مرحبا", "order": 0 }])
        );

        let fr = map_content([&sub], &mapping, &RenderContext::new("w", Language::ltr("fr"))).unwrap();
        assert_eq!(
            serde_json::to_value(&fr.items).unwrap(),
            serde_json::json!([{ "id": "s1-0", "title": "Hello", "order": 0 }])
        );
        assert_eq!(ar.pipeline_id, "filter→sort");
    }

    struct Truncate;

    impl Stage for Truncate {
        fn id(&self) -> &'static str {
            "truncate.first.v1"
        }

        fn run(&self, mut items: Vec<ContentItem>, _ctx: &RenderContext) -> Result<Vec<ContentItem>, StageError> {
            items.truncate(1);
            Ok(items)
        }
    }

    #[test]
    fn test_extra_stages_run_after_sort() {
        let sub = Subsection::new("s", "Steps")
            .with_element(Element::text("a", "Step 2", "Two"))
            .with_element(Element::text("b", "Step 1", "One"));
        let mapping = ContentMapping::new(FieldMappingSpec::new().field("label", "Step {index}")).with_stage(Truncate);

        let mapped = map_content([&sub], &mapping, &RenderContext::new("w", Language::ltr("en"))).unwrap();
        assert_eq!(mapped.pipeline_id, "filter→sort→truncate");
        assert_eq!(mapped.items.len(), 1);
        assert_eq!(mapped.items[0].text("label"), "One");
        assert_eq!(mapped.proofs.len(), 3);
    }

    #[test]
    fn test_repeated_runs_are_identical() {
        let subs: Vec<Subsection> = (0..4)
            .map(|i| {
                Subsection::new(format!("s{i}"), "Card")
                    .with_order(3 - i)
                    .with_element(Element::text(format!("e{i}"), "Card 1 - Title", format!("T{i}")))
                    .with_element(Element::text(format!("f{i}"), "Card 2 - Title", format!("U{i}")))
            })
            .collect();
        let mapping = ContentMapping::new(FieldMappingSpec::new().field("title", "Card {index} - Title"));
        let ctx = RenderContext::new("w", Language::ltr("en"));

        let a = map_content(&subs, &mapping, &ctx).unwrap();
        let b = map_content(&subs, &mapping, &ctx).unwrap();
        assert_eq!(serde_json::to_vec(&a.items).unwrap(), serde_json::to_vec(&b.items).unwrap());
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.items.first().map(|i| i.id.as_str()), Some("s3-1"));
    }
}
