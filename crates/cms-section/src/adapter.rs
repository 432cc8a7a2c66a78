//! Section Logic Adapter: joins the query cache with the mapping engine.
//!
//! Readers get items (or labels) together with the loading, error and stale
//! flags of the underlying query. Errors are passed through unmodified.
use crate::cache::{QueryCache, QueryKey, QueryResult, QueryStatus};
use crate::source::{SectionQuery, SectionSource};
use cms_core::{ContentItem, Direction, FetchError, RenderContext, Section, Subsection};
use cms_mapping::{map_content, resolve_subsection, ContentMapping, FieldMappingSpec, MappingOptions};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
pub struct SectionContent {
    pub items: Vec<ContentItem>,
    pub is_loading: bool,
    pub error: Option<FetchError>,
    /// Set when the fetched section could not be mapped
    pub mapping_error: Option<String>,
    pub is_stale: bool,
    pub status: QueryStatus,
    pub key: Option<QueryKey>,
    pub fingerprint: Option<String>,
}

impl SectionContent {
    fn loading() -> Self {
        Self {
            items: Vec::new(),
            is_loading: true,
            error: None,
            mapping_error: None,
            is_stale: false,
            status: QueryStatus::Idle,
            key: None,
            fingerprint: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionLogic {
    pub content: BTreeMap<String, String>,
    pub section_name: String,
    pub sub_name: Option<String>,
    pub is_loading: bool,
    pub error: Option<FetchError>,
    pub is_stale: bool,
    pub direction: Direction,
    pub key: Option<QueryKey>,
}

pub struct SectionAdapter<S> {
    cache: Arc<QueryCache<S>>,
}

impl<S> Clone for SectionAdapter<S> {
    fn clone(&self) -> Self {
        Self { cache: self.cache.clone() }
    }
}

impl<S: SectionSource> SectionAdapter<S> {
    pub fn new(cache: Arc<QueryCache<S>>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &QueryCache<S> {
        &self.cache
    }

    /// Items of one section in the context's language
    pub async fn section_content(
        &self,
        ctx: &RenderContext,
        section_id: &str,
        mapping: &ContentMapping,
    ) -> SectionContent {
        let Some(query) = SectionQuery::from_context(ctx, section_id) else {
            return SectionContent::loading();
        };
        let result = self.cache.fetch(&query).await;
        Self::content_from(result, ctx, mapping)
    }

    /// Same as `section_content` but never fetches
    pub fn peek_content(&self, ctx: &RenderContext, section_id: &str, mapping: &ContentMapping) -> SectionContent {
        let Some(query) = SectionQuery::from_context(ctx, section_id) else {
            return SectionContent::loading();
        };
        Self::content_from(self.cache.peek(&query), ctx, mapping)
    }

    /// Section-level labels resolved from the main subsection
    pub async fn section_logic(
        &self,
        ctx: &RenderContext,
        section_id: &str,
        labels: &FieldMappingSpec,
        items_key: Option<&str>,
    ) -> SectionLogic {
        let direction = ctx.direction();
        let Some(query) = SectionQuery::from_context(ctx, section_id) else {
            return SectionLogic {
                content: empty_labels(labels),
                section_name: String::new(),
                sub_name: None,
                is_loading: true,
                error: None,
                is_stale: false,
                direction,
                key: None,
            };
        };

        let result = self.cache.fetch(&query).await;
        let section = result.data.as_deref();
        let content = section
            .and_then(|s| main_subsection(s, items_key))
            .map(|sub| resolve_labels(sub, labels, ctx.language_code()))
            .unwrap_or_else(|| empty_labels(labels));

        SectionLogic {
            content,
            section_name: section.map(|s| s.name.clone()).unwrap_or_default(),
            sub_name: section.and_then(|s| s.sub_name.clone()),
            is_loading: result.status == QueryStatus::Loading,
            error: result.error,
            is_stale: result.is_stale,
            direction,
            key: Some(result.key),
        }
    }

    /// Forced fetch; previously rendered data stays readable meanwhile
    pub async fn refetch(&self, ctx: &RenderContext, section_id: &str) -> Option<QueryResult> {
        let query = SectionQuery::from_context(ctx, section_id)?;
        Some(self.cache.refetch(&query).await)
    }

    /// Invalidates every entry keyed to the previous language
    pub fn change_language(&self, previous: &RenderContext) -> usize {
        match (&previous.website_id, &previous.language) {
            (Some(website_id), Some(language)) => self.cache.invalidate_language(website_id, &language.code),
            _ => 0,
        }
    }

    fn content_from(result: QueryResult, ctx: &RenderContext, mapping: &ContentMapping) -> SectionContent {
        let mut content = SectionContent {
            items: Vec::new(),
            is_loading: result.status == QueryStatus::Loading,
            error: result.error,
            mapping_error: None,
            is_stale: result.is_stale,
            status: result.status,
            key: Some(result.key),
            fingerprint: None,
        };
        let Some(section) = result.data else {
            return content;
        };
        match map_content(section.subsections(), mapping, ctx) {
            Ok(mapped) => {
                content.fingerprint = mapped.fingerprint().map(str::to_string);
                content.items = mapped.items;
            }
            Err(err) => {
                tracing::error!(section = %section.id, trace_id = %ctx.trace_id, error = %err, "mapping pipeline failed");
                content.mapping_error = Some(err.to_string());
            }
        }
        content
    }
}

/// First active subsection by order whose name does not contain `items_key`,
/// else the first subsection
pub fn main_subsection<'a>(section: &'a Section, items_key: Option<&str>) -> Option<&'a Subsection> {
    let subsections = section.subsections();
    let mut active: Vec<&Subsection> = subsections.iter().copied().filter(|s| s.is_active).collect();
    active.sort_by_key(|s| s.order.unwrap_or(i64::MAX));

    let key = items_key.map(str::to_lowercase).filter(|k| !k.is_empty());
    let main = active
        .iter()
        .copied()
        .find(|s| key.as_ref().map_or(true, |k| !s.name.to_lowercase().contains(k.as_str())));
    main.or_else(|| subsections.first().copied())
}

fn resolve_labels(subsection: &Subsection, labels: &FieldMappingSpec, language: &str) -> BTreeMap<String, String> {
    let mut content = empty_labels(labels);
    let items = resolve_subsection(subsection, labels, &MappingOptions::default(), language);
    if let Some(item) = items.first() {
        for (field, value) in content.iter_mut() {
            *value = item.text(field);
        }
    }
    content
}

fn empty_labels(labels: &FieldMappingSpec) -> BTreeMap<String, String> {
    labels.fields().map(|(name, _)| (name.to_string(), String::new())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CachePolicy;
    use crate::source::StaticSource;
    use cms_core::{Element, Language, Stage, StageError};

    fn faq_section() -> Section {
        let mut section: Section =
            serde_json::from_value(serde_json::json!({ "_id": "faq", "name": "FAQ", "subName": "Help" })).unwrap();
        section.subsections = vec![
            Subsection::new("faq-items", "FAQ Items")
                .with_order(0)
                .with_element(Element::text("q1", "FAQ 1 - Question", "Is it free?").with_translation("ar", "هل هو مجاني؟"))
                .with_element(Element::text("a1", "FAQ 1 - Answer", "Yes")),
            Subsection::new("faq-main", "FAQ Main")
                .with_order(1)
                .with_element(Element::text("t", "Title", "Questions").with_translation("ar", "أسئلة")),
        ];
        section
    }

    fn adapter() -> SectionAdapter<StaticSource> {
        let source = StaticSource::new().with_section("w1", faq_section());
        SectionAdapter::new(Arc::new(QueryCache::new(source, CachePolicy::default())))
    }

    fn faq_mapping() -> ContentMapping {
        ContentMapping::new(
            FieldMappingSpec::new()
                .field("question", "FAQ {index} - Question")
                .field("answer", "FAQ {index} - Answer")
                .required("question"),
        )
    }

    #[tokio::test]
    async fn test_unresolved_context_is_loading_without_fetch() {
        let adapter = adapter();
        let content = adapter.section_content(&RenderContext::unresolved(), "faq", &faq_mapping()).await;
        assert!(content.is_loading);
        assert!(content.items.is_empty());
        assert!(content.key.is_none());

        let logic = adapter
            .section_logic(&RenderContext::unresolved(), "faq", &FieldMappingSpec::new().field("title", "Title"), None)
            .await;
        assert!(logic.is_loading);
        assert_eq!(logic.content.get("title").map(String::as_str), Some(""));
        assert_eq!(adapter.cache().source().calls(), 0);
    }

    #[tokio::test]
    async fn test_section_content_localized() {
        let adapter = adapter();
        let ctx = RenderContext::new("w1", Language::rtl("ar"));
        let content = adapter.section_content(&ctx, "faq", &faq_mapping()).await;
        assert_eq!(content.status, QueryStatus::Success);
        assert!(!content.is_loading);
        assert_eq!(content.items.len(), 1);
        assert_eq!(content.items[0].id, "faq-items-1");
        assert_eq!(content.items[0].text("question"), "هل هو مجاني؟");
        assert!(content.fingerprint.is_some());
    }

    #[tokio::test]
    async fn test_errors_pass_through() {
        let adapter = adapter();
        let ctx = RenderContext::new("w1", Language::ltr("en"));
        let content = adapter.section_content(&ctx, "missing", &faq_mapping()).await;
        assert_eq!(content.status, QueryStatus::Error);
        assert_eq!(content.error, Some(FetchError::NotFound("section missing".into())));
        assert!(content.items.is_empty());
    }

    struct Reject;

    impl Stage for Reject {
        fn id(&self) -> &'static str {
            "reject.all.v1"
        }

        fn run(&self, _items: Vec<ContentItem>, _ctx: &RenderContext) -> Result<Vec<ContentItem>, StageError> {
            Err(StageError::ExecutionFailed("rejected".into()))
        }
    }

    #[tokio::test]
    async fn test_mapping_failure_is_reported() {
        let adapter = adapter();
        let ctx = RenderContext::new("w1", Language::ltr("en"));
        let content = adapter.section_content(&ctx, "faq", &faq_mapping().with_stage(Reject)).await;
        assert_eq!(content.status, QueryStatus::Success);
        assert!(content.error.is_none());
        assert_eq!(content.mapping_error.as_deref(), Some("EXEC: rejected"));
        assert!(content.items.is_empty());
        assert!(content.fingerprint.is_none());

        let ok = adapter.section_content(&ctx, "faq", &faq_mapping()).await;
        assert!(ok.mapping_error.is_none());
    }

    #[tokio::test]
    async fn test_section_logic_uses_main_subsection() {
        let adapter = adapter();
        let labels = FieldMappingSpec::new().field("title", "Title").field("subtitle", "Subtitle");
        let ctx = RenderContext::new("w1", Language::rtl("ar"));

        let logic = adapter.section_logic(&ctx, "faq", &labels, Some("item")).await;
        assert_eq!(logic.content.get("title").map(String::as_str), Some("أسئلة"));
        assert_eq!(logic.content.get("subtitle").map(String::as_str), Some(""));
        assert_eq!(logic.section_name, "FAQ");
        assert_eq!(logic.sub_name.as_deref(), Some("Help"));
        assert_eq!(logic.direction, Direction::Rtl);
    }

    #[test]
    fn test_main_subsection_fallback() {
        let section = faq_section();
        assert_eq!(main_subsection(&section, Some("ITEMS")).map(|s| s.id.as_str()), Some("faq-main"));
        assert_eq!(main_subsection(&section, None).map(|s| s.id.as_str()), Some("faq-items"));
        // Every name contains the key: first subsection wins
        assert_eq!(main_subsection(&section, Some("faq")).map(|s| s.id.as_str()), Some("faq-items"));
    }

    #[tokio::test]
    async fn test_language_change_never_returns_other_language() {
        let adapter = adapter();
        let en = RenderContext::new("w1", Language::ltr("en"));
        let ar = en.with_language(Language::rtl("ar"));

        let first = adapter.section_content(&en, "faq", &faq_mapping()).await;
        assert_eq!(first.items[0].text("question"), "Is it free?");

        assert_eq!(adapter.change_language(&en), 1);
        let peeked = adapter.peek_content(&ar, "faq", &faq_mapping());
        assert_eq!(peeked.status, QueryStatus::Idle);
        assert!(peeked.items.is_empty());

        let second = adapter.section_content(&ar, "faq", &faq_mapping()).await;
        assert_eq!(second.items[0].text("question"), "هل هو مجاني؟");
        assert!(adapter.peek_content(&en, "faq", &faq_mapping()).is_stale);
    }

    #[tokio::test]
    async fn test_refetch_keeps_data_readable() {
        let adapter = adapter();
        let ctx = RenderContext::new("w1", Language::ltr("en"));
        adapter.section_content(&ctx, "faq", &faq_mapping()).await;

        adapter.cache().source().fail_next([FetchError::NotFound("gone".into())]);
        let result = adapter.refetch(&ctx, "faq").await.unwrap();
        assert_eq!(result.status, QueryStatus::Error);

        let content = adapter.peek_content(&ctx, "faq", &faq_mapping());
        assert_eq!(content.items.len(), 1);
        assert!(content.error.is_some());
        assert!(adapter.refetch(&RenderContext::unresolved(), "faq").await.is_none());
    }
}
