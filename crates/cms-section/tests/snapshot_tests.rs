//! Integration tests for cms-section against the fixture snapshot.
//!
//! The snapshot source, query cache and adapter run together with the
//! mapping registry under testing/fixtures.

use cms_core::{Direction, FetchError, Language, RenderContext};
use cms_mapping::MappingRegistry;
use cms_section::{CachePolicy, QueryCache, QueryStatus, SectionAdapter, SnapshotSource};
use std::sync::Arc;

const FIXTURES: &str = "testing/fixtures";

fn fixture_path(name: &str) -> String {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap();
    let workspace_root = std::path::Path::new(&manifest_dir).parent().unwrap().parent().unwrap();
    workspace_root.join(FIXTURES).join(name).to_string_lossy().to_string()
}

fn adapter() -> SectionAdapter<SnapshotSource> {
    let source = SnapshotSource::load(&fixture_path("website.json")).unwrap();
    SectionAdapter::new(Arc::new(QueryCache::new(source, CachePolicy::default())))
}

fn registry() -> MappingRegistry {
    MappingRegistry::load(&fixture_path("mappings.yaml")).unwrap()
}

#[tokio::test]
async fn test_faq_content_and_labels() {
    let adapter = adapter();
    let registry = registry();
    let faq = registry.get("faq").unwrap();
    let ctx = RenderContext::new("w1", Language::rtl("ar"));

    let content = adapter.section_content(&ctx, "faq", &faq.content).await;
    assert_eq!(content.status, QueryStatus::Success);
    let ids: Vec<&str> = content.items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["faq-item-a-1", "faq-item-a-3"]);

    let logic = adapter.section_logic(&ctx, "faq", &faq.labels, faq.items_key.as_deref()).await;
    assert_eq!(logic.content.get("title").map(String::as_str), Some("الأسئلة الشائعة"));
    assert_eq!(logic.content.get("description").map(String::as_str), Some("Everything you need to know"));
    assert_eq!(logic.direction, Direction::Rtl);
    assert!(logic.error.is_none());

    // Both reads share one cached fetch
    assert_eq!(adapter.cache().len(), 1);
}

#[tokio::test]
async fn test_unknown_section_and_website() {
    let adapter = adapter();
    let registry = registry();
    let hero = &registry.get("hero").unwrap().content;
    let ctx = RenderContext::new("w1", Language::ltr("en"));

    let missing = adapter.section_content(&ctx, "pricing", hero).await;
    assert_eq!(missing.status, QueryStatus::Error);
    assert!(matches!(missing.error, Some(FetchError::NotFound(_))));

    let other_site = RenderContext::new("w2", Language::ltr("en"));
    let content = adapter.section_content(&other_site, "hero", hero).await;
    assert!(content.items.is_empty());
    assert!(content.error.is_some());
}

#[tokio::test]
async fn test_language_switch_rekeys_content() {
    let adapter = adapter();
    let registry = registry();
    let hero = &registry.get("hero").unwrap().content;
    let en = RenderContext::new("w1", Language::ltr("en"));
    let ar = en.with_language(Language::rtl("ar"));

    let before = adapter.section_content(&en, "hero", hero).await;
    assert_eq!(before.items[0].text("title"), "Build with Acme");

    adapter.change_language(&en);
    let after = adapter.section_content(&ar, "hero", hero).await;
    assert_eq!(after.items[0].text("title"), "ابنِ مع أكمي");
    assert_eq!(after.key.as_ref().map(|k| k.language.as_str()), Some("ar"));
    assert_ne!(before.fingerprint, after.fingerprint);
}
