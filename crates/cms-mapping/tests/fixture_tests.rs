//! Integration tests for cms-mapping against the fixture website.
//!
//! These tests run the full aggregate → filter → sort pipeline using the
//! mapping registry and the website snapshot under testing/fixtures.

use cms_core::{Language, RenderContext, Website};
use cms_mapping::{check_coverage, map_content, MappingRegistry};

/// Path to the fixtures relative to the workspace root
const FIXTURES: &str = "testing/fixtures";

fn fixture_path(name: &str) -> String {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap();
    let workspace_root = std::path::Path::new(&manifest_dir).parent().unwrap().parent().unwrap();
    workspace_root.join(FIXTURES).join(name).to_string_lossy().to_string()
}

fn website() -> Website {
    let json = std::fs::read_to_string(fixture_path("website.json")).unwrap();
    serde_json::from_str(&json).unwrap()
}

fn registry() -> MappingRegistry {
    MappingRegistry::load(&fixture_path("mappings.yaml")).unwrap()
}

fn ctx(code: &str) -> RenderContext {
    let language = if code == "ar" { Language::rtl(code) } else { Language::ltr(code) };
    RenderContext::new("w1", language)
}

// =============================================================================
// Hero slides
// =============================================================================

#[test]
fn test_hero_slides_sorted_and_localized() {
    let site = website();
    let hero = site.section("hero").unwrap();
    let registry = registry();
    let mapping = &registry.get("hero").unwrap().content;

    let en = map_content(hero.subsections(), mapping, &ctx("en")).unwrap();
    let ids: Vec<&str> = en.items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["hero-slide-1-0", "hero-slide-2-0"]);
    assert_eq!(en.items[0].text("title"), "Build with Acme");
    assert_eq!(en.items[0].text("image"), "https://cdn.acme.example/hero-1.webp");
    assert!(en.items[1].text("date").starts_with("2024-05-02T08:00:00"));

    let ar = map_content(hero.subsections(), mapping, &ctx("ar")).unwrap();
    assert_eq!(ar.items[0].text("title"), "ابنِ مع أكمي");
    assert_eq!(ar.items[1].text("title"), "انطلق أسرع");
}

#[test]
fn test_hero_links_ignore_ui_language() {
    let site = website();
    let hero = site.section("hero").unwrap();
    let registry = registry();
    let mapping = &registry.get("hero").unwrap().content;

    for code in ["en", "ar", "fr"] {
        let mapped = map_content(hero.subsections(), mapping, &ctx(code)).unwrap();
        assert_eq!(mapped.items[0].text("link"), "https://acme.example/signup", "language {}", code);
        assert_eq!(mapped.items[1].text("link"), "https://acme.example/start", "language {}", code);
    }
}

// =============================================================================
// FAQ
// =============================================================================

#[test]
fn test_faq_groups_across_section_items() {
    let site = website();
    let faq = site.section("faq").unwrap();
    let registry = registry();
    let mapping = &registry.get("faq").unwrap().content;

    let mapped = map_content(faq.subsections(), mapping, &ctx("en")).unwrap();
    let ids: Vec<&str> = mapped.items.iter().map(|i| i.id.as_str()).collect();
    // faq-main has no question, faq-item-b has an empty answer
    assert_eq!(ids, vec!["faq-item-a-1", "faq-item-a-3"]);
    assert_eq!(mapped.items[1].text("question"), "Can I cancel?");
    assert_eq!(mapped.items[1].text("answer"), "Any time.");
    assert!(mapped.items.iter().all(|i| i.text("color") == "#0ea5e9"));

    let ar = map_content(faq.subsections(), mapping, &ctx("ar")).unwrap();
    assert_eq!(ar.items[0].text("question"), "هل توجد خطة مجانية؟");
    assert_eq!(ar.items[1].text("question"), "Can I cancel?");
}

// =============================================================================
// Benefits: scan policy
// =============================================================================

#[test]
fn test_benefits_scan_policies() {
    let site = website();
    let benefits = site.section("benefits").unwrap();
    let registry = registry();

    let stop = map_content(benefits.subsections(), &registry.get("benefits").unwrap().content, &ctx("en")).unwrap();
    let ids: Vec<&str> = stop.items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["benefit-list-1"]);
    assert_eq!(stop.items[0].text("icon"), "bolt");

    let skip = map_content(benefits.subsections(), &registry.get("benefits_all").unwrap().content, &ctx("en")).unwrap();
    let ids: Vec<&str> = skip.items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["benefit-list-1", "benefit-list-3"]);
    assert_eq!(skip.items[1].text("icon"), "shield");
}

// =============================================================================
// Determinism and coverage
// =============================================================================

#[test]
fn test_output_is_deterministic() {
    let site = website();
    let registry = registry();

    for (section, mapping) in [("hero", "hero"), ("faq", "faq"), ("benefits", "benefits_all")] {
        let section = site.section(section).unwrap();
        let mapping = &registry.get(mapping).unwrap().content;
        let a = map_content(section.subsections(), mapping, &ctx("ar")).unwrap();
        let b = map_content(section.subsections(), mapping, &ctx("ar")).unwrap();
        assert_eq!(serde_json::to_vec(&a.items).unwrap(), serde_json::to_vec(&b.items).unwrap());
        assert_eq!(a.fingerprint(), b.fingerprint());
    }
}

#[test]
fn test_every_rule_matches_the_fixture() {
    let site = website();
    let registry = registry();

    for (section, mapping) in [("hero", "hero"), ("faq", "faq"), ("benefits", "benefits"), ("benefits", "benefits_all")] {
        let section = site.section(section).unwrap();
        let spec = &registry.get(mapping).unwrap().content.spec;
        let report = check_coverage(spec, section.subsections());
        assert!(report.is_complete(), "mapping '{}' has unmatched rules: {:?}", mapping, report.unmatched);
    }

    let faq = site.section("faq").unwrap();
    let labels = &registry.get("faq").unwrap().labels;
    assert!(check_coverage(labels, faq.subsections()).is_complete());
}
