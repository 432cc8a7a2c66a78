//! Localized string lookup for a single element.
//!
//! Active-language resolution: the translation for the requested language,
//! then `defaultContent`, then the empty string. Primary-language resolution
//! ignores the UI language and takes the first authored translation, for
//! values that must not change with the language (URLs, codes).
//!
//! An empty translation counts as missing and falls through to the default.

use cms_core::Element;

/// Which translation a field reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Resolution {
    #[default]
    Active,
    Primary,
}

pub fn resolve(element: &Element, language_code: &str) -> String {
    let translated = element
        .translations
        .iter()
        .find(|t| t.language.language_id == language_code)
        .map(|t| t.content.as_str());
    or_default(translated, element)
}

pub fn resolve_primary(element: &Element) -> String {
    let first = element.translations.first().map(|t| t.content.as_str());
    or_default(first, element)
}

pub fn resolve_with(element: &Element, language_code: &str, resolution: Resolution) -> String {
    match resolution {
        Resolution::Active => resolve(element, language_code),
        Resolution::Primary => resolve_primary(element),
    }
}

fn or_default(candidate: Option<&str>, element: &Element) -> String {
    match candidate {
        Some(content) if !content.is_empty() => content.to_string(),
        _ => element.default_content.clone(),
    }
}
