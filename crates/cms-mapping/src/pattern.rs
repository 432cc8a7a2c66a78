//! Element name matching.
//!
//! A rule name is either a literal element name, matched by exact equality,
//! or a template holding an `{index}` placeholder:
//!
//! - the placeholder captures a 1-based index (`"FAQ 3 - Question"` → 3)
//!   or may be absent (`"FAQ - Question"` → group 0)
//! - the text before the placeholder is matched case-sensitively
//! - the text after it is matched case-insensitively (`"Icon"` vs `"icon"`)
//!
//! Templates that cannot be compiled degrade to "never matches".

use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};

/// Canonical placeholder token
pub const INDEX_TOKEN: &str = "{index}";

lazy_static! {
    /// Placeholder as authors actually write it (`{index}`, `{Index}`, `{ index }`)
    static ref PLACEHOLDER: Regex = RegexBuilder::new(r"\{\s*index\s*\}")
        .case_insensitive(true)
        .build()
        .unwrap();
}

/// Outcome of matching one element name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameMatch {
    pub is_match: bool,
    /// Captured index, `None` for literal matches and absent placeholders
    pub group_index: Option<u32>,
}

impl NameMatch {
    pub const NONE: NameMatch = NameMatch { is_match: false, group_index: None };

    fn hit(group_index: Option<u32>) -> Self {
        Self { is_match: true, group_index }
    }

    /// Group the element belongs to; literal matches land in group 0
    pub fn group(&self) -> Option<u32> {
        self.is_match.then(|| self.group_index.unwrap_or(0))
    }
}

#[derive(Debug, Clone)]
enum Matcher {
    Exact,
    Indexed(Regex),
    Invalid,
}

/// A compiled rule name
#[derive(Debug, Clone)]
pub struct NamePattern {
    original: String,
    matcher: Matcher,
}

impl NamePattern {
    pub fn compile(rule_name: &str) -> Self {
        let matcher = match PLACEHOLDER.find(rule_name) {
            None => Matcher::Exact,
            Some(token) => {
                let prefix = rule_name[..token.start()].trim_end();
                let suffix = rule_name[token.end()..].trim_start();
                match build_regex(prefix, suffix) {
                    Ok(regex) => Matcher::Indexed(regex),
                    Err(e) => {
                        tracing::warn!(rule = rule_name, error = %e, "uncompilable name template, it will never match");
                        Matcher::Invalid
                    }
                }
            }
        };

        Self {
            original: rule_name.to_string(),
            matcher,
        }
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn is_indexed(&self) -> bool {
        !matches!(self.matcher, Matcher::Exact)
    }

    pub fn matches(&self, element_name: &str) -> NameMatch {
        match &self.matcher {
            Matcher::Exact => {
                if self.original == element_name {
                    NameMatch::hit(None)
                } else {
                    NameMatch::NONE
                }
            }
            Matcher::Indexed(regex) => {
                let Some(caps) = regex.captures(element_name) else {
                    tracing::trace!(rule = %self.original, element = element_name, "no match");
                    return NameMatch::NONE;
                };
                match caps.name("index") {
                    None => NameMatch::hit(None),
                    // Indices are 1-based; 0 or an overflowing number is malformed
                    Some(m) => match m.as_str().parse::<u32>() {
                        Ok(0) | Err(_) => NameMatch::NONE,
                        Ok(n) => NameMatch::hit(Some(n)),
                    },
                }
            }
            Matcher::Invalid => NameMatch::NONE,
        }
    }

    /// Element name for a concrete group (`"FAQ {index} - Question"`, 2 →
    /// `"FAQ 2 - Question"`). Literal names are returned unchanged.
    pub fn instantiate(&self, group_index: u32) -> String {
        if !self.is_indexed() {
            return self.original.clone();
        }
        let replacement = if group_index == 0 { String::new() } else { group_index.to_string() };
        let filled = PLACEHOLDER.replace(&self.original, replacement.as_str());
        normalize_spaces(&filled)
    }
}

/// One-shot form of [`NamePattern::matches`]
pub fn match_name(rule_name: &str, element_name: &str) -> NameMatch {
    NamePattern::compile(rule_name).matches(element_name)
}

fn build_regex(prefix: &str, suffix: &str) -> Result<Regex, regex::Error> {
    let mut regex_str = String::from("^");
    regex_str.push_str(&regex::escape(prefix));
    regex_str.push_str(r"(?:\s*(?P<index>\d+))?\s*");
    if !suffix.is_empty() {
        regex_str.push_str("(?i:");
        regex_str.push_str(&regex::escape(suffix));
        regex_str.push(')');
    }
    regex_str.push('$');
    Regex::new(&regex_str)
}

fn normalize_spaces(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
