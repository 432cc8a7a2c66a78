//! Render Context: explicit website/language selection for one render pass
use crate::data_model::{Direction, Language};

#[derive(Debug, Clone, PartialEq)]
pub struct RenderContext {
    pub website_id: Option<String>,
    pub language: Option<Language>,
    pub trace_id: String,
}

impl RenderContext {
    pub fn new(website_id: impl Into<String>, language: Language) -> Self {
        Self {
            website_id: Some(website_id.into()),
            language: Some(language),
            trace_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// A context whose website and language are not known yet
    pub fn unresolved() -> Self {
        Self {
            website_id: None,
            language: None,
            trace_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.website_id.is_some() && self.language.is_some()
    }

    /// Language code, empty while unresolved
    pub fn language_code(&self) -> &str {
        self.language.as_ref().map(|l| l.code.as_str()).unwrap_or("")
    }

    pub fn direction(&self) -> Direction {
        self.language.as_ref().map(|l| l.direction).unwrap_or_default()
    }

    /// Same website, other language. The trace id is kept.
    pub fn with_language(&self, language: Language) -> Self {
        Self {
            website_id: self.website_id.clone(),
            language: Some(language),
            trace_id: self.trace_id.clone(),
        }
    }
}
