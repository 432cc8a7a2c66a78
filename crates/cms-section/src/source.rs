//! Section sources: where raw section records come from.
use cms_core::{CmsError, FetchError, RenderContext, Section, Website};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// One section read for one website in one language
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SectionQuery {
    pub website_id: String,
    pub section_id: String,
    pub language: String,
}

impl SectionQuery {
    pub fn new(website_id: impl Into<String>, section_id: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            website_id: website_id.into(),
            section_id: section_id.into(),
            language: language.into(),
        }
    }

    /// `None` while the context has no website or language yet
    pub fn from_context(ctx: &RenderContext, section_id: &str) -> Option<Self> {
        let website_id = ctx.website_id.as_ref()?;
        let language = ctx.language.as_ref()?;
        Some(Self::new(website_id.clone(), section_id, language.code.clone()))
    }
}

/// Read contract of the backend
pub trait SectionSource: Send + Sync + 'static {
    fn fetch_section(&self, query: &SectionQuery) -> impl Future<Output = Result<Section, FetchError>> + Send;
}

/// Serves sections from a website snapshot exported from the CMS
#[derive(Debug, Clone)]
pub struct SnapshotSource {
    website: Website,
}

impl SnapshotSource {
    pub fn new(website: Website) -> Self {
        Self { website }
    }

    pub fn load(path: &str) -> Result<Self, CmsError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, CmsError> {
        let website: Website =
            serde_json::from_str(json).map_err(|e| FetchError::Decode(e.to_string()))?;
        tracing::info!(website = %website.id, sections = website.sections.len(), "snapshot loaded");
        Ok(Self::new(website))
    }

    pub fn website(&self) -> &Website {
        &self.website
    }
}

impl SectionSource for SnapshotSource {
    async fn fetch_section(&self, query: &SectionQuery) -> Result<Section, FetchError> {
        if query.website_id != self.website.id {
            return Err(FetchError::NotFound(format!("website {}", query.website_id)));
        }
        match self.website.section(&query.section_id) {
            Some(section) if section.is_active => Ok(section.clone()),
            _ => Err(FetchError::NotFound(format!("section {}", query.section_id))),
        }
    }
}

/// In-memory source with scripted failures and latency, for tests
#[derive(Debug, Default)]
pub struct StaticSource {
    sections: HashMap<(String, String), Section>,
    failures: Mutex<VecDeque<FetchError>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_section(mut self, website_id: impl Into<String>, section: Section) -> Self {
        self.sections.insert((website_id.into(), section.id.clone()), section);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// The next fetches fail with these errors, in order
    pub fn fail_next(&self, errors: impl IntoIterator<Item = FetchError>) {
        let mut failures = self.failures.lock().unwrap_or_else(|e| e.into_inner());
        failures.extend(errors);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SectionSource for StaticSource {
    async fn fetch_section(&self, query: &SectionQuery) -> Result<Section, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let scripted = self
            .failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        if let Some(err) = scripted {
            return Err(err);
        }
        self.sections
            .get(&(query.website_id.clone(), query.section_id.clone()))
            .cloned()
            .ok_or_else(|| FetchError::NotFound(format!("section {}", query.section_id)))
    }
}
