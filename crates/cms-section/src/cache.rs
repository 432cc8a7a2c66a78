//! Query cache in front of a `SectionSource`.
//!
//! Entries are keyed by `(resource, id, website, language)`, so data fetched
//! for one language is never returned for another. Within the stale-time window cached data is served without
//! calling the source. Concurrent callers of one key share a single fetch,
//! whether it succeeds or fails.
//! Invalidation marks entries stale but keeps their data readable until the
//! next successful fetch replaces it.

use crate::source::{SectionQuery, SectionSource};
use cms_core::{FetchError, Section};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

pub const SECTION_RESOURCE: &str = "section";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct QueryKey {
    pub resource: String,
    pub id: String,
    pub website_id: String,
    pub language: String,
}

impl QueryKey {
    pub fn section(query: &SectionQuery) -> Self {
        Self {
            resource: SECTION_RESOURCE.to_string(),
            id: query.section_id.clone(),
            website_id: query.website_id.clone(),
            language: query.language.clone(),
        }
    }
}

/// idle → loading → {success, error}; back to loading only on refetch or
/// after invalidation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryStatus {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub stale_time: Duration,
    /// Retries after the first failed attempt
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            stale_time: Duration::from_secs(300),
            max_retries: 2,
            retry_delay: Duration::from_millis(200),
        }
    }
}

/// What a reader sees for one key
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub key: QueryKey,
    pub data: Option<Arc<Section>>,
    pub error: Option<FetchError>,
    pub status: QueryStatus,
    pub is_stale: bool,
}

#[derive(Debug, Default)]
struct Entry {
    data: Option<Arc<Section>>,
    error: Option<FetchError>,
    status: QueryStatus,
    updated_at: Option<Instant>,
    invalidated: bool,
    generation: u64,
    /// Completed loads, successful or not
    loads: u64,
}

impl Entry {
    fn is_fresh(&self, stale_time: Duration) -> bool {
        self.status == QueryStatus::Success
            && !self.invalidated
            && self.updated_at.is_some_and(|t| t.elapsed() < stale_time)
    }
}

pub struct QueryCache<S> {
    source: S,
    policy: CachePolicy,
    entries: Mutex<HashMap<QueryKey, Entry>>,
    in_flight: Mutex<HashMap<QueryKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl<S: SectionSource> QueryCache<S> {
    pub fn new(source: S, policy: CachePolicy) -> Self {
        Self {
            source,
            policy,
            entries: Mutex::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    /// Cached data when fresh, otherwise one shared fetch
    pub async fn fetch(&self, query: &SectionQuery) -> QueryResult {
        let key = QueryKey::section(query);
        if let Some(hit) = self.fresh(&key) {
            tracing::trace!(key = ?key, "cache hit");
            return hit;
        }

        let loads_before = self.loads(&key);
        let lock = self.key_lock(&key);
        let _guard = lock.lock().await;
        // Another caller completed a load while we waited; share its outcome
        if self.loads(&key) != loads_before {
            let entries = self.entries();
            if let Some(entry) = entries.get(&key) {
                tracing::trace!(key = ?key, "joined in-flight fetch");
                return self.result(key, entry);
            }
        }
        self.load(key, query).await
    }

    /// Fetches regardless of freshness. Cached data stays readable meanwhile.
    pub async fn refetch(&self, query: &SectionQuery) -> QueryResult {
        let key = QueryKey::section(query);
        let lock = self.key_lock(&key);
        let _guard = lock.lock().await;
        self.load(key, query).await
    }

    /// Current state without fetching
    pub fn peek(&self, query: &SectionQuery) -> QueryResult {
        let key = QueryKey::section(query);
        let entries = self.entries();
        match entries.get(&key) {
            Some(entry) => self.result(key, entry),
            None => QueryResult {
                key,
                data: None,
                error: None,
                status: QueryStatus::Idle,
                is_stale: false,
            },
        }
    }

    /// Marks matching entries stale; returns how many were hit
    pub fn invalidate<F>(&self, predicate: F) -> usize
    where
        F: Fn(&QueryKey) -> bool,
    {
        let mut entries = self.entries();
        let mut count = 0;
        for (key, entry) in entries.iter_mut().filter(|(k, _)| predicate(k)) {
            entry.invalidated = true;
            entry.generation += 1;
            count += 1;
            tracing::debug!(key = ?key, "invalidated");
        }
        if count > 0 {
            tracing::info!(count, "cache entries invalidated");
        }
        count
    }

    pub fn invalidate_language(&self, website_id: &str, language: &str) -> usize {
        self.invalidate(|k| k.website_id == website_id && k.language == language)
    }

    pub fn invalidate_website(&self, website_id: &str) -> usize {
        self.invalidate(|k| k.website_id == website_id)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    fn fresh(&self, key: &QueryKey) -> Option<QueryResult> {
        let entries = self.entries();
        entries
            .get(key)
            .filter(|e| e.is_fresh(self.policy.stale_time))
            .map(|e| self.result(key.clone(), e))
    }

    fn loads(&self, key: &QueryKey) -> u64 {
        self.entries().get(key).map_or(0, |e| e.loads)
    }

    async fn load(&self, key: QueryKey, query: &SectionQuery) -> QueryResult {
        let generation = {
            let mut entries = self.entries();
            let entry = entries.entry(key.clone()).or_default();
            entry.status = QueryStatus::Loading;
            entry.generation
        };

        tracing::info!(section = %query.section_id, website = %query.website_id, language = %query.language, "fetching section");
        let outcome = self.fetch_with_retry(query).await;

        let mut entries = self.entries();
        let entry = entries.entry(key.clone()).or_default();
        // An invalidation that landed mid-flight leaves the new data stale
        let invalidated_meanwhile = entry.generation != generation;
        entry.updated_at = Some(Instant::now());
        entry.loads += 1;
        match outcome {
            Ok(section) => {
                entry.data = Some(Arc::new(section));
                entry.error = None;
                entry.status = QueryStatus::Success;
                entry.invalidated = invalidated_meanwhile;
            }
            Err(err) => {
                tracing::warn!(section = %query.section_id, error = %err, "section fetch failed");
                entry.error = Some(err);
                entry.status = QueryStatus::Error;
            }
        }
        self.result(key, entry)
    }

    async fn fetch_with_retry(&self, query: &SectionQuery) -> Result<Section, FetchError> {
        let mut attempt = 0u32;
        loop {
            match self.source.fetch_section(query).await {
                Ok(section) => return Ok(section),
                Err(err) if err.is_retryable() && attempt < self.policy.max_retries => {
                    attempt += 1;
                    tracing::warn!(section = %query.section_id, attempt, error = %err, "retrying section fetch");
                    tokio::time::sleep(self.policy.retry_delay * attempt).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn result(&self, key: QueryKey, entry: &Entry) -> QueryResult {
        let is_stale = entry.data.is_some() && !entry.is_fresh(self.policy.stale_time);
        QueryResult {
            key,
            data: entry.data.clone(),
            error: entry.error.clone(),
            status: entry.status,
            is_stale,
        }
    }

    fn key_lock(&self, key: &QueryKey) -> Arc<tokio::sync::Mutex<()>> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        in_flight.entry(key.clone()).or_default().clone()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<QueryKey, Entry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}
