//! CMS Section: cached section fetching and the section adapter
//!
//! A `SectionSource` supplies raw sections. `QueryCache` sits in front of it
//! with a stale-time window, bounded retry and per-key de-duplication.
//! `SectionAdapter` runs the mapping engine over cached data and reports the
//! loading/error/stale state of the query alongside the items.
//!
//! # Example
//!
//! ```ignore
//! use cms_section::{CachePolicy, QueryCache, SectionAdapter, SnapshotSource};
//!
//! let source = SnapshotSource::load("testing/fixtures/website.json")?;
//! let adapter = SectionAdapter::new(Arc::new(QueryCache::new(source, CachePolicy::default())));
//! let content = adapter.section_content(&ctx, "faq", &mapping).await;
//! ```

pub mod source;
pub mod cache;
pub mod adapter;

pub use adapter::{main_subsection, SectionAdapter, SectionContent, SectionLogic};
pub use cache::{CachePolicy, QueryCache, QueryKey, QueryResult, QueryStatus};
pub use source::{SectionQuery, SectionSource, SnapshotSource, StaticSource};
