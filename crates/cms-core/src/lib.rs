//! CMS Core: data model, render context, stage trait and runner
//!
//! Read-only snapshots of CMS records go in, localized `ContentItem`
//! collections come out. Everything here is synchronous and side-effect free.

pub mod stage;
pub mod runner;
pub mod data_model;
pub mod error;
pub mod context;

pub use stage::{Stage, StageError};
pub use runner::{PipelineRunner, StageProof, fingerprint};
pub use data_model::{
    item_id, ContentItem, Direction, Element, ElementType, FieldValue, Language, LanguageRef,
    Section, SectionItem, Subsection, Translation, Website,
};
pub use context::RenderContext;
pub use error::{CmsError, FetchError};

/// Engine version
pub const ENGINE_VERSION: &str = "1.0.0";
