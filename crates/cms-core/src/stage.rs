//! Stage Trait: single contract for every post-aggregation step
use crate::context::RenderContext;
use crate::data_model::ContentItem;

/// A transform over an aggregated item collection
pub trait Stage: Send + Sync {
    /// Unique stage id (ex: "filter.require.v1")
    fn id(&self) -> &'static str;

    /// Whether the same input always yields the same output (default: true)
    fn deterministic(&self) -> bool {
        true
    }

    /// Runs the stage. The input is consumed and a full new collection is
    /// returned, never a partially updated one.
    fn run(
        &self,
        items: Vec<ContentItem>,
        ctx: &RenderContext,
    ) -> Result<Vec<ContentItem>, StageError>;
}

impl<T: Stage + ?Sized> Stage for std::sync::Arc<T> {
    fn id(&self) -> &'static str {
        (**self).id()
    }

    fn deterministic(&self) -> bool {
        (**self).deterministic()
    }

    fn run(
        &self,
        items: Vec<ContentItem>,
        ctx: &RenderContext,
    ) -> Result<Vec<ContentItem>, StageError> {
        (**self).run(items, ctx)
    }
}

#[derive(Debug, Clone)]
pub enum StageError {
    /// Raised by caller-supplied stages
    ExecutionFailed(String),
    Serialize(String),
}

impl std::fmt::Display for StageError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::ExecutionFailed(msg) => write!(f, "EXEC: {}", msg),
            Self::Serialize(msg) => write!(f, "SERIALIZE: {}", msg),
        }
    }
}

impl std::error::Error for StageError {}
