//! Pipeline Runner: chains stages and records a proof per stage
use crate::context::RenderContext;
use crate::data_model::ContentItem;
use crate::stage::{Stage, StageError};
use serde::{Deserialize, Serialize};
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageProof {
    pub id: String,
    pub in_hash: String,
    pub out_hash: String,
    pub in_count: usize,
    pub out_count: usize,
    pub deterministic: bool,
    pub latency_us: u64,
}

pub struct PipelineRunner {
    stages: Vec<Box<dyn Stage>>,
    pipeline_id: String,
}

impl PipelineRunner {
    pub fn new(stages: Vec<Box<dyn Stage>>) -> Self {
        let pipeline_id = stages
            .iter()
            .map(|s| s.id().split('.').next().unwrap_or("?"))
            .collect::<Vec<_>>()
            .join("→");

        Self { stages, pipeline_id }
    }

    pub fn run(
        &self,
        items: Vec<ContentItem>,
        ctx: &RenderContext,
    ) -> Result<(Vec<ContentItem>, Vec<StageProof>), StageError> {
        let mut current = items;
        let mut proofs = Vec::with_capacity(self.stages.len());

        for stage in &self.stages {
            let start = Instant::now();
            let in_hash = fingerprint(&current)?;
            let in_count = current.len();

            current = stage.run(current, ctx)?;

            let out_hash = fingerprint(&current)?;
            tracing::debug!(
                stage = stage.id(),
                trace_id = %ctx.trace_id,
                in_count,
                out_count = current.len(),
                "stage done"
            );

            proofs.push(StageProof {
                id: stage.id().to_string(),
                in_hash,
                out_hash,
                in_count,
                out_count: current.len(),
                deterministic: stage.deterministic(),
                latency_us: start.elapsed().as_micros() as u64,
            });
        }

        Ok((current, proofs))
    }

    pub fn pipeline_id(&self) -> &str {
        &self.pipeline_id
    }
}

/// blake3 digest of the JSON form of an item collection
pub fn fingerprint(items: &[ContentItem]) -> Result<String, StageError> {
    let bytes = serde_json::to_vec(items).map_err(|e| StageError::Serialize(e.to_string()))?;
    Ok(format!("blake3:{}", blake3::hash(&bytes)))
}
