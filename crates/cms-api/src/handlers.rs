//! API Handlers
use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use cms_core::{ContentItem, Direction, RenderContext, ENGINE_VERSION};
use cms_mapping::NamedMapping;
use cms_section::{QueryKey, QueryStatus, SectionSource};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

type AppResult<T> = Result<T, ApiError>;

#[derive(Debug, Default, Deserialize)]
pub struct SectionParams {
    pub lang: Option<String>,
    pub items_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ContentResponse {
    pub website_id: String,
    pub section_id: String,
    pub mapping: String,
    pub language: String,
    pub direction: Direction,
    pub items: Vec<ContentItem>,
    pub status: QueryStatus,
    pub is_stale: bool,
    pub fingerprint: Option<String>,
    pub trace_id: String,
}

#[derive(Debug, Serialize)]
pub struct LogicResponse {
    pub website_id: String,
    pub section_id: String,
    pub language: String,
    pub direction: Direction,
    pub section_name: String,
    pub sub_name: Option<String>,
    pub content: BTreeMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct InvalidateRequest {
    pub website_id: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RefetchRequest {
    pub website_id: String,
    pub section_id: String,
    pub lang: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RefetchResponse {
    pub key: QueryKey,
    pub status: QueryStatus,
    pub is_stale: bool,
}

pub async fn health<S: SectionSource>(State(state): State<Arc<AppState<S>>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": ENGINE_VERSION,
        "mappings": state.registry.names(),
        "cached_queries": state.adapter.cache().len(),
    }))
}

pub async fn section_content<S: SectionSource>(
    State(state): State<Arc<AppState<S>>>,
    Path((website_id, section_id, mapping)): Path<(String, String, String)>,
    Query(params): Query<SectionParams>,
) -> AppResult<Json<ContentResponse>> {
    let named = lookup(&state, &mapping)?;
    let ctx = RenderContext::new(website_id.clone(), state.config.language(params.lang.as_deref()));

    let content = state.adapter.section_content(&ctx, &section_id, &named.content).await;
    if let Some(err) = content.error {
        state.metrics.fetch_errors.inc();
        // Stale data still renders; only a failure with nothing cached is an error
        if !content.is_stale {
            return Err(ApiError::Fetch(err));
        }
        tracing::warn!(section = %section_id, error = %err, "serving stale content after fetch failure");
    }
    if let Some(err) = content.mapping_error {
        return Err(ApiError::Internal(format!("mapping '{}' failed: {}", mapping, err)));
    }

    state.metrics.items_served.inc_by(content.items.len() as u64);
    Ok(Json(ContentResponse {
        website_id,
        section_id,
        mapping,
        language: ctx.language_code().to_string(),
        direction: ctx.direction(),
        items: content.items,
        status: content.status,
        is_stale: content.is_stale,
        fingerprint: content.fingerprint,
        trace_id: ctx.trace_id,
    }))
}

pub async fn section_logic<S: SectionSource>(
    State(state): State<Arc<AppState<S>>>,
    Path((website_id, section_id, mapping)): Path<(String, String, String)>,
    Query(params): Query<SectionParams>,
) -> AppResult<Json<LogicResponse>> {
    let named = lookup(&state, &mapping)?;
    let ctx = RenderContext::new(website_id.clone(), state.config.language(params.lang.as_deref()));
    let items_key = params.items_key.as_deref().or(named.items_key.as_deref());

    let logic = state.adapter.section_logic(&ctx, &section_id, &named.labels, items_key).await;
    if let Some(err) = logic.error {
        state.metrics.fetch_errors.inc();
        if !logic.is_stale {
            return Err(ApiError::Fetch(err));
        }
    }

    Ok(Json(LogicResponse {
        website_id,
        section_id,
        language: ctx.language_code().to_string(),
        direction: logic.direction,
        section_name: logic.section_name,
        sub_name: logic.sub_name,
        content: logic.content,
    }))
}

pub async fn invalidate<S: SectionSource>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<InvalidateRequest>,
) -> Json<Value> {
    let count = state.adapter.cache().invalidate(|key| {
        req.website_id.as_deref().map_or(true, |w| key.website_id == w)
            && req.language.as_deref().map_or(true, |l| key.language == l)
    });
    state.metrics.cache_invalidations.inc_by(count as u64);
    Json(json!({ "invalidated": count }))
}

pub async fn refetch<S: SectionSource>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<RefetchRequest>,
) -> AppResult<Json<RefetchResponse>> {
    if req.website_id.is_empty() || req.section_id.is_empty() {
        return Err(ApiError::InvalidRequest("website_id and section_id are required".into()));
    }
    let ctx = RenderContext::new(req.website_id, state.config.language(req.lang.as_deref()));
    let result = state
        .adapter
        .refetch(&ctx, &req.section_id)
        .await
        .ok_or_else(|| ApiError::Internal("render context not resolved".into()))?;

    if let Some(err) = result.error {
        state.metrics.fetch_errors.inc();
        if result.data.is_none() {
            return Err(ApiError::Fetch(err));
        }
    }
    Ok(Json(RefetchResponse {
        key: result.key,
        status: result.status,
        is_stale: result.is_stale,
    }))
}

pub async fn metrics<S: SectionSource>(State(state): State<Arc<AppState<S>>>) -> impl IntoResponse {
    match state.metrics.encode() {
        Ok(body) => (StatusCode::OK, [(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body).into_response(),
        Err(e) => ApiError::Internal(e.to_string()).into_response(),
    }
}

fn lookup<'a, S>(state: &'a AppState<S>, mapping: &str) -> AppResult<&'a NamedMapping> {
    state
        .registry
        .get(mapping)
        .ok_or_else(|| ApiError::UnknownMapping(mapping.to_string()))
}
