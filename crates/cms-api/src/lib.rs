//! CMS API /v1: mapped section content over HTTP
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod state;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use state::AppState;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use cms_section::SectionSource;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub fn create_app<S: SectionSource>(state: Arc<AppState<S>>) -> Router {
    Router::new()
        .route("/v1/health", get(handlers::health::<S>))
        .route(
            "/v1/websites/{website_id}/sections/{section_id}/content/{mapping}",
            get(handlers::section_content::<S>),
        )
        .route(
            "/v1/websites/{website_id}/sections/{section_id}/logic/{mapping}",
            get(handlers::section_logic::<S>),
        )
        .route("/v1/cache/invalidate", post(handlers::invalidate::<S>))
        .route("/v1/cache/refetch", post(handlers::refetch::<S>))
        .route("/metrics", get(handlers::metrics::<S>))
        .route_layer(from_fn_with_state(state.clone(), middleware::record_metrics::<S>))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::cors())
        .with_state(state)
}

pub async fn run(config: ServiceConfig) -> anyhow::Result<()> {
    let addr = config.addr.clone();
    let state = Arc::new(AppState::from_config(config)?);
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("CMS API listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
