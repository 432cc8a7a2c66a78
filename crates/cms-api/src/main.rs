//! Binary entrypoint for the CMS API server.
use anyhow::Result;
use cms_api::{run, ServiceConfig};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("cms_api=info".parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .init();

    // CMS_CONFIG names the config file; CMS_ADDR and friends override it
    let config = ServiceConfig::load()?;
    run(config).await
}
