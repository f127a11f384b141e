///! Content Catalyst Server
///! REST API over the content store and generation service

mod api;
mod models;

use generation::{CatalystConfig, ContentService};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "catalyst_server=debug,generation=info,content=info".into()),
        )
        .init();

    info!("Starting Content Catalyst Server...");

    let config_path = std::env::var("CATALYST_CONFIG").ok().map(PathBuf::from);
    let config = CatalystConfig::load_with_env(config_path.as_deref())?;
    let service = Arc::new(ContentService::from_config(&config)?);

    let app = api::router(service);

    // Start server
    let addr = std::env::var("CATALYST_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".to_string());
    info!("Content Catalyst server listening on http://{}", addr);
    info!("API endpoints:");
    info!("  GET    /api/auth/me                - Current user");
    info!("  GET    /api/data/context           - Get notes and links");
    info!("  POST   /api/data/context           - Save notes and links");
    info!("  GET    /api/images                 - List images");
    info!("  POST   /api/images/upload-url      - Register image upload");
    info!("  PUT    /api/images/:id/data        - Complete upload");
    info!("  DELETE /api/images/:id             - Delete image");
    info!("  GET    /api/content                - List content (reconciles video jobs)");
    info!("  GET    /api/content/outstanding    - Any item still generating");
    info!("  POST   /api/content/generate       - Generate posts");
    info!("  PATCH  /api/content/:id/status     - Set status");
    info!("  PATCH  /api/content/:id/schedule   - Schedule post");
    info!("  DELETE /api/content/:id            - Delete post");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
