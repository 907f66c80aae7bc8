//! Railwatch server binary.

use clap::Parser;
use railwatch_core::RailEngine;
use railwatch_env::TokioContext;
use railwatch_server::{create_router, AppState, ServerArgs};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables before clap reads its env fallbacks
    dotenvy::dotenv().ok();
    
    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("railwatch_server=info,railwatch_core=info,tower_http=debug")
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();
    
    let args = ServerArgs::parse();
    
    let catalog = args.load_catalog()?;
    info!("Loaded {} waypoints", catalog.len());
    
    let config = args.engine_config()?;
    info!(
        "Tracks: {:?}, collision threshold {} km",
        config.track_ids, config.collision_threshold_km
    );
    
    let engine = RailEngine::new(TokioContext::shared(), catalog, config);
    let app = create_router(AppState::new(engine));
    
    let addr = args.bind_addr();
    info!("Server running on {}", addr);
    
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    
    Ok(())
}
