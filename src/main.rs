use agent_router::{
    agents::web_surfer::screenshots::ScreenshotStore, config::Config, create_router, utils::init_logger, AppState,
};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();

    // Load configuration
    let config = Config::from_env()?;
    config.validate()?;
    info!("Configuration loaded: {:?}", config.server);
    info!(primary = ?config.llm.primary, selector = ?config.llm.selector, "LLM endpoints");

    // Screenshot output directory, created once for the process
    let screenshots = ScreenshotStore::acquire(
        &config.web_surfer.screenshots_dir,
        &config.web_surfer.screenshots_web_prefix,
    )
    .map_err(|e| anyhow::anyhow!("Failed to prepare screenshots directory: {}", e))?;

    // Connects on first use
    let pool = agent_router::db::create_pool(&config.database)?;

    let state = AppState::new(pool, config.clone(), screenshots);
    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}
