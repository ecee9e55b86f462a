use anyhow::{Context, Result};
use geoclub_cms::{config::Config, db::Database, server, service::ImageStore};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("geoclub_cms=info".parse()?),
        )
        .init();

    info!("Starting geocaching club CMS");

    // Load configuration from environment
    let config = Config::from_env()?;

    // Open the database, creating its directory on first run
    if let Some(parent) = std::path::Path::new(&config.database_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .context("Failed to create the database directory")?;
        }
    }
    let db = Database::new(&config.database_path, &config.default_language)?;
    let images = ImageStore::new(&config.images_dir);

    let port = config.port;
    let state = server::AppState::new(config, db, images);
    let app = server::router(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .context(format!("Failed to bind port {}", port))?;
    info!("Listening on port {}", port);

    axum::serve(listener, app).await?;

    Ok(())
}
