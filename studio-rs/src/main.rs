use sqlx::SqlitePool;
use std::sync::Arc;
use studio_rs::api::{ApiServer, AppState};
use studio_rs::auth::JwtConfig;
use studio_rs::config::Config;
use studio_rs::gallery::SqliteGalleryStore;
use studio_rs::generation::gemini::GeminiGenerator;
use studio_rs::generation::mock::MockGenerator;
use studio_rs::generation::{ImageGenerator, Orchestrator};
use studio_rs::usage::{SqliteUsageStore, UsageManager};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::DEBUG)
        .pretty()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting studio-rs server");

    // Load configuration
    let config = if std::path::Path::new("config.toml").exists() {
        Config::from_file("config.toml")?
    } else {
        info!("No config file found, using defaults");
        Config::default()
    };

    info!("Configuration loaded");
    info!("  API listening on: {}", config.server.listen_addr);
    info!("  Database: {}", config.storage.database_url);
    info!("  Generation provider: {}", config.generation.provider);

    // Initialize storage
    let db = SqlitePool::connect(&config.storage.database_url).await?;
    let usage = Arc::new(UsageManager::new(Arc::new(
        SqliteUsageStore::new(db.clone()).await?,
    )));
    let gallery = Arc::new(SqliteGalleryStore::new(db).await?);

    // Initialize the generation engine
    let generator: Arc<dyn ImageGenerator> = match config.generation.provider.as_str() {
        "mock" => Arc::new(MockGenerator::new()),
        _ => Arc::new(GeminiGenerator::from_env(
            &config.generation.api_key_env,
            config.generation.model.clone(),
        )?),
    };
    info!("  Generation model: {}", generator.model_name());

    let orchestrator = Arc::new(Orchestrator::new(
        generator,
        Arc::clone(&usage),
        gallery.clone(),
    ));

    let state = Arc::new(AppState {
        usage,
        gallery,
        orchestrator,
        jwt_config: JwtConfig::new(config.auth.jwt_secret.clone(), 24),
    });

    let server = ApiServer::new(state, config.server.listen_addr.clone());
    server.run().await?;

    Ok(())
}
