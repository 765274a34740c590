use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lectern_common::config::ServerAppConfig;
use lectern_extract::ocr::TesseractCli;
use lectern_server::{router, AppState};

#[derive(Parser)]
#[command(name = "lectern-server", about = "Document ingestion and delivery service")]
struct Args {
    /// Path to the TOML config file.
    #[arg(default_value = "/etc/lectern/server.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "lectern_server=info,tower_http=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config_str = std::fs::read_to_string(&args.config)
        .with_context(|| format!("reading config: {}", args.config))?;
    let config: ServerAppConfig = toml::from_str(&config_str)
        .context("parsing server config")?;

    let ocr = Arc::new(TesseractCli::new(
        config.ingest.tesseract_path.clone(),
        config.ingest.pdftoppm_path.clone(),
    ));

    let bind = config.server.bind.clone();
    let state = Arc::new(AppState::init(config, ocr)?);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("binding to {bind}"))?;

    tracing::info!("listening on {bind}");
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
