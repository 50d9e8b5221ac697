use std::path::PathBuf;

use tracing::info;

use readmegen::{api, logging, AppContext, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    logging::init(&log_level)?;

    let config_path = std::env::var("READMEGEN_CONFIG").ok().map(PathBuf::from);
    let config = Config::load(config_path.as_deref())?;
    let bind = config.server.bind.clone();

    info!("readmegen web server {} starting", env!("CARGO_PKG_VERSION"));
    info!("Document store: {}", config.storage.database_path.display());

    let context = AppContext::build(config).await?;
    api::serve(context, &bind).await?;
    Ok(())
}
