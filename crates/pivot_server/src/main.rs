//! Pivot admin server entry point.

use clap::Parser;
use log::{error, info};
use pivot_core::model::metadata::MetadataDocument;
use pivot_core::{init_logging, open_db, open_db_in_memory, ObjectRegistry};
use pivot_server::config::Config;
use pivot_server::{build_router, AppState};
use std::error::Error;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = Config::parse();

    if let Some(log_dir) = config.log_dir.as_deref() {
        init_logging(config.log_level(), log_dir)?;
    }

    let registry = load_registry(&config)?;
    let conn = match config.db_path.as_ref() {
        Some(path) => open_db(path)?,
        None => open_db_in_memory()?,
    };
    let app = build_router(AppState::new(conn, registry));

    let listener = match tokio::net::TcpListener::bind(config.bind).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(
                "event=server_bind module=server status=error addr={} error={}",
                config.bind, err
            );
            return Err(err.into());
        }
    };
    info!(
        "event=server_start module=server status=ok addr={}",
        config.bind
    );

    axum::serve(listener, app).await?;
    Ok(())
}

fn load_registry(config: &Config) -> Result<ObjectRegistry, Box<dyn Error>> {
    let Some(path) = config.metadata.as_ref() else {
        return Ok(ObjectRegistry::new());
    };
    let raw = std::fs::read_to_string(path)?;
    let document = MetadataDocument::from_json_str(&raw)?;
    let registry = ObjectRegistry::from_metadata(&document)?;
    info!(
        "event=metadata_load module=server status=ok types={}",
        registry.known_types().count()
    );
    Ok(registry)
}
