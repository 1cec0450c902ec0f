// Prints the CSV form of an item export to stdout.
use anyhow::{bail, Result};
use dotenv::dotenv;
use log::info;
use std::env;

use india_inflation::config::AppConfig;
use india_inflation::services::exports::{convert_export_to_csv, ExportResolver};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init();

    let slug = match env::args().nth(1) {
        Some(slug) => slug,
        None => bail!("usage: export_csv <slug>"),
    };

    let config = AppConfig::from_env()?;
    let resolver = ExportResolver::from_config(&config.exports);
    let export = resolver.load_item_export(&slug, true).await?;

    match &export.local_path {
        Some(path) => info!("Loaded {} from {} ({})", slug, export.source, path.display()),
        None => info!("Loaded {} from {}", slug, export.source),
    }

    print!("{}", convert_export_to_csv(&export.data)?);
    Ok(())
}
