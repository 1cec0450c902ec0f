// One-off inflation calculation against the configured CPI export.
use anyhow::{anyhow, bail, Result};
use dotenv::dotenv;
use std::env;

use india_inflation::config::AppConfig;
use india_inflation::services::calculator::calculate_inflation;
use india_inflation::services::clock::{Clock, SystemClock};
use india_inflation::services::exports::ExportResolver;
use india_inflation::services::formatting::{format_currency, format_percent};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    if args.len() < 3 {
        bail!("usage: calc <amount> <from YYYY-MM> <to YYYY-MM> [series-slug]");
    }
    let amount: f64 = args[0].parse().map_err(|_| anyhow!("amount must be a number, got '{}'", args[0]))?;

    let config = AppConfig::from_env()?;
    let slug = args.get(3).cloned().unwrap_or(config.cpi_series_slug.clone());
    let resolver = ExportResolver::from_config(&config.exports);
    let export = resolver.load_item_export(&slug, true).await?;
    let series = export.data.observations();

    let result = calculate_inflation(amount, &args[1], &args[2], &series, SystemClock.current_month())
        .map_err(|e| anyhow!(e))?;

    println!(
        "{} in {} is worth {} in {}",
        format_currency(result.original_amount),
        result.from_date,
        format_currency(result.adjusted_amount),
        result.to_date
    );
    println!(
        "Cumulative inflation {} over {} months ({} a year), CPI {} -> {} [{}]",
        format_percent(result.inflation_rate),
        result.total_months,
        format_percent(result.average_annual_rate),
        result.from_index,
        result.to_index,
        export.source
    );
    Ok(())
}
