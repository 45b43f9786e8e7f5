//! Cross-Sell Binary - Sold-With-Pizza Rollup by Store
//!
//! Rolls up companion-item units inside pizza orders, grouped per store,
//! using fixed SKU lists. A narrower, faster view than the fused report.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release --bin cross_sell -- --from 2025-01-01 --to 2025-01-31
//! cargo run --release --bin cross_sell -- --store 03795-00016 --from 2025-01-01 --to 2025-01-31 --bucket lc_pickup
//! ```
//!
//! ## Arguments
//!
//! - `--store <id|all>` - Single store or every store (default: all)
//! - `--from <YYYY-MM-DD>` - Window start business date (required)
//! - `--to <YYYY-MM-DD>` - Window end business date, inclusive (required)
//! - `--bucket <key>` - in_store, lc_pickup, lc_delivery, third_party or all (default: all)
//! - `--out <path>` - Write JSON to a file instead of stdout
//!
//! ## Environment Variables
//!
//! - DOUGHFLOW_DB_PATH - SQLite database path (default: data/doughflow.db)
//! - RUST_LOG - Logging level (optional, default: info)

use doughflow::config::{arg_value, Config};
use doughflow::report_core::{
    sold_with_pizza_by_store, ReportQuery, ServiceBucket, SqliteLineReader,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    dotenv::dotenv().ok();

    let config = Config::from_env();
    let args: Vec<String> = std::env::args().collect();

    let store = arg_value(&args, "--store").unwrap_or_else(|| "all".to_string());
    let from = arg_value(&args, "--from").ok_or("missing required --from YYYY-MM-DD")?;
    let to = arg_value(&args, "--to").ok_or("missing required --to YYYY-MM-DD")?;
    let bucket = ServiceBucket::from_key_or_default(
        &arg_value(&args, "--bucket").unwrap_or_else(|| "all".to_string()),
    );
    let out_path = arg_value(&args, "--out");

    // Store normalization and date validation shared with the fused report
    let query = ReportQuery::parse(&store, &from, &to, false)?;

    log::info!("🚀 Starting cross-sell rollup");
    log::info!("   Database: {}", config.db_path);
    log::info!("   Store: {}", store);
    log::info!("   Window: {} to {}", from, to);
    log::info!("   Bucket: {}", bucket.key());

    let reader = SqliteLineReader::with_chunk_size(&config.db_path, config.line_chunk_size)?;
    let rollups = sold_with_pizza_by_store(
        &reader,
        query.store.as_deref(),
        query.from,
        query.to,
        bucket,
    )?;

    log::info!("✅ Rolled up {} store(s)", rollups.len());

    // A requested store always yields exactly one rollup; emit it bare
    let json = match query.store.as_ref().and_then(|_| rollups.first()) {
        Some(single) => serde_json::to_string_pretty(single)?,
        None => serde_json::to_string_pretty(&rollups)?,
    };

    match out_path {
        Some(path) => {
            std::fs::write(&path, &json)?;
            log::info!("✅ Rollup written to {}", path);
        }
        None => println!("{}", json),
    }

    Ok(())
}
