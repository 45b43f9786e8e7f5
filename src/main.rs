//! DoughFlow - Fused Item Breakdown Report
//!
//! Computes the per-bucket item breakdown plus sold-with-pizza affinity over
//! POS transaction lines in SQLite and prints the result as JSON.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release -- --from 2025-01-01 --to 2025-01-31
//! cargo run --release -- --store 03795-00016 --from 2025-01-01 --to 2025-01-31 --out report.json
//! ```
//!
//! ## Arguments
//!
//! - `--store <id|all>` - Franchise store to report on (default: all)
//! - `--from <YYYY-MM-DD>` - Window start business date (required)
//! - `--to <YYYY-MM-DD>` - Window end business date, inclusive (required)
//! - `--exclude-bundled` - Drop bundle components and modified lines from totals
//! - `--out <path>` - Write JSON to a file instead of stdout
//!
//! ## Environment Variables
//!
//! - DOUGHFLOW_DB_PATH - SQLite database path (default: data/doughflow.db)
//! - PRICE_REFERENCE_STORE - Store anchoring unit prices for all-store runs (default: 03795-00016)
//! - LINE_CHUNK_SIZE - Rows fetched per scan chunk (default: 5000)
//! - RUST_LOG - Logging level (optional, default: info)

pub mod config;
pub mod report_core;
pub mod sqlite_pragma;

use config::{arg_value, has_flag, Config};
use report_core::{item_breakdown_with_affinity, ReportOptions, ReportQuery, SqliteLineReader};

pub fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    dotenv::dotenv().ok();

    let config = Config::from_env();
    let args: Vec<String> = std::env::args().collect();

    let store = arg_value(&args, "--store").unwrap_or_else(|| "all".to_string());
    let from = arg_value(&args, "--from").ok_or("missing required --from YYYY-MM-DD")?;
    let to = arg_value(&args, "--to").ok_or("missing required --to YYYY-MM-DD")?;
    let exclude_bundled = has_flag(&args, "--exclude-bundled");
    let out_path = arg_value(&args, "--out");

    log::info!("🚀 Starting DoughFlow fused report");
    log::info!("   Database: {}", config.db_path);
    log::info!("   Store: {}", store);
    log::info!("   Window: {} to {}", from, to);
    log::info!("   Exclude bundled: {}", exclude_bundled);
    log::info!("   Price reference store: {}", config.price_reference_store);

    let query = ReportQuery::parse(&store, &from, &to, exclude_bundled)?;
    let reader = SqliteLineReader::with_chunk_size(&config.db_path, config.line_chunk_size)?;
    let options = ReportOptions {
        price_reference_store: config.price_reference_store.clone(),
    };

    let report = item_breakdown_with_affinity(&reader, &query, &options)?;
    let json = serde_json::to_string_pretty(&report)?;

    match out_path {
        Some(path) => {
            std::fs::write(&path, &json)?;
            log::info!("✅ Report written to {}", path);
        }
        None => println!("{}", json),
    }

    Ok(())
}
