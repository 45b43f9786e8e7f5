//! Report runtime configuration from environment variables

use std::env;

/// Configuration for report runs
///
/// Loaded from environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the POS SQLite database file
    pub db_path: String,

    /// Store whose rows anchor unit-price resolution when no store is requested
    pub price_reference_store: String,

    /// Rows fetched per scan chunk
    pub line_chunk_size: usize,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `DOUGHFLOW_DB_PATH` (default: data/doughflow.db)
    /// - `PRICE_REFERENCE_STORE` (default: 03795-00016)
    /// - `LINE_CHUNK_SIZE` (default: 5000)
    pub fn from_env() -> Self {
        Self {
            db_path: env::var("DOUGHFLOW_DB_PATH")
                .unwrap_or_else(|_| "data/doughflow.db".to_string()),

            price_reference_store: env::var("PRICE_REFERENCE_STORE")
                .unwrap_or_else(|_| "03795-00016".to_string()),

            line_chunk_size: env::var("LINE_CHUNK_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5_000),
        }
    }
}

/// Scan argv for `name` and return the following value
pub fn arg_value(args: &[String], name: &str) -> Option<String> {
    args.iter()
        .position(|a| a == name)
        .and_then(|idx| args.get(idx + 1).cloned())
}

/// True when `name` appears anywhere in argv
pub fn has_flag(args: &[String], name: &str) -> bool {
    args.iter().any(|a| a == name)
}
