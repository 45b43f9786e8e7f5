//! Report Core - Item Affinity & Bucketed Sales Engine
//!
//! This module computes the fused "item breakdown + sold with pizza" report
//! over POS transaction lines, one fulfillment bucket at a time, with memory
//! bounded by chunked scanning.
//!
//! # Architecture
//!
//! ```text
//! SQLite transaction_lines → SqliteLineReader (chunked cursor scans)
//!     ↓
//! CategoryIdSets (flag-driven id sets + static lists → relevant universe)
//!     ↓
//! resolve_unit_prices (first-seen price, most-recent fallback)
//!     ↓
//! BucketAccumulator (per-bucket item totals + pizza-order correlation)
//!     ↓
//! build_rows / rank_rows (units DESC, sales DESC)
//!     ↓
//! FusedReport (serde → JSON, keyed by bucket)
//! ```
//!
//! The standalone cross-sell rollup (`cross_sell`) shares the bucket
//! definitions but aggregates directly in SQL, grouped per store.

pub mod buckets;
pub mod categories;
pub mod cross_sell;
pub mod engine;
pub mod line_reader;
pub mod pricing;
pub mod ranking;
pub mod report;

pub use buckets::ServiceBucket;
pub use categories::{CategoryIdSets, CategoryTag, ItemId};
pub use cross_sell::{sold_with_pizza_by_store, CompanionLine, StoreCrossSell};
pub use engine::{aggregate_bucket, BucketAccumulator, ItemTotals, SeenItems, SoldWithRates, SoldWithTotals};
pub use line_reader::{LineFilter, ReaderError, SqliteLineReader, TransactionLine};
pub use pricing::{resolve_unit_prices, UnitPriceTable};
pub use ranking::{build_rows, rank_rows, top_n, BreakdownRow};
pub use report::{
    item_breakdown_with_affinity, BucketBreakdown, BucketMap, FusedReport, ReportError,
    ReportOptions, ReportQuery, SoldWithBucket,
};
