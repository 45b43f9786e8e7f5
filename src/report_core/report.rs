//! Fused report assembly
//!
//! Validates the request, drives the five bucket scans, and packages the
//! item breakdown plus sold-with-pizza sections into one serializable value.

use super::buckets::ServiceBucket;
use super::categories::{CategoryIdSets, ItemId};
use super::engine::{
    aggregate_bucket, BucketAccumulator, SeenItems, SoldWithRates, SoldWithTotals,
};
use super::line_reader::{LineFilter, ReaderError, SqliteLineReader};
use super::pricing::{resolve_unit_prices, UnitPriceTable};
use super::ranking::{build_rows, top_n, BreakdownRow};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

pub const PIZZA_TOP_N: usize = 10;
pub const BREAD_TOP_N: usize = 3;
pub const OVERALL_TOP_N: usize = 15;

#[derive(Debug)]
pub enum ReportError {
    Reader(ReaderError),
    InvalidDateRange(String),
}

impl From<ReaderError> for ReportError {
    fn from(err: ReaderError) -> Self {
        ReportError::Reader(err)
    }
}

impl From<rusqlite::Error> for ReportError {
    fn from(err: rusqlite::Error) -> Self {
        ReportError::Reader(ReaderError::Database(err))
    }
}

impl std::fmt::Display for ReportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportError::Reader(err) => write!(f, "Reader error: {}", err),
            ReportError::InvalidDateRange(msg) => write!(f, "Invalid date range: {}", msg),
        }
    }
}

impl std::error::Error for ReportError {}

/// Validated report request
#[derive(Debug, Clone)]
pub struct ReportQuery {
    pub store: Option<String>,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub exclude_bundled: bool,
}

impl ReportQuery {
    /// Parse raw CLI values; store "all" (or blank) means every store
    pub fn parse(
        store: &str,
        from: &str,
        to: &str,
        exclude_bundled: bool,
    ) -> Result<Self, ReportError> {
        let store = match store.trim() {
            s if s.is_empty() || s.eq_ignore_ascii_case("all") => None,
            s => Some(s.to_string()),
        };

        let from = parse_business_date(from)?;
        let to = parse_business_date(to)?;
        if from > to {
            return Err(ReportError::InvalidDateRange(format!(
                "{} is after {}",
                from, to
            )));
        }

        Ok(Self {
            store,
            from,
            to,
            exclude_bundled,
        })
    }

    fn base_filter(&self) -> LineFilter {
        LineFilter::new(self.store.clone(), self.from, self.to, self.exclude_bundled)
    }
}

fn parse_business_date(raw: &str) -> Result<NaiveDate, ReportError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| ReportError::InvalidDateRange(format!("'{}': {}", raw, e)))
}

/// Settings that come from config rather than the query
#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub price_reference_store: String,
}

/// One bucket's ranked tables
#[derive(Debug, Serialize)]
pub struct BucketBreakdown {
    pub label: &'static str,
    pub pizza_top10: Vec<BreakdownRow>,
    pub bread_top3: Vec<BreakdownRow>,
    pub wings: Vec<BreakdownRow>,
    pub crazy_puffs: Vec<BreakdownRow>,
    pub cookies: Vec<BreakdownRow>,
    pub beverages: Vec<BreakdownRow>,
    pub sides: Vec<BreakdownRow>,
    pub caesar_dips: Vec<BreakdownRow>,
    pub top15_overall: Vec<BreakdownRow>,
    pub all_items_seen: Vec<BreakdownRow>,
}

/// One bucket's sold-with-pizza counters and rates
#[derive(Debug, Serialize)]
pub struct SoldWithBucket {
    pub label: &'static str,
    pub units: SoldWithTotals,
    pub percentages: SoldWithRates,
}

/// Bucket-keyed section; serializes as `{"buckets": {key: ...}}` so consumers
/// address `item_breakdown.buckets.<key>`
#[derive(Debug, Serialize)]
pub struct BucketMap<T> {
    pub buckets: BTreeMap<&'static str, T>,
}

/// Complete fused report for one window
///
/// Buckets live in BTreeMaps keyed by bucket key so repeated runs serialize
/// byte-identically.
#[derive(Debug, Serialize)]
pub struct FusedReport {
    pub store: String,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub price_reference_store: String,
    pub item_breakdown: BucketMap<BucketBreakdown>,
    pub sold_with_pizza: BucketMap<SoldWithBucket>,
    pub all_items_union: Vec<ItemId>,
}

struct BucketOutcome {
    bucket: ServiceBucket,
    prices: UnitPriceTable,
    acc: BucketAccumulator,
}

/// Build the fused report: item breakdown tables plus sold-with-pizza affinity
pub fn item_breakdown_with_affinity(
    reader: &SqliteLineReader,
    query: &ReportQuery,
    options: &ReportOptions,
) -> Result<FusedReport, ReportError> {
    let base = query.base_filter();
    let sets = CategoryIdSets::build(reader, &base)?;
    let universe = sets.relevant_universe();
    log::info!(
        "🧾 Relevant universe: {} items ({} pizza, {} bread, {} wings)",
        universe.len(),
        sets.pizza.len(),
        sets.bread.len(),
        sets.wings.len()
    );

    // Prices always come from a single store so tables stay comparable
    let reference_store = query
        .store
        .clone()
        .unwrap_or_else(|| options.price_reference_store.clone());

    let mut seen = SeenItems::new();
    let mut outcomes: Vec<BucketOutcome> = Vec::with_capacity(ServiceBucket::all().len());

    for bucket in ServiceBucket::all() {
        let prices = resolve_unit_prices(
            reader,
            bucket,
            &reference_store,
            query.from,
            query.to,
            &universe,
        )?;
        let filter = base.clone().for_bucket(bucket);
        let acc = aggregate_bucket(reader, &filter, &universe, &mut seen)?;
        log::info!(
            "✅ Bucket '{}': {} items with activity, pizza base {} units",
            bucket.key(),
            acc.items.len(),
            acc.sold_with.pizza_base_units
        );
        outcomes.push(BucketOutcome {
            bucket,
            prices,
            acc,
        });
    }

    // The union only settles once every bucket has run
    let union_ids = seen.sorted_ids();

    let mut item_breakdown = BTreeMap::new();
    let mut sold_with_pizza = BTreeMap::new();

    for outcome in &outcomes {
        let prices = &outcome.prices;
        let acc = &outcome.acc;

        let breakdown = BucketBreakdown {
            label: outcome.bucket.label(),
            pizza_top10: top_n(build_rows(&sets.pizza, &acc.items, prices, true), PIZZA_TOP_N),
            bread_top3: top_n(build_rows(&sets.bread, &acc.items, prices, true), BREAD_TOP_N),
            wings: build_rows(&sets.wings, &acc.items, prices, true),
            crazy_puffs: build_rows(&sets.crazy_puffs, &acc.items, prices, true),
            cookies: build_rows(&sets.cookies, &acc.items, prices, true),
            beverages: build_rows(&sets.beverages, &acc.items, prices, true),
            sides: build_rows(&sets.sides, &acc.items, prices, true),
            caesar_dips: build_rows(&sets.caesar_dip, &acc.items, prices, true),
            top15_overall: top_n(build_rows(&universe, &acc.items, prices, true), OVERALL_TOP_N),
            all_items_seen: all_items_rows(&union_ids, acc, prices, &seen),
        };

        item_breakdown.insert(outcome.bucket.key(), breakdown);
        sold_with_pizza.insert(
            outcome.bucket.key(),
            SoldWithBucket {
                label: outcome.bucket.label(),
                units: acc.sold_with.clone(),
                percentages: acc.sold_with.rates(),
            },
        );
    }

    Ok(FusedReport {
        store: query.store.clone().unwrap_or_else(|| "all".to_string()),
        from: query.from,
        to: query.to,
        price_reference_store: reference_store,
        item_breakdown: BucketMap {
            buckets: item_breakdown,
        },
        sold_with_pizza: BucketMap {
            buckets: sold_with_pizza,
        },
        all_items_union: union_ids,
    })
}

/// Zero-filled union rows; names borrowed from other buckets when this one
/// never sold the item
fn all_items_rows(
    union_ids: &[ItemId],
    acc: &BucketAccumulator,
    prices: &UnitPriceTable,
    seen: &SeenItems,
) -> Vec<BreakdownRow> {
    let mut rows = build_rows(union_ids, &acc.items, prices, false);
    for row in &mut rows {
        if row.name.is_empty() {
            row.name = seen.name_of(row.item_id).to_string();
        }
    }
    rows
}
