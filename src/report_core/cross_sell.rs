//! Standalone sold-with-pizza rollup grouped by store
//!
//! A lighter view than the fused report: fixed companion lists, one grouped
//! query per side, no bundle exclusion. SQLite does the heavy lifting here
//! because the per-store shape fits a GROUP BY better than the chunked scan.

use super::buckets::ServiceBucket;
use super::categories::{ItemId, BEV_2L_ITEM_IDS, COOKIE_ITEM_IDS, CRAZY_SAUCE_ITEM_ID};
use super::line_reader::{id_list, push_filter_sql, LineFilter, SqliteLineReader};
use super::report::ReportError;
use chrono::NaiveDate;
use rusqlite::params_from_iter;
use rusqlite::types::Value;
use serde::Serialize;
use std::collections::BTreeMap;

/// One companion SKU's units inside one store
#[derive(Debug, Clone, Serialize)]
pub struct CompanionLine {
    pub item_id: ItemId,
    pub name: String,
    pub units: i64,
}

/// Sold-with-pizza rollup for one store
#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreCrossSell {
    pub franchise_store: String,
    pub pizza_base_units: i64,
    pub crazy_bread: Vec<CompanionLine>,
    pub cookies: Vec<CompanionLine>,
    pub crazy_sauce: Vec<CompanionLine>,
    pub wings: Vec<CompanionLine>,
    pub bev_2l: Vec<CompanionLine>,
}

impl StoreCrossSell {
    fn empty(franchise_store: &str) -> Self {
        Self {
            franchise_store: franchise_store.to_string(),
            ..Default::default()
        }
    }
}

fn companion_id_list() -> String {
    let mut ids: Vec<ItemId> = Vec::new();
    ids.extend_from_slice(COOKIE_ITEM_IDS);
    ids.push(CRAZY_SAUCE_ITEM_ID);
    ids.extend_from_slice(BEV_2L_ITEM_IDS);
    id_list(&ids)
}

/// Per-store sold-with-pizza rollup for one bucket
///
/// Passing a store narrows the rollup and guarantees one entry for it, even
/// when the window had no pizza sales there. Passing None returns every store
/// with activity, ascending by store code.
pub fn sold_with_pizza_by_store(
    reader: &SqliteLineReader,
    store: Option<&str>,
    from: NaiveDate,
    to: NaiveDate,
    bucket: ServiceBucket,
) -> Result<Vec<StoreCrossSell>, ReportError> {
    let filter =
        LineFilter::new(store.map(|s| s.to_string()), from, to, false).for_bucket(bucket);
    let conn = reader.connection();
    let mut rollups: BTreeMap<String, StoreCrossSell> = BTreeMap::new();

    let mut sql = String::from(
        "SELECT franchise_store, SUM(quantity) FROM transaction_lines WHERE is_pizza = 1",
    );
    let mut params: Vec<Value> = Vec::new();
    push_filter_sql(&filter, &mut sql, &mut params);
    sql.push_str(" GROUP BY franchise_store ORDER BY franchise_store ASC");

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(params))?;
    while let Some(row) = rows.next()? {
        let store_id: String = row.get(0)?;
        let base: i64 = row.get(1)?;
        rollups
            .entry(store_id.clone())
            .or_insert_with(|| StoreCrossSell::empty(&store_id))
            .pizza_base_units = base;
    }

    // Companion units per (store, item), restricted to orders that bought
    // pizza. Void lines stay in so the sums net, same as the pizza base.
    // Order ids are only unique within a store, so the correlation carries
    // the store; the window filter repeats inside the subquery so both
    // sides see the same orders.
    let mut sql = format!(
        "SELECT franchise_store, item_id, MIN(item_name), SUM(quantity), MAX(is_bread), MAX(is_wings) \
         FROM transaction_lines \
         WHERE (is_bread = 1 OR is_wings = 1 OR item_id IN ({}))",
        companion_id_list()
    );
    let mut params: Vec<Value> = Vec::new();
    push_filter_sql(&filter, &mut sql, &mut params);
    sql.push_str(
        " AND (franchise_store, order_id) IN (SELECT franchise_store, order_id FROM transaction_lines WHERE is_pizza = 1",
    );
    push_filter_sql(&filter, &mut sql, &mut params);
    sql.push_str(") GROUP BY franchise_store, item_id ORDER BY franchise_store ASC, SUM(quantity) DESC, item_id ASC");

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(params))?;
    while let Some(row) = rows.next()? {
        let store_id: String = row.get(0)?;
        let item_id: ItemId = row.get(1)?;
        let name: String = row.get(2)?;
        let units: i64 = row.get(3)?;
        let is_bread: bool = row.get(4)?;
        let is_wings: bool = row.get(5)?;

        let entry = rollups
            .entry(store_id.clone())
            .or_insert_with(|| StoreCrossSell::empty(&store_id));
        let line = CompanionLine {
            item_id,
            name,
            units,
        };

        if is_bread {
            entry.crazy_bread.push(line);
        } else if COOKIE_ITEM_IDS.contains(&item_id) {
            entry.cookies.push(line);
        } else if item_id == CRAZY_SAUCE_ITEM_ID {
            entry.crazy_sauce.push(line);
        } else if is_wings {
            entry.wings.push(line);
        } else if BEV_2L_ITEM_IDS.contains(&item_id) {
            entry.bev_2l.push(line);
        }
    }

    if let Some(requested) = store {
        rollups
            .entry(requested.to_string())
            .or_insert_with(|| StoreCrossSell::empty(requested));
    }

    Ok(rollups.into_values().collect())
}
