//! Breakdown row assembly and ranking

use super::categories::ItemId;
use super::engine::ItemTotals;
use super::pricing::UnitPriceTable;
use serde::Serialize;
use std::collections::HashMap;

/// One row of a bucket's breakdown table
#[derive(Debug, Clone, Serialize)]
pub struct BreakdownRow {
    pub item_id: ItemId,
    pub name: String,
    pub unit_price: f64,
    pub total_sales: f64,
    pub units_sold: i64,
}

/// Materialize ranked rows for the given item ids
///
/// Ids missing from the totals map come out zero-filled, which is how the
/// all-items table shows items sold only in other buckets. Category tables
/// pass `drop_zero_units` to hide rows whose units netted out to nothing.
pub fn build_rows(
    ids: &[ItemId],
    items: &HashMap<ItemId, ItemTotals>,
    prices: &UnitPriceTable,
    drop_zero_units: bool,
) -> Vec<BreakdownRow> {
    let mut rows: Vec<BreakdownRow> = Vec::with_capacity(ids.len());

    for &item_id in ids {
        let (units, revenue, name) = match items.get(&item_id) {
            Some(totals) => (totals.units, totals.revenue, totals.name.clone()),
            None => (0, 0.0, String::new()),
        };
        if drop_zero_units && units == 0 {
            continue;
        }
        rows.push(BreakdownRow {
            item_id,
            name,
            unit_price: prices.get(&item_id).copied().unwrap_or(0.0),
            total_sales: revenue,
            units_sold: units,
        });
    }

    rank_rows(&mut rows);
    rows
}

/// Units descending, then revenue descending, then item id ascending
pub fn rank_rows(rows: &mut [BreakdownRow]) {
    rows.sort_by(|a, b| {
        b.units_sold
            .cmp(&a.units_sold)
            .then(b.total_sales.total_cmp(&a.total_sales))
            .then(a.item_id.cmp(&b.item_id))
    });
}

pub fn top_n(mut rows: Vec<BreakdownRow>, n: usize) -> Vec<BreakdownRow> {
    rows.truncate(n);
    rows
}
