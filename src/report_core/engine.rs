//! Per-bucket aggregation over chunked line scans
//!
//! One pass per bucket: item totals for the relevant universe, pizza base
//! units, and sold-with-pizza companion counters correlated against the
//! pizza orders found in the same chunk.

use super::categories::{
    CategoryTag, ItemId, DIET_PEPSI_20OZ_ITEM_ID, MTN_DEW_20OZ_ITEM_ID, PEPSI_20OZ_ITEM_ID,
};
use super::line_reader::{LineFilter, ReaderError, SqliteLineReader, TransactionLine};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Running totals for one item inside one bucket
#[derive(Debug, Clone, Default)]
pub struct ItemTotals {
    pub units: i64,
    pub revenue: f64,
    pub name: String,
}

/// Sold-with-pizza unit counters for one bucket
///
/// The three bottle SKUs tick independently of the category counters, so a
/// 20oz Pepsi shows up both under its own name and under beverages.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SoldWithTotals {
    pub pizza_base_units: i64,
    pub crazy_bread: i64,
    pub cookies: i64,
    pub crazy_sauce: i64,
    pub wings: i64,
    pub beverages: i64,
    pub crazy_puffs: i64,
    pub pepsi_20oz: i64,
    pub diet_pepsi_20oz: i64,
    pub mtn_dew_20oz: i64,
}

/// Companion units divided by the bucket's pizza base
#[derive(Debug, Clone, Default, Serialize)]
pub struct SoldWithRates {
    pub crazy_bread: f64,
    pub cookies: f64,
    pub crazy_sauce: f64,
    pub wings: f64,
    pub beverages: f64,
    pub crazy_puffs: f64,
    pub pepsi_20oz: f64,
    pub diet_pepsi_20oz: f64,
    pub mtn_dew_20oz: f64,
}

impl SoldWithTotals {
    fn add_companion(&mut self, line: &TransactionLine) {
        match line.item_id {
            PEPSI_20OZ_ITEM_ID => self.pepsi_20oz += line.quantity,
            DIET_PEPSI_20OZ_ITEM_ID => self.diet_pepsi_20oz += line.quantity,
            MTN_DEW_20OZ_ITEM_ID => self.mtn_dew_20oz += line.quantity,
            _ => {}
        }

        match CategoryTag::classify(line) {
            CategoryTag::Bread => self.crazy_bread += line.quantity,
            CategoryTag::Cookie => self.cookies += line.quantity,
            CategoryTag::CaesarDip => self.crazy_sauce += line.quantity,
            CategoryTag::Wings => self.wings += line.quantity,
            CategoryTag::Beverage => self.beverages += line.quantity,
            CategoryTag::CrazyPuffs => self.crazy_puffs += line.quantity,
            CategoryTag::Pizza | CategoryTag::Side | CategoryTag::Other => {}
        }
    }

    /// A void-heavy window can leave the base at or below zero; every rate
    /// reports 0.0 then instead of a nonsense ratio.
    pub fn rates(&self) -> SoldWithRates {
        let base = self.pizza_base_units;
        let pct = |units: i64| if base > 0 { units as f64 / base as f64 } else { 0.0 };

        SoldWithRates {
            crazy_bread: pct(self.crazy_bread),
            cookies: pct(self.cookies),
            crazy_sauce: pct(self.crazy_sauce),
            wings: pct(self.wings),
            beverages: pct(self.beverages),
            crazy_puffs: pct(self.crazy_puffs),
            pepsi_20oz: pct(self.pepsi_20oz),
            diet_pepsi_20oz: pct(self.diet_pepsi_20oz),
            mtn_dew_20oz: pct(self.mtn_dew_20oz),
        }
    }
}

/// Items observed in any bucket, with the first non-empty name recorded
#[derive(Debug, Default)]
pub struct SeenItems {
    ids: HashSet<ItemId>,
    names: HashMap<ItemId, String>,
}

impl SeenItems {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&mut self, item_id: ItemId, name: &str) {
        self.ids.insert(item_id);
        if !name.is_empty() {
            self.names.entry(item_id).or_insert_with(|| name.to_string());
        }
    }

    pub fn contains(&self, item_id: ItemId) -> bool {
        self.ids.contains(&item_id)
    }

    pub fn name_of(&self, item_id: ItemId) -> &str {
        self.names.get(&item_id).map(String::as_str).unwrap_or("")
    }

    pub fn sorted_ids(&self) -> Vec<ItemId> {
        let mut ids: Vec<ItemId> = self.ids.iter().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// One bucket's scan state
#[derive(Debug, Default)]
pub struct BucketAccumulator {
    pub items: HashMap<ItemId, ItemTotals>,
    pub sold_with: SoldWithTotals,
}

impl BucketAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absorb one chunk of lines
    ///
    /// Companion attribution only sees pizza orders from the same chunk;
    /// orders are contiguous under line_id order so splits are rare with a
    /// production-sized chunk. Order numbers repeat across stores, so the
    /// order set keys on (store, order).
    pub fn absorb_chunk(
        &mut self,
        chunk: &[TransactionLine],
        universe: &HashSet<ItemId>,
        seen: &mut SeenItems,
    ) {
        let mut pizza_orders: HashSet<(&str, &str)> = HashSet::new();

        for line in chunk {
            if universe.contains(&line.item_id) {
                let totals = self.items.entry(line.item_id).or_default();
                totals.units += line.quantity;
                totals.revenue += line.net_amount;
                if totals.name.is_empty() && !line.item_name.is_empty() {
                    totals.name = line.item_name.clone();
                }
                seen.mark(line.item_id, &line.item_name);
            }

            if line.is_pizza {
                self.sold_with.pizza_base_units += line.quantity;
                pizza_orders.insert((line.franchise_store.as_str(), line.order_id.as_str()));
            }
        }

        for line in chunk {
            if line.quantity <= 0 {
                continue;
            }
            if !pizza_orders.contains(&(line.franchise_store.as_str(), line.order_id.as_str())) {
                continue;
            }
            self.sold_with.add_companion(line);
        }
    }
}

/// Run the bucket's single chunked scan to completion
pub fn aggregate_bucket(
    reader: &SqliteLineReader,
    filter: &LineFilter,
    universe: &[ItemId],
    seen: &mut SeenItems,
) -> Result<BucketAccumulator, ReaderError> {
    let universe_set: HashSet<ItemId> = universe.iter().copied().collect();
    let mut acc = BucketAccumulator::new();

    let mut scan = reader.scan_lines(filter, universe);
    loop {
        let chunk = scan.next_chunk()?;
        if chunk.is_empty() {
            break;
        }
        acc.absorb_chunk(&chunk, &universe_set, seen);
    }

    Ok(acc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_line(line_id: i64, order_id: &str, item_id: ItemId, qty: i64, net: f64) -> TransactionLine {
        TransactionLine {
            line_id,
            order_id: order_id.to_string(),
            franchise_store: "03795-00016".to_string(),
            business_date: NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
            item_id,
            item_name: format!("Item {}", item_id),
            net_amount: net,
            quantity: qty,
            order_placed_method: "Register".to_string(),
            order_fulfilled_method: "Register".to_string(),
            bundle_name: None,
            modification_reason: None,
            is_pizza: false,
            is_bread: false,
            is_wings: false,
            is_beverages: false,
            is_crazy_puffs: false,
            is_caesar_dip: false,
        }
    }

    fn pizza(line_id: i64, order_id: &str, item_id: ItemId, qty: i64, net: f64) -> TransactionLine {
        let mut line = make_line(line_id, order_id, item_id, qty, net);
        line.is_pizza = true;
        line
    }

    fn universe(ids: &[ItemId]) -> HashSet<ItemId> {
        ids.iter().copied().collect()
    }

    #[test]
    fn test_item_totals_sum_units_and_revenue() {
        let mut acc = BucketAccumulator::new();
        let mut seen = SeenItems::new();
        let chunk = vec![
            make_line(1, "O-1", 101, 2, 13.98),
            make_line(2, "O-2", 101, 1, 6.99),
            make_line(3, "O-3", 101, -1, -6.99), // void
            make_line(4, "O-3", 999, 1, 4.00),   // outside universe
        ];

        acc.absorb_chunk(&chunk, &universe(&[101]), &mut seen);

        let totals = acc.items.get(&101).unwrap();
        assert_eq!(totals.units, 2);
        assert!((totals.revenue - 13.98).abs() < 1e-9);
        assert_eq!(totals.name, "Item 101");
        assert!(!acc.items.contains_key(&999));
        assert!(seen.contains(101));
        assert!(!seen.contains(999));
    }

    #[test]
    fn test_first_nonempty_name_wins() {
        let mut acc = BucketAccumulator::new();
        let mut seen = SeenItems::new();

        let mut unnamed = make_line(1, "O-1", 101, 1, 5.0);
        unnamed.item_name = String::new();
        let named = make_line(2, "O-2", 101, 1, 5.0);
        let mut renamed = make_line(3, "O-3", 101, 1, 5.0);
        renamed.item_name = "Renamed".to_string();

        acc.absorb_chunk(&[unnamed, named, renamed], &universe(&[101]), &mut seen);

        assert_eq!(acc.items.get(&101).unwrap().name, "Item 101");
        assert_eq!(seen.name_of(101), "Item 101");
    }

    #[test]
    fn test_pizza_base_and_companions() {
        let mut acc = BucketAccumulator::new();
        let mut seen = SeenItems::new();

        let mut bread = make_line(2, "O-1", 201, 1, 3.49);
        bread.is_bread = true;
        let mut stray_bread = make_line(3, "O-2", 201, 1, 3.49);
        stray_bread.is_bread = true; // order without pizza

        let chunk = vec![pizza(1, "O-1", 555, 2, 13.98), bread, stray_bread];
        acc.absorb_chunk(&chunk, &universe(&[555, 201]), &mut seen);

        assert_eq!(acc.sold_with.pizza_base_units, 2);
        assert_eq!(acc.sold_with.crazy_bread, 1);

        // the stray bread still counts toward item totals
        assert_eq!(acc.items.get(&201).unwrap().units, 2);
    }

    #[test]
    fn test_companions_require_positive_quantity() {
        let mut acc = BucketAccumulator::new();
        let mut seen = SeenItems::new();

        let mut voided = make_line(2, "O-1", 201, -1, -3.49);
        voided.is_bread = true;
        let mut zeroed = make_line(3, "O-1", 202, 0, 0.0);
        zeroed.is_bread = true;

        acc.absorb_chunk(
            &[pizza(1, "O-1", 555, 1, 6.99), voided, zeroed],
            &universe(&[555, 201, 202]),
            &mut seen,
        );

        assert_eq!(acc.sold_with.crazy_bread, 0);
        assert_eq!(acc.items.get(&201).unwrap().units, -1);
    }

    #[test]
    fn test_correlation_is_chunk_local() {
        let mut acc = BucketAccumulator::new();
        let mut seen = SeenItems::new();
        let ids = universe(&[555, 201]);

        let mut bread = make_line(2, "O-1", 201, 1, 3.49);
        bread.is_bread = true;

        // pizza and bread from the same order split across chunks
        acc.absorb_chunk(&[pizza(1, "O-1", 555, 1, 6.99)], &ids, &mut seen);
        acc.absorb_chunk(&[bread], &ids, &mut seen);

        assert_eq!(acc.sold_with.pizza_base_units, 1);
        assert_eq!(acc.sold_with.crazy_bread, 0);
    }

    #[test]
    fn test_shared_order_numbers_stay_store_local() {
        let mut acc = BucketAccumulator::new();
        let mut seen = SeenItems::new();

        // both stores reuse order number 1001; only one of them bought pizza
        let mut other_store_bread = make_line(2, "1001", 201, 1, 3.49);
        other_store_bread.franchise_store = "03795-00021".to_string();
        other_store_bread.is_bread = true;

        acc.absorb_chunk(
            &[pizza(1, "1001", 555, 1, 6.99), other_store_bread],
            &universe(&[555, 201]),
            &mut seen,
        );

        assert_eq!(acc.sold_with.pizza_base_units, 1);
        assert_eq!(acc.sold_with.crazy_bread, 0);
    }

    #[test]
    fn test_named_sku_counters_tick_independently() {
        let mut acc = BucketAccumulator::new();
        let mut seen = SeenItems::new();

        let mut pepsi = make_line(2, "O-1", PEPSI_20OZ_ITEM_ID, 2, 5.38);
        pepsi.is_beverages = true;
        let mut dew = make_line(3, "O-1", MTN_DEW_20OZ_ITEM_ID, 1, 2.69);
        dew.is_beverages = true;

        acc.absorb_chunk(
            &[pizza(1, "O-1", 555, 1, 6.99), pepsi, dew],
            &universe(&[555]),
            &mut seen,
        );

        assert_eq!(acc.sold_with.pepsi_20oz, 2);
        assert_eq!(acc.sold_with.mtn_dew_20oz, 1);
        assert_eq!(acc.sold_with.diet_pepsi_20oz, 0);
        assert_eq!(acc.sold_with.beverages, 3);
    }

    #[test]
    fn test_companion_precedence_single_counter() {
        let mut acc = BucketAccumulator::new();
        let mut seen = SeenItems::new();

        // flagged both bread and wings; only bread may count
        let mut combo = make_line(2, "O-1", 201, 1, 3.49);
        combo.is_bread = true;
        combo.is_wings = true;

        acc.absorb_chunk(
            &[pizza(1, "O-1", 555, 1, 6.99), combo],
            &universe(&[555]),
            &mut seen,
        );

        assert_eq!(acc.sold_with.crazy_bread, 1);
        assert_eq!(acc.sold_with.wings, 0);
    }

    #[test]
    fn test_pizza_is_not_its_own_companion() {
        let mut acc = BucketAccumulator::new();
        let mut seen = SeenItems::new();

        acc.absorb_chunk(
            &[pizza(1, "O-1", 555, 2, 13.98), pizza(2, "O-1", 556, 1, 8.49)],
            &universe(&[555, 556]),
            &mut seen,
        );

        assert_eq!(acc.sold_with.pizza_base_units, 3);
        let rates = acc.sold_with.rates();
        assert_eq!(rates.crazy_bread, 0.0);
        assert_eq!(rates.beverages, 0.0);
    }

    #[test]
    fn test_rates_division_and_zero_base_guard() {
        let mut totals = SoldWithTotals {
            pizza_base_units: 4,
            crazy_bread: 1,
            cookies: 2,
            ..Default::default()
        };

        let rates = totals.rates();
        assert_eq!(rates.crazy_bread, 0.25);
        assert_eq!(rates.cookies, 0.5);
        assert_eq!(rates.wings, 0.0);

        totals.pizza_base_units = 0;
        let rates = totals.rates();
        assert_eq!(rates.crazy_bread, 0.0);
        assert_eq!(rates.cookies, 0.0);

        totals.pizza_base_units = -2;
        assert_eq!(totals.rates().cookies, 0.0);
    }

    #[test]
    fn test_seen_items_union_across_buckets() {
        let mut seen = SeenItems::new();
        let ids = universe(&[101, 202]);

        let mut bucket_a = BucketAccumulator::new();
        bucket_a.absorb_chunk(&[make_line(1, "O-1", 101, 1, 5.0)], &ids, &mut seen);

        let mut bucket_b = BucketAccumulator::new();
        bucket_b.absorb_chunk(&[make_line(2, "O-2", 202, 1, 3.0)], &ids, &mut seen);

        assert_eq!(seen.sorted_ids(), vec![101, 202]);
        assert_eq!(seen.len(), 2);
        assert!(!bucket_a.items.contains_key(&202));
    }
}
