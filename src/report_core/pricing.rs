//! Per-bucket unit price resolution
//!
//! The first qualifying row in chronological order prices an item; whatever
//! is still unpriced afterwards falls back to the most recent row in the
//! window with the channel filters dropped.

use super::buckets::ServiceBucket;
use super::categories::ItemId;
use super::line_reader::{LineFilter, ReaderError, SqliteLineReader};
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};

/// Resolved per-unit prices for one bucket
pub type UnitPriceTable = HashMap<ItemId, f64>;

/// Resolve unit prices for every universe item against the reference store
///
/// Items with no qualifying row in either pass stay absent; readers report
/// those as 0.0.
pub fn resolve_unit_prices(
    reader: &SqliteLineReader,
    bucket: ServiceBucket,
    reference_store: &str,
    from: NaiveDate,
    to: NaiveDate,
    universe: &[ItemId],
) -> Result<UnitPriceTable, ReaderError> {
    let mut prices = UnitPriceTable::new();
    if universe.is_empty() {
        return Ok(prices);
    }

    let filter = LineFilter {
        store: Some(reference_store.to_string()),
        from,
        to,
        placed_methods: bucket.price_placed_methods(),
        fulfilled_methods: bucket.price_fulfilled_methods(),
        exclude_bundled: true,
    };
    collect_first_seen(reader, &filter, universe, false, &mut prices)?;

    // Fallback: most recent row in the window, any channel
    let missing: Vec<ItemId> = universe
        .iter()
        .copied()
        .filter(|id| !prices.contains_key(id))
        .collect();
    if !missing.is_empty() {
        let fallback = LineFilter {
            placed_methods: None,
            fulfilled_methods: None,
            ..filter
        };
        collect_first_seen(reader, &fallback, &missing, true, &mut prices)?;
    }

    log::debug!(
        "💰 Priced {} of {} items for bucket '{}'",
        prices.len(),
        universe.len(),
        bucket.key()
    );
    Ok(prices)
}

/// Walk the scan and take the first row seen per target item
fn collect_first_seen(
    reader: &SqliteLineReader,
    filter: &LineFilter,
    targets: &[ItemId],
    descending: bool,
    prices: &mut UnitPriceTable,
) -> Result<(), ReaderError> {
    let mut remaining: HashSet<ItemId> = targets.iter().copied().collect();
    let mut scan = reader.scan_prices(filter, targets, descending);

    loop {
        let chunk = scan.next_chunk()?;
        if chunk.is_empty() {
            break;
        }
        for row in &chunk {
            if remaining.remove(&row.item_id) {
                prices.insert(row.item_id, row.net_amount / row.quantity as f64);
            }
        }
        if remaining.is_empty() {
            break;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::{params, Connection};
    use tempfile::tempdir;

    const STORE: &str = "03795-00016";

    fn setup_test_db() -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");

        let conn = Connection::open(&db_path).unwrap();
        conn.execute(
            "CREATE TABLE transaction_lines (
                line_id INTEGER PRIMARY KEY,
                order_id TEXT NOT NULL,
                franchise_store TEXT NOT NULL,
                business_date TEXT NOT NULL,
                item_id INTEGER NOT NULL,
                item_name TEXT NOT NULL,
                net_amount REAL NOT NULL,
                quantity INTEGER NOT NULL,
                order_placed_method TEXT NOT NULL,
                order_fulfilled_method TEXT NOT NULL,
                bundle_name TEXT,
                modification_reason TEXT,
                is_pizza INTEGER NOT NULL DEFAULT 0,
                is_bread INTEGER NOT NULL DEFAULT 0,
                is_wings INTEGER NOT NULL DEFAULT 0,
                is_beverages INTEGER NOT NULL DEFAULT 0,
                is_crazy_puffs INTEGER NOT NULL DEFAULT 0,
                is_caesar_dip INTEGER NOT NULL DEFAULT 0
            )",
            [],
        )
        .unwrap();

        (dir, db_path)
    }

    // day is the January day number; methods default to the in-store channel
    fn seed(
        conn: &Connection,
        line_id: i64,
        day: u32,
        item_id: ItemId,
        net: f64,
        qty: i64,
        placed: &str,
        bundle: Option<&str>,
    ) {
        conn.execute(
            "INSERT INTO transaction_lines (line_id, order_id, franchise_store, business_date, item_id, item_name, net_amount, quantity, order_placed_method, order_fulfilled_method, bundle_name)
             VALUES (?1, 'O-1', ?2, ?3, ?4, 'Item', ?5, ?6, ?7, 'Register', ?8)",
            params![
                line_id,
                STORE,
                NaiveDate::from_ymd_opt(2025, 1, day).unwrap(),
                item_id,
                net,
                qty,
                placed,
                bundle,
            ],
        )
        .unwrap();
    }

    fn window() -> (NaiveDate, NaiveDate) {
        (
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 7).unwrap(),
        )
    }

    #[test]
    fn test_first_seen_price_wins() {
        let (_dir, db_path) = setup_test_db();
        let conn = Connection::open(&db_path).unwrap();

        // later row has a discounted price; the earlier one must win
        seed(&conn, 10, 2, 101, 13.98, 2, "Register", None);
        seed(&conn, 20, 5, 101, 5.00, 1, "Register", None);
        drop(conn);

        let reader = SqliteLineReader::open(&db_path).unwrap();
        let (from, to) = window();
        let prices = resolve_unit_prices(&reader, ServiceBucket::InStore, STORE, from, to, &[101]).unwrap();

        assert_eq!(prices.get(&101), Some(&6.99));
    }

    #[test]
    fn test_same_day_lowest_line_id_wins() {
        let (_dir, db_path) = setup_test_db();
        let conn = Connection::open(&db_path).unwrap();

        seed(&conn, 30, 3, 101, 8.00, 1, "Register", None);
        seed(&conn, 12, 3, 101, 6.00, 1, "Register", None);
        drop(conn);

        let reader = SqliteLineReader::open(&db_path).unwrap();
        let (from, to) = window();
        let prices = resolve_unit_prices(&reader, ServiceBucket::InStore, STORE, from, to, &[101]).unwrap();

        assert_eq!(prices.get(&101), Some(&6.00));
    }

    #[test]
    fn test_fallback_uses_most_recent_any_channel() {
        let (_dir, db_path) = setup_test_db();
        let conn = Connection::open(&db_path).unwrap();

        // no in-store-placed rows for this item, only marketplace ones
        seed(&conn, 1, 2, 101, 9.49, 1, "DoorDash", None);
        seed(&conn, 2, 6, 101, 9.99, 1, "DoorDash", None);
        drop(conn);

        let reader = SqliteLineReader::open(&db_path).unwrap();
        let (from, to) = window();
        let prices = resolve_unit_prices(&reader, ServiceBucket::InStore, STORE, from, to, &[101]).unwrap();

        // most recent row, not the earliest
        assert_eq!(prices.get(&101), Some(&9.99));
    }

    #[test]
    fn test_channel_match_beats_fallback() {
        let (_dir, db_path) = setup_test_db();
        let conn = Connection::open(&db_path).unwrap();

        seed(&conn, 1, 6, 101, 9.99, 1, "DoorDash", None);
        seed(&conn, 2, 4, 101, 6.99, 1, "Register", None);
        drop(conn);

        let reader = SqliteLineReader::open(&db_path).unwrap();
        let (from, to) = window();
        let prices = resolve_unit_prices(&reader, ServiceBucket::InStore, STORE, from, to, &[101]).unwrap();

        assert_eq!(prices.get(&101), Some(&6.99));
    }

    #[test]
    fn test_bundled_and_void_rows_never_price() {
        let (_dir, db_path) = setup_test_db();
        let conn = Connection::open(&db_path).unwrap();

        seed(&conn, 1, 2, 101, 0.0, 1, "Register", Some("Meal Deal"));
        seed(&conn, 2, 3, 101, -6.99, -1, "Register", None);
        seed(&conn, 3, 4, 102, 0.0, 2, "Register", None);
        drop(conn);

        let reader = SqliteLineReader::open(&db_path).unwrap();
        let (from, to) = window();
        let prices =
            resolve_unit_prices(&reader, ServiceBucket::InStore, STORE, from, to, &[101, 102]).unwrap();

        // 101 has no qualifying row at all; 102 legitimately prices to 0.0
        assert_eq!(prices.get(&101), None);
        assert_eq!(prices.get(&102), Some(&0.0));
    }

    #[test]
    fn test_reference_store_is_respected() {
        let (_dir, db_path) = setup_test_db();
        let conn = Connection::open(&db_path).unwrap();

        conn.execute(
            "INSERT INTO transaction_lines (line_id, order_id, franchise_store, business_date, item_id, item_name, net_amount, quantity, order_placed_method, order_fulfilled_method)
             VALUES (1, 'O-1', '03795-00099', '2025-01-02', 101, 'Item', 6.99, 1, 'Register', 'Register')",
            [],
        )
        .unwrap();
        drop(conn);

        let reader = SqliteLineReader::open(&db_path).unwrap();
        let (from, to) = window();
        let prices = resolve_unit_prices(&reader, ServiceBucket::InStore, STORE, from, to, &[101]).unwrap();

        assert!(prices.is_empty());
    }

    #[test]
    fn test_resolution_across_chunks() {
        let (_dir, db_path) = setup_test_db();
        let conn = Connection::open(&db_path).unwrap();

        // push the target item's first row past the first chunk
        for i in 1..=5 {
            seed(&conn, i, 2, 101, 6.99, 1, "Register", None);
        }
        seed(&conn, 6, 3, 102, 2.39, 1, "Register", None);
        drop(conn);

        let reader = SqliteLineReader::with_chunk_size(&db_path, 2).unwrap();
        let (from, to) = window();
        let prices =
            resolve_unit_prices(&reader, ServiceBucket::InStore, STORE, from, to, &[101, 102]).unwrap();

        assert_eq!(prices.get(&101), Some(&6.99));
        assert_eq!(prices.get(&102), Some(&2.39));
    }
}
