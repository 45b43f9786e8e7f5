//! SQLite-based transaction line reader with chunked cursor scans
//!
//! All report input flows through here: line_id-cursor chunk scans for the
//! aggregation engine, (business_date, line_id) keyset scans for price
//! resolution, and distinct-id lookups for the category sets.

use super::buckets::{MethodSet, ServiceBucket};
use super::categories::{CategoryFlag, ItemId};
use crate::sqlite_pragma::apply_optimized_pragmas;
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::path::Path;

#[cfg(test)]
use rusqlite::params;

pub const DEFAULT_CHUNK_SIZE: usize = 5000;

#[derive(Debug)]
pub enum ReaderError {
    Database(rusqlite::Error),
}

impl From<rusqlite::Error> for ReaderError {
    fn from(err: rusqlite::Error) -> Self {
        ReaderError::Database(err)
    }
}

impl std::fmt::Display for ReaderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReaderError::Database(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for ReaderError {}

/// One line item of one customer order, flags precomputed by the loader
#[derive(Debug, Clone)]
pub struct TransactionLine {
    pub line_id: i64,
    pub order_id: String,
    pub franchise_store: String,
    pub business_date: NaiveDate,
    pub item_id: ItemId,
    pub item_name: String,
    pub net_amount: f64,
    pub quantity: i64,
    pub order_placed_method: String,
    pub order_fulfilled_method: String,
    pub bundle_name: Option<String>,
    pub modification_reason: Option<String>,
    pub is_pizza: bool,
    pub is_bread: bool,
    pub is_wings: bool,
    pub is_beverages: bool,
    pub is_crazy_puffs: bool,
    pub is_caesar_dip: bool,
}

/// Filters shared by every row scan
#[derive(Debug, Clone)]
pub struct LineFilter {
    pub store: Option<String>,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub placed_methods: MethodSet,
    pub fulfilled_methods: MethodSet,
    pub exclude_bundled: bool,
}

impl LineFilter {
    pub fn new(store: Option<String>, from: NaiveDate, to: NaiveDate, exclude_bundled: bool) -> Self {
        Self {
            store,
            from,
            to,
            placed_methods: None,
            fulfilled_methods: None,
            exclude_bundled,
        }
    }

    /// Narrow to the bucket's sales channels
    pub fn for_bucket(mut self, bucket: ServiceBucket) -> Self {
        self.placed_methods = bucket.placed_methods();
        self.fulfilled_methods = bucket.fulfilled_methods();
        self
    }
}

const LINE_COLUMNS: &str = "line_id, order_id, franchise_store, business_date, item_id, item_name, net_amount, quantity, order_placed_method, order_fulfilled_method, bundle_name, modification_reason, is_pizza, is_bread, is_wings, is_beverages, is_crazy_puffs, is_caesar_dip";

pub(crate) fn push_filter_sql(filter: &LineFilter, sql: &mut String, params: &mut Vec<Value>) {
    if let Some(ref store) = filter.store {
        sql.push_str(" AND franchise_store = ?");
        params.push(Value::Text(store.clone()));
    }

    sql.push_str(" AND business_date >= ? AND business_date <= ?");
    params.push(Value::Text(filter.from.to_string()));
    params.push(Value::Text(filter.to.to_string()));

    if let Some(methods) = filter.placed_methods {
        push_method_set(sql, params, "order_placed_method", methods);
    }
    if let Some(methods) = filter.fulfilled_methods {
        push_method_set(sql, params, "order_fulfilled_method", methods);
    }

    if filter.exclude_bundled {
        sql.push_str(" AND (bundle_name IS NULL OR bundle_name = '') AND (modification_reason IS NULL OR modification_reason = '')");
    }
}

fn push_method_set(sql: &mut String, params: &mut Vec<Value>, column: &str, methods: &[&str]) {
    sql.push_str(" AND ");
    sql.push_str(column);
    sql.push_str(" IN (");
    for (i, method) in methods.iter().enumerate() {
        if i > 0 {
            sql.push(',');
        }
        sql.push('?');
        params.push(Value::Text((*method).to_string()));
    }
    sql.push(')');
}

// Item ids are integers, safe to embed; keeps the bind count clear of
// SQLITE_MAX_VARIABLE_NUMBER for large universes
pub(crate) fn id_list(ids: &[ItemId]) -> String {
    ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(",")
}

fn map_line_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TransactionLine> {
    Ok(TransactionLine {
        line_id: row.get(0)?,
        order_id: row.get(1)?,
        franchise_store: row.get(2)?,
        business_date: row.get(3)?,
        item_id: row.get(4)?,
        item_name: row.get(5)?,
        net_amount: row.get(6)?,
        quantity: row.get(7)?,
        order_placed_method: row.get(8)?,
        order_fulfilled_method: row.get(9)?,
        bundle_name: row.get(10)?,
        modification_reason: row.get(11)?,
        is_pizza: row.get(12)?,
        is_bread: row.get(13)?,
        is_wings: row.get(14)?,
        is_beverages: row.get(15)?,
        is_crazy_puffs: row.get(16)?,
        is_caesar_dip: row.get(17)?,
    })
}

/// Read-only SQLite line reader for report scans
pub struct SqliteLineReader {
    conn: Connection,
    chunk_size: usize,
}

impl SqliteLineReader {
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self, ReaderError> {
        Self::with_chunk_size(db_path, DEFAULT_CHUNK_SIZE)
    }

    pub fn with_chunk_size(db_path: impl AsRef<Path>, chunk_size: usize) -> Result<Self, ReaderError> {
        let conn = Connection::open(&db_path)?;

        // Apply optimized PRAGMAs (WAL, NORMAL, MEMORY, mmap, cache, autocheckpoint)
        apply_optimized_pragmas(&conn).map_err(ReaderError::Database)?;

        // Enable read-only mode so report runs never take write locks (must be after PRAGMAs)
        conn.execute("PRAGMA query_only = ON", [])?;

        let chunk_size = chunk_size.max(1);
        log::info!(
            "📥 Line reader ready: {} (chunk size {})",
            db_path.as_ref().display(),
            chunk_size
        );

        Ok(Self { conn, chunk_size })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Distinct item ids carrying a category flag inside the filter window
    pub fn distinct_flag_ids(
        &self,
        flag: CategoryFlag,
        filter: &LineFilter,
    ) -> Result<Vec<ItemId>, ReaderError> {
        let mut sql = format!(
            "SELECT DISTINCT item_id FROM transaction_lines WHERE {} = 1",
            flag.column()
        );
        let mut params: Vec<Value> = Vec::new();
        push_filter_sql(filter, &mut sql, &mut params);
        sql.push_str(" ORDER BY item_id ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(params), |row| row.get::<_, ItemId>(0))?;

        let mut ids = Vec::new();
        for id in rows {
            ids.push(id?);
        }
        Ok(ids)
    }

    /// Chunked scan of lines matching the filter that are either in the id
    /// universe or flagged as pizza, ordered by line_id
    pub fn scan_lines<'c>(&'c self, filter: &LineFilter, universe: &[ItemId]) -> LineScan<'c> {
        let mut sql = format!(
            "SELECT {} FROM transaction_lines WHERE line_id > ?",
            LINE_COLUMNS
        );
        let mut params: Vec<Value> = Vec::new();
        push_filter_sql(filter, &mut sql, &mut params);

        if universe.is_empty() {
            sql.push_str(" AND is_pizza = 1");
        } else {
            sql.push_str(&format!(" AND (item_id IN ({}) OR is_pizza = 1)", id_list(universe)));
        }
        sql.push_str(&format!(" ORDER BY line_id ASC LIMIT {}", self.chunk_size));

        LineScan {
            conn: &self.conn,
            sql,
            params,
            cursor: 0,
        }
    }

    /// Chunked scan for price resolution, ordered by (business_date, line_id)
    ///
    /// Only positive-quantity rows qualify; bundle and channel restrictions
    /// come in through the caller's filter.
    pub fn scan_prices<'c>(
        &'c self,
        filter: &LineFilter,
        targets: &[ItemId],
        descending: bool,
    ) -> PriceScan<'c> {
        let mut sql = String::from(
            "SELECT business_date, line_id, item_id, net_amount, quantity FROM transaction_lines WHERE quantity > 0",
        );
        let mut params: Vec<Value> = Vec::new();
        push_filter_sql(filter, &mut sql, &mut params);
        if !targets.is_empty() {
            sql.push_str(&format!(" AND item_id IN ({})", id_list(targets)));
        }

        PriceScan {
            conn: &self.conn,
            base_sql: sql,
            base_params: params,
            descending,
            cursor: None,
            exhausted: targets.is_empty(),
            chunk_size: self.chunk_size,
        }
    }
}

/// In-progress chunked line scan; `next_chunk` returns empty once exhausted
pub struct LineScan<'c> {
    conn: &'c Connection,
    sql: String,
    params: Vec<Value>,
    cursor: i64,
}

impl LineScan<'_> {
    pub fn next_chunk(&mut self) -> Result<Vec<TransactionLine>, ReaderError> {
        let mut stmt = self.conn.prepare(&self.sql)?;
        let bound = std::iter::once(Value::Integer(self.cursor)).chain(self.params.iter().cloned());
        let rows = stmt.query_map(params_from_iter(bound), map_line_row)?;

        let mut lines = Vec::new();
        let mut max_id = self.cursor;
        for row in rows {
            let line = row?;
            max_id = max_id.max(line.line_id);
            lines.push(line);
        }

        if max_id > self.cursor {
            self.cursor = max_id;
            log::debug!("📥 Read {} lines, cursor at line_id={}", lines.len(), max_id);
        }

        Ok(lines)
    }

    pub fn cursor_position(&self) -> i64 {
        self.cursor
    }
}

/// One price-qualifying row
#[derive(Debug, Clone)]
pub struct PriceRow {
    pub business_date: NaiveDate,
    pub line_id: i64,
    pub item_id: ItemId,
    pub net_amount: f64,
    pub quantity: i64,
}

fn map_price_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PriceRow> {
    Ok(PriceRow {
        business_date: row.get(0)?,
        line_id: row.get(1)?,
        item_id: row.get(2)?,
        net_amount: row.get(3)?,
        quantity: row.get(4)?,
    })
}

/// In-progress keyset scan over price-qualifying rows
pub struct PriceScan<'c> {
    conn: &'c Connection,
    base_sql: String,
    base_params: Vec<Value>,
    descending: bool,
    cursor: Option<(NaiveDate, i64)>,
    exhausted: bool,
    chunk_size: usize,
}

impl PriceScan<'_> {
    pub fn next_chunk(&mut self) -> Result<Vec<PriceRow>, ReaderError> {
        if self.exhausted {
            return Ok(Vec::new());
        }

        let mut sql = self.base_sql.clone();
        let mut params = self.base_params.clone();

        if let Some((date, line_id)) = self.cursor {
            let cmp = if self.descending { "<" } else { ">" };
            sql.push_str(&format!(
                " AND (business_date {} ? OR (business_date = ? AND line_id {} ?))",
                cmp, cmp
            ));
            params.push(Value::Text(date.to_string()));
            params.push(Value::Text(date.to_string()));
            params.push(Value::Integer(line_id));
        }

        let dir = if self.descending { "DESC" } else { "ASC" };
        sql.push_str(&format!(
            " ORDER BY business_date {}, line_id {} LIMIT {}",
            dir, dir, self.chunk_size
        ));

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(params), map_price_row)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }

        match out.last() {
            Some(last) => self.cursor = Some((last.business_date, last.line_id)),
            None => self.exhausted = true,
        }

        Ok(out)
    }
}
