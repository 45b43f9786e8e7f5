//! Shared SQLite PRAGMA tuning applied to every report connection

use rusqlite::Connection;

/// Apply the optimized PRAGMA set (WAL, NORMAL, MEMORY, mmap, cache, autocheckpoint)
///
/// Report runs are read-heavy scans over a database the loader may still be
/// writing to; WAL keeps readers from blocking the loader.
pub fn apply_optimized_pragmas(conn: &Connection) -> Result<(), rusqlite::Error> {
    // journal_mode returns the resulting mode as a row
    let _mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;

    conn.execute_batch(
        "PRAGMA synchronous = NORMAL;
         PRAGMA temp_store = MEMORY;
         PRAGMA mmap_size = 268435456;
         PRAGMA cache_size = -65536;
         PRAGMA wal_autocheckpoint = 1000;",
    )?;

    Ok(())
}
