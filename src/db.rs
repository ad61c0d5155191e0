use crate::error::{LmfError, Result};
use crate::models::{QueryResult, Row, Value};
use log::{debug, info, warn};
use regex::Regex;
use rusqlite::{Connection, OpenFlags, OptionalExtension};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use std::time::Instant;

// --- Schema Definition ---

pub const SCHEMA_VERSION: u32 = 1;

const SCHEMA_SQL: &str = include_str!("schema.sql");

static COMMENT_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^--.*?\r?\n").expect("valid regex"));

/// The schema script with its comment lines stripped.
pub fn schema_script() -> String {
    COMMENT_LINE.replace_all(SCHEMA_SQL, "").into_owned()
}

// --- Connection Handling ---

/// Opens (creating if necessary) the database file and tunes the connection.
pub fn open_db_connection(path: &Path) -> Result<Connection> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
    )?;
    conn.pragma_update(None, "cache_size", "-64000")?; // 64MB
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    Ok(conn)
}

/// Creates all tables and indices. Only called for freshly created files.
pub fn initialize_database(conn: &Connection) -> Result<()> {
    info!(
        "Initializing database schema (version {})...",
        SCHEMA_VERSION
    );
    conn.execute_batch(&schema_script())?;
    info!("Database schema initialization complete.");
    Ok(())
}

/// Logs whether an existing database carries the expected schema version.
/// Never fails: existing files are used as they are.
pub fn check_schema_version(conn: &Connection) {
    let stored: std::result::Result<Option<String>, rusqlite::Error> = conn
        .query_row(
            "SELECT value FROM Metadata WHERE key = 'schema_version'",
            [],
            |row| row.get(0),
        )
        .optional();

    match stored {
        Ok(Some(v_str)) => match v_str.parse::<u32>() {
            Ok(version) if version == SCHEMA_VERSION => {
                debug!("Database schema version ({}) matches expected version.", version);
            }
            Ok(version) => warn!(
                "Database schema version ({}) differs from expected ({}). Using it as is.",
                version, SCHEMA_VERSION
            ),
            Err(e) => warn!("Unreadable schema version '{}': {}", v_str, e),
        },
        Ok(None) => warn!("Database has no schema version entry."),
        Err(e) => warn!("Database has no schema metadata ({}). Using it as is.", e),
    }
}

// --- Import ---

/// Executes the whole statement batch inside one transaction.
///
/// If any statement fails the transaction is rolled back when `tx` is dropped,
/// so nothing from this batch is committed.
pub fn execute_import(conn: &mut Connection, sql: &str) -> Result<()> {
    let start_time = Instant::now();
    let tx = conn.transaction()?;
    tx.execute_batch(sql)?;
    tx.commit()?;
    info!(
        "Import transaction committed. Took {:.2?}",
        start_time.elapsed()
    );
    Ok(())
}

// --- Query ---

/// Runs one caller-supplied statement and collects every row it returns.
pub fn run_query(conn: &Connection, sql: &str) -> Result<QueryResult> {
    debug!("Executing query: {}", sql);
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    let mut rows = Vec::new();
    let mut cursor = stmt.query([])?;
    while let Some(row) = cursor.next()? {
        let mut cells = Vec::with_capacity(columns.len());
        for (i, name) in columns.iter().enumerate() {
            cells.push((name.clone(), Value::from(row.get_ref(i)?)));
        }
        rows.push(Row::new(cells));
    }
    debug!("Query returned {} row(s)", rows.len());
    Ok(QueryResult { columns, rows })
}

/// Counts the rows of one table.
pub fn count_rows(conn: &Connection, table: &str) -> Result<u64> {
    if !crate::mapper::TABLES.contains(&table) {
        return Err(LmfError::InvalidArgument(format!("unknown table \"{}\"", table)));
    }
    let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
        row.get(0)
    })?;
    Ok(count as u64)
}
