//! Schema migrations and verification.

use barcache_core::error::StorageError;
use rusqlite::{params, Connection};
use std::path::Path;

/// Built-in migrations, always applied before any from a schema directory.
const BUILTIN: &[(&str, &str)] = &[(
    "0001_bars_cache",
    include_str!("../migrations/0001_bars_cache.sql"),
)];

const REQUIRED_COLUMNS: &[&str] = &[
    "symbol",
    "provider",
    "timeframe",
    "timestamp",
    "open",
    "high",
    "low",
    "close",
    "volume",
    "revision",
    "fetched_at",
];
const PRIMARY_KEY: &[&str] = &["symbol", "provider", "timeframe", "timestamp"];
const RANGE_INDEX: &[&str] = &["symbol", "timeframe", "timestamp"];
const PROVIDER_INDEX: &[&str] = &["symbol", "timeframe", "timestamp", "provider"];

fn ensure_ledger(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
             version    TEXT    PRIMARY KEY,
             applied_at INTEGER NOT NULL
         );",
    )
    .map_err(StorageError::schema)
}

fn is_applied(conn: &Connection, version: &str) -> Result<bool, StorageError> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM schema_migrations WHERE version = ?1)",
        [version],
        |row| row.get(0),
    )
    .map_err(StorageError::schema)
}

fn apply(conn: &mut Connection, version: &str, sql: &str) -> Result<(), StorageError> {
    let tx = conn.transaction().map_err(StorageError::unavailable)?;
    tx.execute_batch(sql)
        .map_err(|e| StorageError::Schema(format!("migration {version} failed: {e}")))?;
    tx.execute(
        "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
        params![version, chrono::Utc::now().timestamp_millis()],
    )
    .map_err(StorageError::schema)?;
    tx.commit().map_err(StorageError::unavailable)
}

fn read_schema_dir(dir: &Path) -> Result<Vec<(String, String)>, StorageError> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| StorageError::Schema(format!("cannot read {}: {e}", dir.display())))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(StorageError::schema)?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("sql") {
            continue;
        }
        let Some(version) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let sql = std::fs::read_to_string(&path)
            .map_err(|e| StorageError::Schema(format!("cannot read {}: {e}", path.display())))?;
        files.push((version.to_string(), sql));
    }

    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}

/// Apply pending migrations, returning the versions applied by this call.
///
/// Each version is applied at most once, tracked in `schema_migrations`.
pub fn run_migrations(
    conn: &mut Connection,
    schema_dir: Option<&Path>,
) -> Result<Vec<String>, StorageError> {
    ensure_ledger(conn)?;

    let mut pending: Vec<(String, String)> = BUILTIN
        .iter()
        .map(|(v, sql)| (v.to_string(), sql.to_string()))
        .collect();
    if let Some(dir) = schema_dir {
        pending.extend(
            read_schema_dir(dir)?
                .into_iter()
                .filter(|(v, _)| !BUILTIN.iter().any(|(b, _)| b == v)),
        );
    }

    let mut applied = Vec::new();
    for (version, sql) in pending {
        if is_applied(conn, &version)? {
            continue;
        }
        apply(conn, &version, &sql)?;
        tracing::info!(version = %version, "applied migration");
        applied.push(version);
    }

    Ok(applied)
}

fn index_columns(conn: &Connection, index: &str) -> Result<Vec<String>, StorageError> {
    let mut stmt = conn
        .prepare("SELECT name FROM pragma_index_info(?1) ORDER BY seqno")
        .map_err(StorageError::schema)?;
    let columns = stmt
        .query_map([index], |row| row.get(0))
        .map_err(StorageError::schema)?
        .collect::<Result<Vec<String>, _>>()
        .map_err(StorageError::schema)?;
    Ok(columns)
}

/// Check that `bars_cache` carries the expected columns, primary key and
/// both secondary indexes.
pub fn verify_schema(conn: &Connection) -> Result<(), StorageError> {
    let mut stmt = conn
        .prepare("SELECT name, pk FROM pragma_table_info('bars_cache')")
        .map_err(StorageError::schema)?;
    let columns = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))
        .map_err(StorageError::schema)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(StorageError::schema)?;

    if columns.is_empty() {
        return Err(StorageError::Schema("table bars_cache is missing".to_string()));
    }

    for required in REQUIRED_COLUMNS {
        if !columns.iter().any(|(name, _)| name == required) {
            return Err(StorageError::Schema(format!(
                "bars_cache is missing column {required}"
            )));
        }
    }

    let mut pk: Vec<(i64, &str)> = columns
        .iter()
        .filter(|(_, pk)| *pk > 0)
        .map(|(name, pk)| (*pk, name.as_str()))
        .collect();
    pk.sort();
    let pk: Vec<&str> = pk.into_iter().map(|(_, name)| name).collect();
    if pk != PRIMARY_KEY {
        return Err(StorageError::Schema(format!(
            "bars_cache primary key is ({}), expected ({})",
            pk.join(", "),
            PRIMARY_KEY.join(", ")
        )));
    }

    let mut stmt = conn
        .prepare("SELECT name FROM pragma_index_list('bars_cache')")
        .map_err(StorageError::schema)?;
    let indexes = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(StorageError::schema)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(StorageError::schema)?;

    let mut shapes = Vec::with_capacity(indexes.len());
    for index in &indexes {
        shapes.push(index_columns(conn, index)?);
    }

    for required in [RANGE_INDEX, PROVIDER_INDEX] {
        if !shapes.iter().any(|cols| cols == required) {
            return Err(StorageError::Schema(format!(
                "bars_cache has no index on ({})",
                required.join(", ")
            )));
        }
    }

    Ok(())
}
