use std::path::Path;
use std::time::Duration;

use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing;

use super::DatabaseError;

/// How long a writer waits on another writer's lock before SQLite reports BUSY.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SAVEPOINT_NAME: &str = "carelink_op";

/// Open a SQLite connection to the given path and run migrations
pub fn open_database(path: &Path) -> Result<Connection, DatabaseError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| DatabaseError::MigrationFailed {
                version: 0,
                reason: format!("cannot create database directory: {e}"),
            })?;
        }
    }
    let conn = Connection::open(path)?;
    configure_pragmas(&conn)?;
    run_migrations(&conn)?;
    Ok(conn)
}

/// Open an in-memory database (for testing)
pub fn open_memory_database() -> Result<Connection, DatabaseError> {
    let conn = Connection::open_in_memory()?;
    configure_pragmas(&conn)?;
    run_migrations(&conn)?;
    Ok(conn)
}

fn configure_pragmas(conn: &Connection) -> Result<(), DatabaseError> {
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.execute_batch(
        "PRAGMA journal_mode=WAL;
         PRAGMA foreign_keys=ON;"
    )?;
    Ok(())
}

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    let current_version = get_current_version(conn);

    let migrations: Vec<(i64, &str)> = vec![
        (1, include_str!("../../resources/migrations/001_initial.sql")),
        (2, include_str!("../../resources/migrations/002_condition_aliases.sql")),
    ];

    for (version, sql) in migrations {
        if version > current_version {
            tracing::info!("Running migration v{version}");
            conn.execute_batch(sql).map_err(|e| DatabaseError::MigrationFailed {
                version,
                reason: e.to_string(),
            })?;
        }
    }

    Ok(())
}

/// Get the current schema version (0 if no schema exists yet)
fn get_current_version(conn: &Connection) -> i64 {
    conn.query_row(
        "SELECT MAX(version) FROM schema_version",
        [],
        |row| row.get::<_, i64>(0),
    )
    .unwrap_or(0)
}

/// Count tables in the database (for verification)
pub fn count_tables(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(count)
}

/// Run `op` as one all-or-nothing unit.
///
/// On a connection in autocommit mode this opens a `BEGIN IMMEDIATE`
/// transaction, so the write lock is taken before the first read and two
/// writers can never interleave a check-then-act sequence. When the caller is
/// already inside a transaction the work runs under a SAVEPOINT instead, which
/// lets composed operations (intake → resolve identity → assign role) nest.
/// Any `Err` from `op` rolls back everything `op` wrote.
pub fn with_transaction<T, E, F>(conn: &Connection, op: F) -> Result<T, E>
where
    E: From<DatabaseError>,
    F: FnOnce(&Connection) -> Result<T, E>,
{
    if conn.is_autocommit() {
        let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)
            .map_err(DatabaseError::from)?;
        let value = op(&*tx)?;
        tx.commit().map_err(DatabaseError::from)?;
        Ok(value)
    } else {
        conn.execute_batch(&format!("SAVEPOINT {SAVEPOINT_NAME}"))
            .map_err(DatabaseError::from)?;
        match op(conn) {
            Ok(value) => {
                conn.execute_batch(&format!("RELEASE {SAVEPOINT_NAME}"))
                    .map_err(DatabaseError::from)?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = conn.execute_batch(&format!(
                    "ROLLBACK TO {SAVEPOINT_NAME}; RELEASE {SAVEPOINT_NAME}"
                )) {
                    tracing::warn!(error = %rollback_err, "Savepoint rollback failed");
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_initializes_all_tables() {
        let conn = open_memory_database().unwrap();
        // 13 entity/lookup tables + schema_version + condition_aliases = 15
        let count = count_tables(&conn).unwrap();
        assert_eq!(count, 15, "Expected 15 tables, got {count}");
    }

    #[test]
    fn schema_version_is_current() {
        let conn = open_memory_database().unwrap();
        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, 2);
    }

    #[test]
    fn migration_idempotent() {
        let conn = open_memory_database().unwrap();
        // Running migrations again is a no-op
        let result = run_migrations(&conn);
        assert!(result.is_ok());
    }

    #[test]
    fn foreign_keys_enabled() {
        let conn = open_memory_database().unwrap();
        let fk: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }

    #[test]
    fn file_database_creates_parent_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("carelink.db");
        let conn = open_database(&path).unwrap();
        assert!(path.exists());
        assert_eq!(count_tables(&conn).unwrap(), 15);
    }

    fn count_hospitals(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM hospitals", [], |row| row.get(0))
            .unwrap()
    }

    fn insert_hospital(conn: &Connection, id: &str) -> Result<(), DatabaseError> {
        conn.execute(
            "INSERT INTO hospitals (id, name, created_at, updated_at)
             VALUES (?1, 'General', '2024-01-01', '2024-01-01')",
            [id],
        )?;
        Ok(())
    }

    #[test]
    fn transaction_commits_on_success() {
        let conn = open_memory_database().unwrap();
        with_transaction(&conn, |tx| insert_hospital(tx, "h1")).unwrap();
        assert_eq!(count_hospitals(&conn), 1);
        assert!(conn.is_autocommit());
    }

    #[test]
    fn transaction_rolls_back_on_error() {
        let conn = open_memory_database().unwrap();
        let result: Result<(), DatabaseError> = with_transaction(&conn, |tx| {
            insert_hospital(tx, "h1")?;
            Err(DatabaseError::ConstraintViolation("abort".into()))
        });
        assert!(result.is_err());
        assert_eq!(count_hospitals(&conn), 0);
        assert!(conn.is_autocommit());
    }

    #[test]
    fn nested_failure_rolls_back_only_inner_work() {
        let conn = open_memory_database().unwrap();
        with_transaction(&conn, |tx| {
            insert_hospital(tx, "outer")?;
            let inner: Result<(), DatabaseError> = with_transaction(tx, |inner_tx| {
                insert_hospital(inner_tx, "inner")?;
                Err(DatabaseError::ConstraintViolation("abort inner".into()))
            });
            assert!(inner.is_err());
            Ok::<_, DatabaseError>(())
        })
        .unwrap();
        assert_eq!(count_hospitals(&conn), 1);
    }

    #[test]
    fn unique_violation_is_detected() {
        let conn = open_memory_database().unwrap();
        insert_hospital(&conn, "dup").unwrap();
        let err = insert_hospital(&conn, "dup").unwrap_err();
        assert!(err.is_unique_violation());
        assert!(!err.is_integrity_violation());
    }
}
