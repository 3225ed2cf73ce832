pub mod error;
pub mod migrations;
pub mod models;
pub mod operations;
pub mod queries;

pub use error::{DbError, ErrorCategory};
pub use queries::Balloon;

use rusqlite::{Connection, Params, Transaction};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

pub type Result<T> = std::result::Result<T, DbError>;

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        migrations::run(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        migrations::run(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DbError::LockPoisoned)
    }

    /// Connection mode: the connection is held for the duration of `f` and
    /// released on every exit path.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Transaction mode: commits iff `f` returns `Ok`, otherwise rolls back.
    /// The transaction handle cannot outlive the closure.
    pub fn with_tx<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        match f(&tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(e) => {
                warn!("Rolling back transaction: {}", e);
                if let Err(rb) = tx.rollback() {
                    warn!("Rollback failed: {}", rb);
                }
                Err(e)
            }
        }
    }
}

/// Run one write statement and verify it touched exactly `expected` rows.
/// Works on a plain connection or, through deref, on a transaction.
pub fn exec<P: Params>(conn: &Connection, sql: &str, params: P, expected: usize) -> Result<usize> {
    let actual = conn.execute(sql, params)?;
    if actual != expected {
        return Err(DbError::RowCount { expected, actual });
    }
    Ok(actual)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(db: &Database) {
        db.with_conn(|conn| {
            conn.execute_batch("CREATE TABLE scratch (v INTEGER NOT NULL UNIQUE);")?;
            Ok(())
        })
        .unwrap();
    }

    fn count(db: &Database) -> i64 {
        db.with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM scratch", [], |r| r.get(0))?))
            .unwrap()
    }

    #[test]
    fn test_exec_checks_affected_rows() {
        let db = Database::open_in_memory().unwrap();
        scratch(&db);

        let err = db
            .with_conn(|conn| exec(conn, "INSERT INTO scratch (v) VALUES (1), (2)", [], 1))
            .unwrap_err();
        assert!(matches!(err, DbError::RowCount { expected: 1, actual: 2 }));
        assert_eq!(err.category(), ErrorCategory::Conflict);
    }

    #[test]
    fn test_transaction_commits_on_ok() {
        let db = Database::open_in_memory().unwrap();
        scratch(&db);

        db.with_tx(|tx| {
            exec(tx, "INSERT INTO scratch (v) VALUES (1)", [], 1)?;
            exec(tx, "INSERT INTO scratch (v) VALUES (2)", [], 1)
        })
        .unwrap();
        assert_eq!(count(&db), 2);
    }

    #[test]
    fn test_transaction_rolls_back_on_err() {
        let db = Database::open_in_memory().unwrap();
        scratch(&db);

        let res = db.with_tx(|tx| {
            exec(tx, "INSERT INTO scratch (v) VALUES (1)", [], 1)?;
            exec(tx, "DELETE FROM scratch WHERE v = 99", [], 1)
        });
        assert!(res.is_err());
        assert_eq!(count(&db), 0);
    }
}
