use crate::{Result, Storage, StorageError, ValueEntry};
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use vitals_common::metric::{Metric, MetricKind};

/// Transactional relational backend: one row per metric id+kind with
/// nullable gauge/counter columns. Every mutation is a
/// read-then-insert-or-update inside an explicit transaction, so concurrent
/// writers for the same id cannot lose updates, and `set_batch` wraps the
/// whole list in a single transaction.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS metrics (
        id      INTEGER PRIMARY KEY,
        type    TEXT NOT NULL,
        name    TEXT NOT NULL,
        counter INTEGER,
        gauge   REAL,
        UNIQUE (name, type)
    );
";

impl SqliteStorage {
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::with_connection(conn)
    }

    /// In-memory database, used by tests.
    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn upsert_gauge(conn: &Connection, name: &str, value: f64) -> Result<()> {
    let existing: Option<f64> = conn
        .prepare_cached("SELECT gauge FROM metrics WHERE name = ?1 AND type = 'gauge'")?
        .query_row([name], |row| row.get(0))
        .optional()?;
    if existing.is_some() {
        conn.prepare_cached("UPDATE metrics SET gauge = ?1 WHERE type = 'gauge' AND name = ?2")?
            .execute(rusqlite::params![value, name])?;
    } else {
        conn.prepare_cached("INSERT INTO metrics (name, type, gauge) VALUES (?1, 'gauge', ?2)")?
            .execute(rusqlite::params![name, value])?;
    }
    Ok(())
}

fn upsert_counter(conn: &Connection, name: &str, delta: i64) -> Result<()> {
    let existing: Option<i64> = conn
        .prepare_cached("SELECT counter FROM metrics WHERE name = ?1 AND type = 'counter'")?
        .query_row([name], |row| row.get(0))
        .optional()?;
    match existing {
        Some(old) => {
            conn.prepare_cached(
                "UPDATE metrics SET counter = ?1 WHERE type = 'counter' AND name = ?2",
            )?
            .execute(rusqlite::params![old + delta, name])?;
        }
        None => {
            conn.prepare_cached(
                "INSERT INTO metrics (name, type, counter) VALUES (?1, 'counter', ?2)",
            )?
            .execute(rusqlite::params![name, delta])?;
        }
    }
    Ok(())
}

fn apply_metric(conn: &Connection, metric: &Metric) -> Result<()> {
    match crate::payload_of(metric)? {
        crate::BatchOp::Gauge(name, value) => upsert_gauge(conn, name, value),
        crate::BatchOp::Counter(name, delta) => upsert_counter(conn, name, delta),
    }
}

impl Storage for SqliteStorage {
    fn set_gauge(&self, name: &str, value: f64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let tx = conn.unchecked_transaction()?;
        upsert_gauge(&tx, name, value)?;
        tx.commit()?;
        Ok(())
    }

    fn set_counter(&self, name: &str, delta: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let tx = conn.unchecked_transaction()?;
        upsert_counter(&tx, name, delta)?;
        tx.commit()?;
        Ok(())
    }

    fn get_gauge(&self, name: &str) -> Result<f64> {
        let conn = self.conn.lock().unwrap();
        let value = conn
            .prepare_cached("SELECT gauge FROM metrics WHERE name = ?1 AND type = 'gauge'")?
            .query_row([name], |row| row.get(0))
            .optional()?
            .ok_or_else(|| StorageError::NotFound {
                kind: MetricKind::Gauge,
                name: name.to_string(),
            });
        value
    }

    fn get_counter(&self, name: &str) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let value = conn
            .prepare_cached("SELECT counter FROM metrics WHERE name = ?1 AND type = 'counter'")?
            .query_row([name], |row| row.get(0))
            .optional()?
            .ok_or_else(|| StorageError::NotFound {
                kind: MetricKind::Counter,
                name: name.to_string(),
            });
        value
    }

    fn get_all(&self) -> Result<Vec<ValueEntry>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare_cached("SELECT name, gauge, counter FROM metrics ORDER BY name")?;
        let rows = stmt.query_map([], |row| {
            let name: String = row.get(0)?;
            let gauge: Option<f64> = row.get(1)?;
            let counter: Option<i64> = row.get(2)?;
            Ok((name, gauge, counter))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (name, gauge, counter) = row?;
            match (gauge, counter) {
                (Some(value), _) => entries.push(ValueEntry::gauge(name, value)),
                (None, Some(total)) => entries.push(ValueEntry::counter(name, total)),
                (None, None) => return Err(StorageError::InvalidRow { name }),
            }
        }
        Ok(entries)
    }

    fn set_batch(&self, metrics: &[Metric]) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let tx = conn.unchecked_transaction()?;
        for metric in metrics {
            // Any failure drops the transaction uncommitted, so a mid-batch
            // error leaves no partial writes visible.
            apply_metric(&tx, metric)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn ping(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }
}
