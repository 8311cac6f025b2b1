//! SQLite bar source.
//!
//! Bars live in a single `bars` table keyed by instrument, interval and
//! timestamp. Timestamps are stored as `%Y-%m-%d %H:%M:%S` text so they
//! sort lexically.

use crate::domain::bar::{parse_timestamp, Bar};
use crate::domain::error::SwingError;
use crate::ports::bar_source::{keep_last, BarSource, Interval};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use std::path::Path;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct SqliteBarSource {
    pool: Pool<SqliteConnectionManager>,
}

fn pool_error(e: r2d2::Error) -> SwingError {
    SwingError::Database {
        reason: e.to_string(),
    }
}

fn query_error(e: rusqlite::Error) -> SwingError {
    SwingError::Database {
        reason: e.to_string(),
    }
}

impl SqliteBarSource {
    pub fn from_path<P: AsRef<Path>>(path: P, pool_size: u32) -> Result<Self, SwingError> {
        let manager = SqliteConnectionManager::file(path.as_ref());
        let pool = Pool::builder()
            .max_size(pool_size.max(1))
            .build(manager)
            .map_err(pool_error)?;

        let source = Self { pool };
        source.initialize_schema()?;
        Ok(source)
    }

    #[cfg(test)]
    pub fn in_memory() -> Result<Self, SwingError> {
        let manager = SqliteConnectionManager::memory();
        // one connection: every pooled in-memory connection is its own database
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(pool_error)?;

        Ok(Self { pool })
    }

    pub fn initialize_schema(&self) -> Result<(), SwingError> {
        let conn = self.pool.get().map_err(pool_error)?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS bars (
                instrument TEXT NOT NULL,
                interval TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                open REAL NOT NULL,
                high REAL NOT NULL,
                low REAL NOT NULL,
                close REAL NOT NULL,
                volume REAL NOT NULL DEFAULT 0,
                PRIMARY KEY (instrument, interval, timestamp)
            );
            CREATE INDEX IF NOT EXISTS idx_bars_instrument ON bars(instrument, interval);",
        )
        .map_err(query_error)?;

        Ok(())
    }

    /// Upserts `bars` for one instrument in a single transaction.
    pub fn insert_bars(
        &self,
        instrument: &str,
        interval: Interval,
        bars: &[Bar],
    ) -> Result<usize, SwingError> {
        let mut conn = self.pool.get().map_err(pool_error)?;
        let tx = conn.transaction().map_err(query_error)?;

        for bar in bars {
            tx.execute(
                "INSERT OR REPLACE INTO bars (instrument, interval, timestamp, open, high, low, close, volume)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    instrument,
                    interval.as_str(),
                    bar.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close,
                    bar.volume
                ],
            )
            .map_err(query_error)?;
        }

        tx.commit().map_err(query_error)?;
        Ok(bars.len())
    }

    pub fn list_instruments(&self, interval: Interval) -> Result<Vec<String>, SwingError> {
        let conn = self.pool.get().map_err(pool_error)?;
        let mut stmt = conn
            .prepare("SELECT DISTINCT instrument FROM bars WHERE interval = ?1 ORDER BY instrument")
            .map_err(query_error)?;

        let rows = stmt
            .query_map(params![interval.as_str()], |row| row.get(0))
            .map_err(query_error)?;

        let mut instruments = Vec::new();
        for row in rows {
            instruments.push(row.map_err(query_error)?);
        }
        Ok(instruments)
    }
}

impl BarSource for SqliteBarSource {
    fn fetch(
        &self,
        instrument: &str,
        interval: Interval,
        lookback: usize,
    ) -> Result<Vec<Bar>, SwingError> {
        let conn = self.pool.get().map_err(pool_error)?;

        let query = "SELECT timestamp, open, high, low, close, volume
                     FROM bars
                     WHERE instrument = ?1 AND interval = ?2
                     ORDER BY timestamp ASC";

        let mut stmt = conn.prepare(query).map_err(query_error)?;

        let rows = stmt
            .query_map(params![instrument, interval.as_str()], |row| {
                let ts: String = row.get(0)?;
                let timestamp = parse_timestamp(&ts).ok_or_else(|| {
                    rusqlite::Error::FromSqlConversionFailure(
                        ts.len(),
                        rusqlite::types::Type::Text,
                        format!("invalid timestamp '{}'", ts).into(),
                    )
                })?;
                Ok(Bar {
                    timestamp,
                    open: row.get(1)?,
                    high: row.get(2)?,
                    low: row.get(3)?,
                    close: row.get(4)?,
                    volume: row.get(5)?,
                })
            })
            .map_err(query_error)?;

        let mut bars = Vec::new();
        for row in rows {
            bars.push(row.map_err(|e| SwingError::Fetch {
                instrument: instrument.to_string(),
                reason: e.to_string(),
            })?);
        }

        if bars.is_empty() {
            return Err(SwingError::Fetch {
                instrument: instrument.to_string(),
                reason: format!("no {} bars stored", interval),
            });
        }

        Ok(keep_last(bars, lookback))
    }
}
