//! CSV directory bar source: one `<instrument>.csv` file per instrument.
//!
//! Headers are matched case-insensitively. The time column may be named
//! `timestamp`, `datetime` or `date`; `volume` is optional. Rows with an
//! empty or `null` price are dropped, as exported by most chart tools.

use crate::domain::bar::{parse_timestamp, Bar};
use crate::domain::error::SwingError;
use crate::ports::bar_source::{keep_last, BarSource, Interval};
use std::fs;
use std::path::PathBuf;

pub struct CsvBarSource {
    base_path: PathBuf,
}

struct Columns {
    time: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: Option<usize>,
}

impl CsvBarSource {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, instrument: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", instrument))
    }

    /// Instruments with a file in the directory, sorted.
    pub fn list_instruments(&self) -> Result<Vec<String>, SwingError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| SwingError::Database {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut instruments = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| SwingError::Database {
                reason: format!("directory entry error: {}", e),
            })?;
            let name = entry.file_name();
            if let Some(stem) = name.to_string_lossy().strip_suffix(".csv") {
                instruments.push(stem.to_string());
            }
        }
        instruments.sort();
        Ok(instruments)
    }
}

fn locate_columns(headers: &csv::StringRecord) -> Result<Columns, String> {
    let find = |names: &[&str]| {
        headers
            .iter()
            .position(|h| names.contains(&h.trim().to_lowercase().as_str()))
    };
    let require = |names: &[&str]| find(names).ok_or_else(|| format!("missing {} column", names[0]));

    Ok(Columns {
        time: require(&["timestamp", "datetime", "date"])?,
        open: require(&["open"])?,
        high: require(&["high"])?,
        low: require(&["low"])?,
        close: require(&["close"])?,
        volume: find(&["volume"]),
    })
}

/// `Ok(None)` for a blank or null cell.
fn cell(record: &csv::StringRecord, index: usize, name: &str) -> Result<Option<f64>, String> {
    let raw = record.get(index).unwrap_or("").trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("null") || raw.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    raw.parse::<f64>()
        .map(Some)
        .map_err(|e| format!("invalid {} value '{}': {}", name, raw, e))
}

impl BarSource for CsvBarSource {
    fn fetch(
        &self,
        instrument: &str,
        _interval: Interval,
        lookback: usize,
    ) -> Result<Vec<Bar>, SwingError> {
        let fail = |reason: String| SwingError::Fetch {
            instrument: instrument.to_string(),
            reason,
        };

        let path = self.csv_path(instrument);
        let content = fs::read_to_string(&path)
            .map_err(|e| fail(format!("failed to read {}: {}", path.display(), e)))?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| fail(format!("CSV header error: {}", e)))?
            .clone();
        let cols = locate_columns(&headers).map_err(fail)?;

        let mut bars = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| fail(format!("CSV parse error: {}", e)))?;

            let time_str = record.get(cols.time).unwrap_or("");
            let timestamp = parse_timestamp(time_str)
                .ok_or_else(|| fail(format!("invalid timestamp '{}'", time_str)))?;

            let prices = (
                cell(&record, cols.open, "open").map_err(fail)?,
                cell(&record, cols.high, "high").map_err(fail)?,
                cell(&record, cols.low, "low").map_err(fail)?,
                cell(&record, cols.close, "close").map_err(fail)?,
            );
            let (Some(open), Some(high), Some(low), Some(close)) = prices else {
                continue;
            };
            let volume = match cols.volume {
                Some(i) => cell(&record, i, "volume").map_err(fail)?.unwrap_or(0.0),
                None => 0.0,
            };

            bars.push(Bar {
                timestamp,
                open,
                high,
                low,
                close,
                volume,
            });
        }

        bars.sort_by_key(|b| b.timestamp);
        bars.dedup_by_key(|b| b.timestamp);
        Ok(keep_last(bars, lookback))
    }
}
