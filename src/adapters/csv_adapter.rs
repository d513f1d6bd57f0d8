//! CSV file data adapter.
//!
//! One file per instrument and granularity: `<base>/<CODE>_<day|hour>.csv`
//! with header `timestamp,open,high,low,close,volume`.

use crate::domain::error::LadderError;
use crate::domain::price_bar::{Granularity, PriceBar};
use crate::ports::data_port::DataPort;
use chrono::{NaiveDate, NaiveDateTime};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, code: &str, granularity: Granularity) -> PathBuf {
        self.base_path.join(format!("{}_{}.csv", code, granularity))
    }
}

fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, LadderError> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map(|d| d.and_time(chrono::NaiveTime::MIN))
        })
        .map_err(|e| LadderError::DataSource {
            reason: format!("invalid timestamp '{}': {}", raw, e),
        })
}

fn parse_field(record: &csv::StringRecord, index: usize, name: &str) -> Result<f64, LadderError> {
    record
        .get(index)
        .ok_or_else(|| LadderError::DataSource {
            reason: format!("missing {} column", name),
        })?
        .trim()
        .parse()
        .map_err(|e| LadderError::DataSource {
            reason: format!("invalid {} value: {}", name, e),
        })
}

impl DataPort for CsvAdapter {
    fn fetch_bars(&self, code: &str, granularity: Granularity) -> Result<Vec<PriceBar>, LadderError> {
        let path = self.csv_path(code, granularity);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(LadderError::NoData {
                    code: code.to_string(),
                });
            }
            Err(e) => {
                return Err(LadderError::DataSource {
                    reason: format!("failed to read {}: {}", path.display(), e),
                });
            }
        };

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| LadderError::DataSource {
                reason: format!("CSV parse error in {}: {}", path.display(), e),
            })?;

            let timestamp = parse_timestamp(record.get(0).ok_or_else(|| {
                LadderError::DataSource {
                    reason: "missing timestamp column".into(),
                }
            })?)?;

            bars.push(PriceBar {
                timestamp,
                open: parse_field(&record, 1, "open")?,
                high: parse_field(&record, 2, "high")?,
                low: parse_field(&record, 3, "low")?,
                close: parse_field(&record, 4, "close")?,
                volume: parse_field(&record, 5, "volume")?,
            });
        }

        // Later rows win on duplicate timestamps.
        bars.reverse();
        bars.sort_by_key(|b| b.timestamp);
        bars.dedup_by_key(|b| b.timestamp);
        Ok(bars)
    }

    fn list_symbols(&self, granularity: Granularity) -> Result<Vec<String>, LadderError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| LadderError::DataSource {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let suffix = format!("_{}.csv", granularity);
        let mut symbols = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|e| LadderError::DataSource {
                reason: format!("directory entry error: {}", e),
            })?;

            let name = entry.file_name();
            let name_str = name.to_string_lossy();

            if let Some(code) = name_str.strip_suffix(&suffix) {
                symbols.push(code.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}
