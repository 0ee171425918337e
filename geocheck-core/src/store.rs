use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use crate::records::{AddressRecord, QueryRecord, ADDRESS_FIELDS};

const FULL_DATA_FILE: &str = "full_data.csv";
const QUERIES_FILE: &str = "queries.csv";
const LANDMARKS_FILE: &str = "landmarks.csv";

/// A record kind that lives in its own table with a fixed header
pub trait StoredRecord: Serialize + DeserializeOwned {
    /// Column names, in order
    fn header() -> Vec<&'static str>;

    /// Invariant check applied to every replayed row
    fn check(&self) -> Result<()>;
}

impl StoredRecord for AddressRecord {
    fn header() -> Vec<&'static str> {
        let mut header = ADDRESS_FIELDS.to_vec();
        header.extend(["lat", "lon"]);
        header
    }

    fn check(&self) -> Result<()> {
        self.validate()
    }
}

impl StoredRecord for QueryRecord {
    fn header() -> Vec<&'static str> {
        vec!["name", "lat", "lon"]
    }

    fn check(&self) -> Result<()> {
        self.validate()
    }
}

/// Directory holding the three record tables of a verification session
#[derive(Debug, Clone)]
pub struct RecordStore {
    root: PathBuf,
}

impl RecordStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Structured address fixtures (10 columns)
    pub fn full_data_path(&self) -> PathBuf {
        self.root.join(FULL_DATA_FILE)
    }

    /// Curated free-text queries (3 columns)
    pub fn queries_path(&self) -> PathBuf {
        self.root.join(QUERIES_FILE)
    }

    /// Scraped landmarks (3 columns)
    pub fn landmarks_path(&self) -> PathBuf {
        self.root.join(LANDMARKS_FILE)
    }
}

/// Write a table: header row first, then one row per record.
/// The header is written even when `records` is empty.
pub fn write_records<T: StoredRecord>(path: &Path, records: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("Failed to create record store {}", path.display()))?;

    writer.write_record(T::header())?;
    for record in records {
        writer
            .serialize(record)
            .with_context(|| format!("Failed to write record to {}", path.display()))?;
    }
    writer.flush()?;

    log::debug!("Wrote {} records to {}", records.len(), path.display());
    Ok(())
}

/// Lazy, store-ordered replay of one table.
/// Not restartable: open the table again to start over.
pub struct RecordReplay<T> {
    rows: csv::DeserializeRecordsIntoIter<File, T>,
    path: PathBuf,
}

impl<T: StoredRecord> RecordReplay<T> {
    pub fn open(path: &Path) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(path)
            .with_context(|| format!("Failed to open record store {}", path.display()))?;

        let found: Vec<String> = reader
            .headers()
            .with_context(|| format!("Failed to read header of {}", path.display()))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let expected = T::header();
        if found != expected {
            anyhow::bail!(
                "Unexpected header in {}: expected {:?}, found {:?}",
                path.display(),
                expected,
                found
            );
        }

        Ok(Self {
            rows: reader.into_deserialize(),
            path: path.to_path_buf(),
        })
    }
}

impl<T: StoredRecord> Iterator for RecordReplay<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.rows.next()?;
        let path = &self.path;
        Some(
            row.with_context(|| format!("Malformed row in {}", path.display()))
                .and_then(|record: T| {
                    record
                        .check()
                        .with_context(|| format!("Invalid record in {}", path.display()))?;
                    Ok(record)
                }),
        )
    }
}
