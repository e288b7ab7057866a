//! Seed data source and simulated remote mirror.

use crate::error::RemoteError;
use crate::record::Record;
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};

/// Somewhere records can be fetched from and pushed to.
///
/// Failures are returned to the caller here; the [`Store`](crate::Store) and
/// [`Catalog`](crate::Catalog) treat them as non-fatal and only log them.
pub trait RemoteSource {
    /// Fetch the full record list.
    fn fetch_records(&self) -> Result<Vec<Record>, RemoteError>;

    /// Push the full record list. Returns the number of records accepted.
    fn save_records(&self, records: &[Record]) -> Result<usize, RemoteError>;
}

/// A static JSON asset holding an array of records.
///
/// Fetching reads and parses the file. Saving is simulated: it is logged and
/// reports every record as accepted, without touching the asset.
#[derive(Debug, Clone)]
pub struct StaticAsset {
    path: PathBuf,
}

impl StaticAsset {
    pub fn new(path: impl AsRef<Path>) -> Self {
        StaticAsset {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RemoteSource for StaticAsset {
    fn fetch_records(&self) -> Result<Vec<Record>, RemoteError> {
        let contents = fs::read_to_string(&self.path).map_err(|source| RemoteError::Read {
            path: self.path.clone(),
            source,
        })?;
        let records: Vec<Record> =
            serde_json::from_str(&contents).map_err(|source| RemoteError::Parse {
                path: self.path.clone(),
                source,
            })?;
        info!(
            "paddock: fetched {} records from {}",
            records.len(),
            self.path.display()
        );
        Ok(records)
    }

    fn save_records(&self, records: &[Record]) -> Result<usize, RemoteError> {
        debug!("paddock: simulated remote save of {} records", records.len());
        Ok(records.len())
    }
}

/// An in-memory source, handy as seed data in tests and demos.
#[derive(Debug, Clone, Default)]
pub struct StaticRecords(pub Vec<Record>);

impl RemoteSource for StaticRecords {
    fn fetch_records(&self) -> Result<Vec<Record>, RemoteError> {
        Ok(self.0.clone())
    }

    fn save_records(&self, records: &[Record]) -> Result<usize, RemoteError> {
        Ok(records.len())
    }
}
