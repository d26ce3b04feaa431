//! Record storage for the directory server.
//!
//! The store is loaded once from a CSV data file at startup and never changes
//! afterwards, so it can be shared between the DNS and HTTP front ends without
//! any locking.

use std::{fs::File, io::Read, path::Path};

use log::info;

use crate::errors::ServerError;
use crate::utils::sanitize_url;

/// Number of fields in a data row: id, name, url, description, dosage.
const FIELDS_PER_ROW: usize = 5;

/// A directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Numeric id, `0` when unassigned.
    pub id: u32,

    /// Display and lookup name.
    pub full_name: String,

    /// Sanitized redirect target.
    pub target_url: String,

    /// Free text exposed through TXT answers.
    pub description: String,

    /// Free text carried along, never used for lookups.
    pub dosage: String,

    /// Lower-cased `full_name`, compared against textual queries.
    match_name: String,
}

impl Record {
    /// Create a record. `target_url` is expected to be sanitized already.
    pub fn new(
        id: u32,
        full_name: impl Into<String>,
        target_url: impl Into<String>,
        description: impl Into<String>,
        dosage: impl Into<String>,
    ) -> Self {
        let full_name = full_name.into();
        Self {
            id,
            match_name: full_name.to_lowercase(),
            full_name,
            target_url: target_url.into(),
            description: description.into(),
            dosage: dosage.into(),
        }
    }

    /// The lower-cased name used for substring matching.
    pub fn match_name(&self) -> &str {
        &self.match_name
    }

    /// Whether the record carries a real id.
    pub fn has_id(&self) -> bool {
        self.id != 0
    }

    /// The id based alias labels, in answer order: `42`, `e42`, `e-42`.
    pub fn id_aliases(&self) -> [String; 3] {
        [
            self.id.to_string(),
            format!("e{}", self.id),
            format!("e-{}", self.id),
        ]
    }
}

/// The ordered, read-only set of records.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    records: Vec<Record>,
}

impl RecordStore {
    /// Build a store ordered ascending by id.
    ///
    /// The sort is stable: records sharing an id keep their input order.
    pub fn from_records(records: impl IntoIterator<Item = Record>) -> Self {
        let mut records: Vec<Record> = records.into_iter().collect();
        records.sort_by_key(|record| record.id);
        Self { records }
    }

    /// Load the store from a CSV data file.
    ///
    /// # Arguments
    /// * `path` - Path to the data file.
    /// * `url_prefix` - Prefix handed to the URL sanitizer.
    ///
    /// # Returns
    /// A `Result` containing the store, or the first error met while reading.
    pub fn load_csv(path: impl AsRef<Path>, url_prefix: &str) -> Result<Self, ServerError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let store = Self::from_reader(file, url_prefix)?;
        info!("Loaded {} records from {}", store.len(), path.display());
        Ok(store)
    }

    /// Read records from any CSV source without a header row.
    pub fn from_reader<R: Read>(reader: R, url_prefix: &str) -> Result<Self, ServerError> {
        let mut csv = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(reader);

        let mut records = Vec::new();
        for row in csv.records() {
            let row = row?;
            if row.len() < FIELDS_PER_ROW {
                return Err(ServerError::Record {
                    line: row.position().map_or(0, |p| p.line()),
                    reason: format!("expected {} fields, got {}", FIELDS_PER_ROW, row.len()),
                });
            }

            records.push(Record::new(
                row[0].parse().unwrap_or(0),
                &row[1],
                sanitize_url(&row[2], url_prefix),
                &row[3],
                &row[4],
            ));
        }

        Ok(Self::from_records(records))
    }

    /// Iterate over the records in store order.
    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    /// Number of records in the store.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
