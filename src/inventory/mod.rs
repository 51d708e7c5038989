//! Asset inventory tables
//!
//! A CSV inventory moves through two shapes:
//!
//! - [`RawTable`]: header + rows exactly as parsed, no contract applied
//! - [`AssetTable`]: the validated, normalized table produced by
//!   [`validate::validate`]. Every record carries every column.

pub mod validate;

use crate::error::{Result, ValidationError};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// A delimited-text table before validation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    /// Column names from the header row, in file order
    pub headers: Vec<String>,
    /// One entry per data row, one cell per header
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Parse comma-separated text with a header row.
    ///
    /// Rows with a different number of cells than the header are rejected.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(reader);

        let headers = rdr.headers()?.iter().map(String::from).collect();
        let mut rows = Vec::new();
        for record in rdr.records() {
            rows.push(record?.iter().map(String::from).collect());
        }

        Ok(Self { headers, rows })
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }
}

/// One inventory row: ordered `(column, value)` pairs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetRecord {
    fields: Vec<(String, String)>,
}

impl AssetRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    /// Set a field, replacing any existing value for the column
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        let column = column.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(name, _)| *name == column) {
            Some(field) => field.1 = value,
            None => self.fields.push((column, value)),
        }
    }

    pub fn remove(&mut self, column: &str) -> Option<String> {
        let idx = self.fields.iter().position(|(name, _)| name == column)?;
        Some(self.fields.remove(idx).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AssetRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = AssetRecord::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

// Records travel to the browser as JSON objects; keep column order intact
impl Serialize for AssetRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for AssetRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct RecordVisitor;

        impl<'de> Visitor<'de> for RecordVisitor {
            type Value = AssetRecord;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of column names to text values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<AssetRecord, A::Error> {
                let mut record = AssetRecord::new();
                while let Some((k, v)) = access.next_entry::<String, String>()? {
                    record.insert(k, v);
                }
                Ok(record)
            }
        }

        deserializer.deserialize_map(RecordVisitor)
    }
}

/// An ordered set of records sharing one column list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetTable {
    columns: Vec<String>,
    records: Vec<AssetRecord>,
}

impl AssetTable {
    /// Assemble a table without checking it; see [`AssetTable::check_shape`]
    pub fn from_parts(columns: Vec<String>, records: Vec<AssetRecord>) -> Self {
        Self { columns, records }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[AssetRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// A copy of the table with `column` dropped from the header and every record
    pub fn without_column(&self, column: &str) -> Self {
        let columns = self.columns.iter().filter(|c| *c != column).cloned().collect();
        let records = self
            .records
            .iter()
            .map(|r| {
                let mut r = r.clone();
                r.remove(column);
                r
            })
            .collect();
        Self { columns, records }
    }

    /// Values of one column, in record order. Records lacking it are skipped.
    pub fn column_values<'a>(&'a self, column: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.records.iter().filter_map(move |r| r.get(column))
    }

    /// Verify every record carries exactly the columns the table declares.
    ///
    /// Tables built by the validator always pass; tables that arrive over
    /// the API are checked before use.
    pub fn check_shape(&self) -> std::result::Result<(), ValidationError> {
        for (i, col) in self.columns.iter().enumerate() {
            if self.columns[..i].contains(col) {
                return Err(ValidationError::DuplicateColumn { column: col.clone() });
            }
        }
        for record in &self.records {
            if let Some(missing) = self.columns.iter().find(|c| record.get(c).is_none()) {
                return Err(ValidationError::MissingField { field: missing.clone() });
            }
            if record.len() != self.columns.len() {
                if let Some(extra) = record.columns().find(|c| !self.has_column(c)) {
                    return Err(ValidationError::UnexpectedField { field: extra.to_string() });
                }
            }
        }
        Ok(())
    }
}
