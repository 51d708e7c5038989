//! Schema validation and normalization
//!
//! Runs once at the boundary, before anything else touches the data:
//!
//! 1. duplicate header names are rejected
//! 2. required columns must all be present, or nothing is returned
//! 3. absent optional columns are appended, filled with their default,
//!    and reported as warnings
//!
//! Source columns keep their file order; backfilled columns follow in
//! schema order.

use super::{AssetRecord, AssetTable, RawTable};
use crate::error::ValidationError;
use crate::schema::{self, ColumnSchema, ASSET_SCHEMA};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Non-fatal findings surfaced alongside a validated table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationWarning {
    /// An optional column was missing and has been filled with its default
    OptionalColumnAdded { column: String, default: String },
    /// The same asset name appears on more than one row (1-based data rows)
    DuplicateAsset { asset: String, rows: Vec<usize> },
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationWarning::OptionalColumnAdded { column, default } => {
                write!(f, "Optional column '{}' not found. Adding with default value '{}'.", column, default)
            }
            ValidationWarning::DuplicateAsset { asset, rows } => {
                let rows: Vec<String> = rows.iter().map(|r| r.to_string()).collect();
                write!(f, "Asset '{}' appears on rows {}", asset, rows.join(", "))
            }
        }
    }
}

/// A normalized table plus whatever the validator had to say about it
#[derive(Debug, Clone, Serialize)]
pub struct Validated {
    pub table: AssetTable,
    pub warnings: Vec<ValidationWarning>,
}

/// Validate against the built-in asset schema
pub fn validate(raw: RawTable) -> Result<Validated, ValidationError> {
    SchemaValidator::new(&ASSET_SCHEMA).validate(raw)
}

pub struct SchemaValidator<'a> {
    schema: &'a ColumnSchema,
}

impl<'a> SchemaValidator<'a> {
    pub fn new(schema: &'a ColumnSchema) -> Self {
        Self { schema }
    }

    pub fn validate(&self, raw: RawTable) -> Result<Validated, ValidationError> {
        let RawTable { headers, rows } = raw;

        for (i, header) in headers.iter().enumerate() {
            if headers[..i].contains(header) {
                return Err(ValidationError::DuplicateColumn { column: header.clone() });
            }
        }

        let missing: Vec<String> = self
            .schema
            .required
            .iter()
            .filter(|col| !headers.iter().any(|h| h == *col))
            .map(|col| col.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ValidationError::MissingRequiredColumns { missing });
        }

        let backfill: Vec<_> = self
            .schema
            .optional
            .iter()
            .filter(|opt| !headers.iter().any(|h| h == opt.name))
            .collect();

        let mut warnings = Vec::with_capacity(backfill.len());
        for opt in &backfill {
            log::warn!("Optional column '{}' not found, filling with '{}'", opt.name, opt.default);
            warnings.push(ValidationWarning::OptionalColumnAdded {
                column: opt.name.to_string(),
                default: opt.default.to_string(),
            });
        }

        let records: Vec<AssetRecord> = rows
            .into_iter()
            .map(|row| {
                let mut record: AssetRecord = headers.iter().cloned().zip(row).collect();
                for opt in &backfill {
                    record.insert(opt.name, opt.default);
                }
                record
            })
            .collect();

        let mut columns = headers;
        columns.extend(backfill.iter().map(|opt| opt.name.to_string()));

        warnings.extend(duplicate_assets(&records));

        log::debug!(
            "Validated {} records against {} ({} columns)",
            records.len(),
            self.schema,
            columns.len()
        );

        Ok(Validated {
            table: AssetTable::from_parts(columns, records),
            warnings,
        })
    }
}

/// Repeated asset names are allowed, but worth pointing out
fn duplicate_assets(records: &[AssetRecord]) -> Vec<ValidationWarning> {
    let mut seen: HashMap<&str, Vec<usize>> = HashMap::new();
    let mut order = Vec::new();

    for (i, record) in records.iter().enumerate() {
        let Some(asset) = record.get(schema::ASSET) else { continue };
        let rows = seen.entry(asset).or_insert_with(|| {
            order.push(asset);
            Vec::new()
        });
        rows.push(i + 1);
    }

    order
        .into_iter()
        .filter_map(|asset| {
            let rows = &seen[asset];
            if rows.len() < 2 {
                return None;
            }
            log::warn!("Asset '{}' appears {} times", asset, rows.len());
            Some(ValidationWarning::DuplicateAsset {
                asset: asset.to_string(),
                rows: rows.clone(),
            })
        })
        .collect()
}
