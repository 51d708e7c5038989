//! Joining results onto tables, and counting things for charts
//!
//! Both operations return new values; the input table is never touched.

use crate::assess::AssessmentResult;
use crate::error::{Error, Result};
use crate::inventory::{AssetRecord, AssetTable};
use crate::schema::ASSESSMENT_COLUMN;
use serde::Serialize;

/// A validated table with one assessment per record, paired by position
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AugmentedTable {
    table: AssetTable,
    results: Vec<AssessmentResult>,
}

impl AugmentedTable {
    pub fn table(&self) -> &AssetTable {
        &self.table
    }

    pub fn results(&self) -> &[AssessmentResult] {
        &self.results
    }

    /// Source columns followed by the assessment column
    pub fn columns(&self) -> Vec<&str> {
        self.table
            .columns()
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(ASSESSMENT_COLUMN))
            .collect()
    }

    pub fn rows(&self) -> impl Iterator<Item = (&AssetRecord, &AssessmentResult)> {
        self.table.records().iter().zip(self.results.iter())
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| !r.is_success()).count()
    }
}

/// Pair result `i` with record `i`.
///
/// The counts must match exactly; anything else means the pipeline lost or
/// invented a result. A table that already carries an assessment column (a
/// re-uploaded export) has it replaced by the new results.
pub fn attach_results(table: &AssetTable, results: Vec<AssessmentResult>) -> Result<AugmentedTable> {
    if results.len() != table.len() {
        return Err(Error::LengthMismatch {
            records: table.len(),
            results: results.len(),
        });
    }
    let table = if table.has_column(ASSESSMENT_COLUMN) {
        log::info!("Replacing existing '{}' column", ASSESSMENT_COLUMN);
        table.without_column(ASSESSMENT_COLUMN)
    } else {
        table.clone()
    };
    Ok(AugmentedTable { table, results })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bucket {
    pub value: String,
    pub count: usize,
}

/// Occurrences of each distinct value in one column.
///
/// Ordered by count, highest first; ties keep first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SummaryDistribution {
    pub column: String,
    pub buckets: Vec<Bucket>,
}

impl SummaryDistribution {
    pub fn get(&self, value: &str) -> Option<usize> {
        self.buckets.iter().find(|b| b.value == value).map(|b| b.count)
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Sum of all counts (non-blank cells)
    pub fn total(&self) -> usize {
        self.buckets.iter().map(|b| b.count).sum()
    }
}

/// Count values in `column`. Blank cells count as null and are skipped; an
/// unknown column gives an empty distribution.
pub fn summarize(table: &AssetTable, column: &str) -> SummaryDistribution {
    let mut buckets: Vec<Bucket> = Vec::new();

    if table.has_column(column) {
        for value in table.column_values(column) {
            if value.trim().is_empty() {
                continue;
            }
            match buckets.iter_mut().find(|b| b.value == value) {
                Some(bucket) => bucket.count += 1,
                None => buckets.push(Bucket { value: value.to_string(), count: 1 }),
            }
        }
    }

    // Stable sort keeps first-seen order among equal counts
    buckets.sort_by(|a, b| b.count.cmp(&a.count));

    SummaryDistribution {
        column: column.to_string(),
        buckets,
    }
}
