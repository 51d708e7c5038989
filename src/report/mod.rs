//! Report generation for assessed inventories
//!
//! - **CSV**: the validated inventory plus the `AI Risk Assessment` column
//!   (the downloadable artifact)
//! - **JSON**: summary, distributions and every record, for scripts
//! - **HTML**: self-contained page with risk/category charts, per-asset
//!   detail and the raw table
//!
//! # Usage
//!
//! ```ignore
//! use airisk::report;
//!
//! report::generate("results.html", &augmented)?;  // HTML
//! report::generate("results.json", &augmented)?;  // JSON
//! report::generate("results.csv", &augmented)?;   // CSV
//! ```

pub mod csv;
pub mod html;
pub mod json;

use crate::aggregate::{summarize, AugmentedTable, SummaryDistribution};
use crate::assess::AssessmentResult;
use crate::error::Result;
use crate::inventory::AssetRecord;
use crate::schema::{ASSET_CATEGORY, ASSET_SCHEMA, LEVEL_OF_RISK};
use serde::Serialize;
use std::path::Path;

/// File name offered for downloads
pub const DOWNLOAD_FILE_NAME: &str = "ai_risk_assessment_results.csv";

/// Generate a report in the format implied by the file extension
pub fn generate<P: AsRef<Path>>(path: P, augmented: &AugmentedTable) -> Result<()> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let mut file = std::fs::File::create(path)?;

    match ext.as_str() {
        "html" | "htm" => html::write(&mut file, augmented)?,
        "json" => json::write(&mut file, augmented)?,
        _ => csv::write(&mut file, augmented)?,
    }
    log::info!("Wrote report to {}", path.display());
    Ok(())
}

/// Headline numbers plus the two chart distributions
#[derive(Debug, Clone, Default, Serialize)]
pub struct Summary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub risk_levels: SummaryDistribution,
    pub categories: SummaryDistribution,
}

impl Summary {
    pub fn from_augmented(augmented: &AugmentedTable) -> Self {
        let failed = augmented.failed();
        Self {
            total: augmented.len(),
            succeeded: augmented.len() - failed,
            failed,
            risk_levels: summarize(augmented.table(), LEVEL_OF_RISK),
            categories: summarize(augmented.table(), ASSET_CATEGORY),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReportRow<'a> {
    pub record: &'a AssetRecord,
    pub assessment: &'a AssessmentResult,
}

/// Everything a JSON or HTML report shows
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub generated: String,
    pub schema: &'static str,
    pub summary: Summary,
    pub columns: Vec<&'a str>,
    pub rows: Vec<ReportRow<'a>>,
}

impl<'a> Report<'a> {
    pub fn new(augmented: &'a AugmentedTable) -> Self {
        Self {
            generated: chrono::Local::now().to_rfc3339(),
            schema: ASSET_SCHEMA.name,
            summary: Summary::from_augmented(augmented),
            columns: augmented.columns(),
            rows: augmented
                .rows()
                .map(|(record, assessment)| ReportRow { record, assessment })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::attach_results;
    use crate::inventory::AssetTable;

    // ==========================================================================
    // SUMMARY STATISTICS TESTS
    // ==========================================================================
    //
    // The summary sits at the top of every report and feeds both charts.
    // ==========================================================================

    fn augmented(rows: &[(&str, &str, Option<&str>)]) -> AugmentedTable {
        let columns = vec![ASSET_CATEGORY.to_string(), LEVEL_OF_RISK.to_string()];
        let records = rows
            .iter()
            .map(|(cat, level, _)| vec![(ASSET_CATEGORY, *cat), (LEVEL_OF_RISK, *level)].into_iter().collect())
            .collect();
        let results = rows
            .iter()
            .map(|(_, _, text)| match text {
                Some(t) => AssessmentResult::Success(t.to_string()),
                None => AssessmentResult::Failure("HTTP 500".to_string()),
            })
            .collect();
        attach_results(&AssetTable::from_parts(columns, records), results).unwrap()
    }

    #[test]
    fn test_summary_empty() {
        let summary = Summary::from_augmented(&augmented(&[]));
        assert_eq!(summary.total, 0);
        assert_eq!(summary.failed, 0);
        assert!(summary.risk_levels.is_empty());
        assert!(summary.categories.is_empty());
    }

    #[test]
    fn test_summary_mixed() {
        let summary = Summary::from_augmented(&augmented(&[
            ("Hardware", "High", Some("a")),
            ("Software", "High", None),
            ("Hardware", "Low", Some("c")),
        ]));
        assert_eq!(summary.total, 3);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.risk_levels.get("High"), Some(2));
        assert_eq!(summary.categories.get("Hardware"), Some(2));
        assert_eq!(summary.categories.get("Software"), Some(1));
    }

    #[test]
    fn test_summary_default() {
        let summary = Summary::default();
        assert_eq!(summary.total, 0);
        assert_eq!(summary.succeeded, 0);
    }

    // ==========================================================================
    // FILE OUTPUT TESTS
    // ==========================================================================

    #[test]
    fn test_generate_picks_format_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let data = augmented(&[("Hardware", "High", Some("Patch the firmware"))]);

        for name in ["out.csv", "out.json", "out.html", "out.txt"] {
            generate(dir.path().join(name), &data).unwrap();
        }

        let csv = std::fs::read_to_string(dir.path().join("out.csv")).unwrap();
        assert!(csv.starts_with("Asset Category,Level of Risk,AI Risk Assessment"));

        let json = std::fs::read_to_string(dir.path().join("out.json")).unwrap();
        assert!(json.trim_start().starts_with('{'));

        let html = std::fs::read_to_string(dir.path().join("out.html")).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));

        // Unknown extensions fall back to CSV
        let txt = std::fs::read_to_string(dir.path().join("out.txt")).unwrap();
        assert_eq!(txt, csv);
    }

    #[test]
    fn test_report_rows_follow_table_order() {
        let data = augmented(&[("A", "High", Some("one")), ("B", "Low", None)]);
        let report = Report::new(&data);
        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.rows[0].record.get(ASSET_CATEGORY), Some("A"));
        assert_eq!(report.rows[1].assessment.text(), "Assessment Failed");
        assert_eq!(report.columns, vec![ASSET_CATEGORY, LEVEL_OF_RISK, "AI Risk Assessment"]);
    }
}
