//! airisk - AI-assisted risk assessment for IT asset inventories
//!
//! airisk takes an asset inventory exported as CSV, checks it against a
//! fixed column contract, asks a generative model for a risk assessment of
//! every asset, and produces reports with summary charts.
//!
//! # Pipeline
//!
//! 1. **Parse**: [`RawTable`] holds the CSV header and rows as text.
//! 2. **Validate**: [`validate`] rejects tables missing required columns
//!    and backfills optional ones with `"Not Specified"`.
//! 3. **Assess**: an [`Assessor`] renders one prompt per record and calls
//!    the injected [`ModelClient`]. Failed calls become
//!    [`AssessmentResult::Failure`]; the batch keeps going.
//! 4. **Aggregate**: [`attach_results`] pairs results with records by
//!    position, [`summarize`] counts values for charts.
//! 5. **Report**: [`report::generate`] writes CSV, JSON or HTML.
//!
//! # Quick Start
//!
//! ```no_run
//! use airisk::{attach_results, validate, Assessor, GeminiClient, RawTable};
//!
//! let raw = RawTable::from_path("inventory.csv")?;
//! let validated = validate(raw)?;
//! for warning in &validated.warnings {
//!     eprintln!("warning: {}", warning);
//! }
//!
//! let client = GeminiClient::new(std::env::var("GOOGLE_AI_KEY").ok());
//! let assessor = Assessor::new(client);
//! let results = assessor.assess_table(&validated.table, |done, total| {
//!     eprintln!("{}/{}", done, total);
//! })?;
//!
//! let augmented = attach_results(&validated.table, results)?;
//! airisk::report::generate("results.csv", &augmented)?;
//! # Ok::<(), airisk::Error>(())
//! ```
//!
//! # Modules
//!
//! - [`schema`]: the column contract shared by validation and prompting
//! - [`inventory`]: tables, records and schema validation
//! - [`assess`]: prompt building and the per-record assessment loop
//! - [`model`]: the model client trait and the Gemini implementation
//! - [`aggregate`]: result pairing and value distributions
//! - [`report`]: output formatters (CSV, JSON, HTML)
//! - [`serve`]: interactive browser mode

pub mod aggregate;
pub mod assess;
pub mod error;
pub mod inventory;
pub mod model;
pub mod report;
pub mod schema;
pub mod serve;

pub use aggregate::{attach_results, summarize, AugmentedTable, Bucket, SummaryDistribution};
pub use assess::{build_prompt, AssessmentResult, Assessor};
pub use error::{Error, ErrorKind, Result, ValidationError};
pub use inventory::validate::{validate, SchemaValidator, Validated, ValidationWarning};
pub use inventory::{AssetRecord, AssetTable, RawTable};
pub use model::{GeminiClient, GenerationConfig, ModelClient, ModelError};
pub use schema::{ASSET_SCHEMA, NOT_SPECIFIED};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // ==========================================================================
    // PUBLIC API TESTS
    // ==========================================================================

    #[test]
    fn test_public_exports() {
        let _ = AssessmentResult::Success(String::new());
        let _ = GenerationConfig::default();
        let _: &dyn ModelClient = &GeminiClient::new(None);
        assert_eq!(NOT_SPECIFIED, "Not Specified");
        assert_eq!(ASSET_SCHEMA.required.len(), 9);
    }

    // ==========================================================================
    // END-TO-END TESTS
    // ==========================================================================
    //
    // Full pass: CSV text in, augmented CSV out, with a model that fails on
    // the second call.
    // ==========================================================================

    struct FlakyModel {
        calls: AtomicUsize,
    }

    impl ModelClient for FlakyModel {
        fn generate(&self, prompt: &str) -> std::result::Result<String, ModelError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n == 1 {
                return Err(ModelError::Transport("timed out".to_string()));
            }
            let asset = prompt.lines().nth(1).unwrap_or_default().trim_start_matches("Asset: ");
            Ok(format!("{} needs attention", asset))
        }
    }

    const INVENTORY: &str = "\
Asset,Asset Category,Threat Event,Threat Source,Threat Description,Relevance,Vulnerability,Risk Owner,Risk Treatment Required,Asset Value,Threat Source Characteristics Existing Control,Likelihood of Attack,Likelihood Initiated Attack Success,Level of Threat Impact,Level of Risk
Web server,Hardware,DDoS,Botnet,Flood of traffic,High,No rate limiting,Ops,Yes,High,CDN,High,Medium,High,High
HR database,Data,Data breach,Insider,Exports records,High,Broad access,HR,Yes,High,Audit log,Medium,Medium,High,High
Printer,Hardware,Tampering,Visitor,Changes settings,Low,Default password,IT,No,Low,None,Low,Low,Low,Low
";

    #[test]
    fn test_end_to_end_with_one_failure() {
        let validated = validate(RawTable::from_reader(INVENTORY.as_bytes()).unwrap()).unwrap();

        // Only Risk Appetite is missing
        assert_eq!(validated.warnings.len(), 1);
        assert!(validated.warnings[0].to_string().contains("Risk Appetite"));

        let model = FlakyModel { calls: AtomicUsize::new(0) };
        let results = Assessor::new(&model).assess_table(&validated.table, |_, _| {}).unwrap();
        let augmented = attach_results(&validated.table, results).unwrap();

        let out = report::csv::to_string(&augmented).unwrap();
        let exported = RawTable::from_reader(out.as_bytes()).unwrap();

        assert_eq!(exported.rows.len(), 3);
        let appetite = exported.headers.iter().position(|h| h == "Risk Appetite").unwrap();
        let assessment = exported.headers.iter().position(|h| h == "AI Risk Assessment").unwrap();
        assert_eq!(assessment, exported.headers.len() - 1);

        for row in &exported.rows {
            assert_eq!(row[appetite], "Not Specified");
            assert!(!row[assessment].is_empty());
        }
        assert_eq!(exported.rows[0][assessment], "Web server needs attention");
        assert_eq!(exported.rows[1][assessment], "Assessment Failed");
        assert_eq!(exported.rows[2][assessment], "Printer needs attention");

        let summary = report::Summary::from_augmented(&augmented);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.risk_levels.get("High"), Some(2));
        assert_eq!(summary.risk_levels.get("Low"), Some(1));
    }

    #[test]
    fn test_end_to_end_rejects_before_assessing() {
        let csv = "Asset,Asset Category\nWeb server,Hardware\n";
        let err = validate(RawTable::from_reader(csv.as_bytes()).unwrap()).unwrap_err();
        assert_eq!(Error::from(err).kind(), ErrorKind::MissingRequiredColumns);
    }
}
