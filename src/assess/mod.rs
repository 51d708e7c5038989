//! Per-record risk assessment
//!
//! The [`Assessor`] owns the loop over a validated table: render a prompt
//! for each record, hand it to the injected [`ModelClient`], and fold the
//! outcome into an [`AssessmentResult`]. A failed call marks that record
//! and the batch carries on. Nothing is retried.
//!
//! With `jobs > 1` records are assessed on a private worker pool; results
//! always come back in record order.

pub mod prompt;

pub use prompt::build_prompt;

use crate::error::ValidationError;
use crate::inventory::{AssetRecord, AssetTable};
use crate::model::ModelClient;
use crate::schema::{ASSESSMENT_FAILED, ASSET};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Outcome of one model call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "text", rename_all = "snake_case")]
pub enum AssessmentResult {
    /// The model's assessment text
    Success(String),
    /// Why the call failed
    Failure(String),
}

impl AssessmentResult {
    pub fn is_success(&self) -> bool {
        matches!(self, AssessmentResult::Success(_))
    }

    /// Value written to the assessment column
    pub fn text(&self) -> &str {
        match self {
            AssessmentResult::Success(text) => text,
            AssessmentResult::Failure(_) => ASSESSMENT_FAILED,
        }
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            AssessmentResult::Success(_) => None,
            AssessmentResult::Failure(reason) => Some(reason),
        }
    }
}

pub struct Assessor<C> {
    client: C,
    jobs: usize,
}

impl<C: ModelClient> Assessor<C> {
    pub fn new(client: C) -> Self {
        Self { client, jobs: 1 }
    }

    /// Number of concurrent model calls (1 = strictly sequential)
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// Send a free-text query verbatim
    pub fn ask(&self, query: &str) -> AssessmentResult {
        self.call("query", query)
    }

    pub fn assess_record(&self, record: &AssetRecord) -> Result<AssessmentResult, ValidationError> {
        let prompt = build_prompt(record)?;
        Ok(self.call(record.get(ASSET).unwrap_or("?"), &prompt))
    }

    /// Assess every record of `table`, in order.
    ///
    /// All prompts are rendered before the first call, so a record missing
    /// a field aborts the batch without touching the network.
    /// `on_progress(done, total)` runs after each completed record.
    pub fn assess_table<F>(&self, table: &AssetTable, on_progress: F) -> Result<Vec<AssessmentResult>, ValidationError>
    where
        F: Fn(usize, usize) + Sync,
    {
        let mut prompts: Vec<(&str, String)> = Vec::with_capacity(table.len());
        for record in table.records() {
            prompts.push((record.get(ASSET).unwrap_or("?"), build_prompt(record)?));
        }

        let total = prompts.len();
        log::info!("Assessing {} records ({} worker(s))", total, self.jobs);

        if self.jobs == 1 || total < 2 {
            return Ok(self.run_sequential(&prompts, &on_progress));
        }

        match rayon::ThreadPoolBuilder::new().num_threads(self.jobs).build() {
            Ok(pool) => {
                let done = AtomicUsize::new(0);
                let results = pool.install(|| {
                    prompts
                        .par_iter()
                        .map(|(asset, prompt)| {
                            let result = self.call(asset, prompt);
                            on_progress(done.fetch_add(1, Ordering::SeqCst) + 1, total);
                            result
                        })
                        .collect()
                });
                Ok(results)
            }
            Err(e) => {
                log::warn!("Could not start worker pool ({}), assessing sequentially", e);
                Ok(self.run_sequential(&prompts, &on_progress))
            }
        }
    }

    fn run_sequential<F>(&self, prompts: &[(&str, String)], on_progress: &F) -> Vec<AssessmentResult>
    where
        F: Fn(usize, usize),
    {
        let total = prompts.len();
        prompts
            .iter()
            .enumerate()
            .map(|(i, (asset, prompt))| {
                let result = self.call(asset, prompt);
                on_progress(i + 1, total);
                result
            })
            .collect()
    }

    fn call(&self, label: &str, prompt: &str) -> AssessmentResult {
        match self.client.generate(prompt) {
            Ok(text) => {
                log::debug!("Assessment for '{}': {} chars", label, text.len());
                AssessmentResult::Success(text)
            }
            Err(e) => {
                log::error!("Error in AI assessment for '{}': {}", label, e);
                AssessmentResult::Failure(e.to_string())
            }
        }
    }
}
