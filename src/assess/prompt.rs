//! Prompt construction
//!
//! Pure rendering of one record into the assessment request text. A record
//! lacking a prompt field is an error rather than a blank slot.

use crate::error::ValidationError;
use crate::inventory::AssetRecord;
use crate::schema::{ColumnSchema, ASSET_SCHEMA};
use std::fmt::Write;

const PREAMBLE: &str = "Analyze the risk for the following asset:";
const INSTRUCTION: &str = "Provide a detailed risk assessment and recommended treatment strategy.";

/// Render the prompt for `record` using the built-in schema
pub fn build_prompt(record: &AssetRecord) -> Result<String, ValidationError> {
    build_prompt_with(&ASSET_SCHEMA, record)
}

pub fn build_prompt_with(schema: &ColumnSchema, record: &AssetRecord) -> Result<String, ValidationError> {
    let mut prompt = String::with_capacity(512);
    prompt.push_str(PREAMBLE);
    prompt.push('\n');

    for field in schema.prompt_fields {
        let value = record.get(field.column).ok_or_else(|| ValidationError::MissingField {
            field: field.column.to_string(),
        })?;
        // Writing to a String cannot fail
        let _ = writeln!(prompt, "{}: {}", field.label, value);
    }

    prompt.push('\n');
    prompt.push_str(INSTRUCTION);
    Ok(prompt)
}
