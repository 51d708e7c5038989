//! JSON report

use super::Report;
use crate::aggregate::AugmentedTable;
use crate::error::Result;
use std::io::Write;

pub fn write<W: Write>(writer: &mut W, augmented: &AugmentedTable) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, &Report::new(augmented))?;
    writeln!(writer)?;
    Ok(())
}
