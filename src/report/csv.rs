//! CSV export: the validated table plus the assessment column

use crate::aggregate::AugmentedTable;
use crate::error::Result;
use std::io::Write;

pub fn write<W: Write>(writer: &mut W, augmented: &AugmentedTable) -> Result<()> {
    let mut wtr = ::csv::Writer::from_writer(writer);
    wtr.write_record(augmented.columns())?;

    let columns = augmented.table().columns();
    for (record, result) in augmented.rows() {
        let cells = columns
            .iter()
            .map(|c| record.get(c).unwrap_or(""))
            .chain(std::iter::once(result.text()));
        wtr.write_record(cells)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Render the export in memory, for HTTP downloads
pub fn to_string(augmented: &AugmentedTable) -> Result<String> {
    let mut buf = Vec::new();
    write(&mut buf, augmented)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
