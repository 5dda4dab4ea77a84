//! ScanID generation
//!
//! `ScanID = Spectrum_File-<id column 1>-<id column 2>...`, computed once:
//! columns that already exist are never recomputed, so re-running over an
//! already processed file is a no-op.

use std::path::Path;

use crate::schema::{self, require_columns};
use crate::table::Table;
use crate::{file_stem, Error, SCAN_ID, SPECTRUM_FILE};

/// Add `Spectrum_File` (from `source`) and `ScanID` (from `Spectrum_File`
/// and `ids`) to `table`, leaving either column untouched if present.
pub fn assign<P, S>(mut table: Table, source: P, ids: &[S]) -> Result<Table, Error>
where
    P: AsRef<Path>,
    S: AsRef<str>,
{
    if !table.has_column(SPECTRUM_FILE) {
        let name = file_stem(source);
        log::debug!("adding {} = {}", SPECTRUM_FILE, name);
        table.push_column(SPECTRUM_FILE, |_| name.clone());
    }

    if !table.has_column(SCAN_ID) {
        if let Err(e) = require_columns(&table, ids) {
            log::error!("Missing columns in the input file: {}", e);
            return Err(e);
        }

        let mut columns = Vec::with_capacity(ids.len() + 1);
        columns.push(table.column(SPECTRUM_FILE).unwrap_or_default());
        columns.extend(ids.iter().filter_map(|id| table.column(id.as_ref())));

        table.push_column(SCAN_ID, |row| {
            columns
                .iter()
                .map(|&col| row[col].as_str())
                .collect::<Vec<_>>()
                .join("-")
        });
    }

    schema::SCAN_IDS.check_output(&table)?;
    Ok(table)
}
