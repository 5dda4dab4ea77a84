//! Declared column requirements of each processing step
//!
//! Every step that reads or adds columns declares them here, and input
//! validation is a set-containment check against the declaration.

use crate::table::Table;
use crate::{Error, CHARGE, FIRST_SCAN, SCAN_ID, SPECTRUM_FILE};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Schema {
    pub name: &'static str,
    /// Columns that must exist on input
    pub requires: &'static [&'static str],
    /// Columns guaranteed to exist on output
    pub produces: &'static [&'static str],
}

/// Search engine normalization
pub const NORMALIZED: Schema = Schema {
    name: "normalization",
    requires: &[],
    produces: &[FIRST_SCAN, CHARGE],
};

/// ScanID assignment; the id columns themselves are supplied at run time
pub const SCAN_IDS: Schema = Schema {
    name: "scan id",
    requires: &[],
    produces: &[SPECTRUM_FILE, SCAN_ID],
};

/// Preparation of reporter ion extraction parameters
pub const EXTRACTION: Schema = Schema {
    name: "extraction",
    requires: &[SPECTRUM_FILE, FIRST_SCAN],
    produces: &[SPECTRUM_FILE, FIRST_SCAN],
};

/// Left join of extracted intensities into identifications
pub const MERGE: Schema = Schema {
    name: "merge",
    requires: &[FIRST_SCAN],
    produces: &[],
};

impl Schema {
    pub fn check_input(&self, table: &Table) -> Result<(), Error> {
        require_columns(table, self.requires).map_err(|e| {
            log::debug!("{} step rejected its input: {}", self.name, e);
            e
        })
    }

    pub fn check_output(&self, table: &Table) -> Result<(), Error> {
        require_columns(table, self.produces)
    }
}

/// Fails naming every column of `columns` that `table` lacks
pub fn require_columns<S: AsRef<str>>(table: &Table, columns: &[S]) -> Result<(), Error> {
    let missing = columns
        .iter()
        .map(AsRef::as_ref)
        .filter(|col| !table.has_column(col))
        .map(String::from)
        .collect::<Vec<_>>();
    match missing.is_empty() {
        true => Ok(()),
        false => Err(Error::MissingColumns { columns: missing }),
    }
}
