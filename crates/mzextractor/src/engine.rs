//! Search engine detection and column normalization
//!
//! Proteome Discoverer, Comet and MSFragger each report the scan number and
//! charge under their own column names. After [`SearchEngine::preprocess`],
//! every table carries them as `FirstScan` and `Charge`.

use serde::Serialize;

use crate::schema::{self, require_columns};
use crate::table::Table;
use crate::{file_stem, Error, CHARGE, FIRST_SCAN, SPECTRUM_FILE};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum SearchEngine {
    ProteomeDiscoverer,
    Comet,
    MsFragger,
}

const PD_SPECTRUM_FILE: &str = "Spectrum File";

impl SearchEngine {
    /// Columns that identify the engine a table came from
    pub fn signature(&self) -> &'static [&'static str] {
        match self {
            SearchEngine::ProteomeDiscoverer => &[PD_SPECTRUM_FILE, "First Scan", "Charge"],
            SearchEngine::Comet => &["scan", "charge", "exp_neutral_mass", "xcorr"],
            SearchEngine::MsFragger => {
                &["scannum", "charge", "precursor_neutral_mass", "hyperscore"]
            }
        }
    }

    fn scan_column(&self) -> &'static str {
        match self {
            SearchEngine::ProteomeDiscoverer => "First Scan",
            SearchEngine::Comet => "scan",
            SearchEngine::MsFragger => "scannum",
        }
    }

    fn charge_column(&self) -> &'static str {
        match self {
            SearchEngine::ProteomeDiscoverer => "Charge",
            SearchEngine::Comet | SearchEngine::MsFragger => "charge",
        }
    }

    /// Which engine produced `table`, judged by its columns
    pub fn detect(table: &Table) -> Option<SearchEngine> {
        [
            SearchEngine::ProteomeDiscoverer,
            SearchEngine::Comet,
            SearchEngine::MsFragger,
        ]
        .into_iter()
        .find(|engine| require_columns(table, engine.signature()).is_ok())
    }

    /// Normalize `table` to the common schema. Existing common columns are
    /// left as they are.
    pub fn preprocess(&self, mut table: Table) -> Result<Table, Error> {
        require_columns(&table, self.signature())?;

        if !table.has_column(FIRST_SCAN) {
            copy_column(&mut table, self.scan_column(), FIRST_SCAN)?;
        }
        if !table.has_column(CHARGE) {
            copy_column(&mut table, self.charge_column(), CHARGE)?;
        }

        // PD reports the raw file each PSM came from
        if *self == SearchEngine::ProteomeDiscoverer && !table.has_column(SPECTRUM_FILE) {
            let col = table.column(PD_SPECTRUM_FILE).unwrap_or_default();
            table.push_column(SPECTRUM_FILE, |row| file_stem(row[col].trim()));
        }

        schema::NORMALIZED.check_output(&table)?;
        Ok(table)
    }
}

impl std::fmt::Display for SearchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchEngine::ProteomeDiscoverer => write!(f, "PD"),
            SearchEngine::Comet => write!(f, "Comet"),
            SearchEngine::MsFragger => write!(f, "MSFragger"),
        }
    }
}

fn copy_column(table: &mut Table, from: &str, to: &str) -> Result<(), Error> {
    let values = table
        .values(from)
        .ok_or_else(|| Error::MissingColumns {
            columns: vec![from.to_string()],
        })?
        .map(|v| v.trim().to_string())
        .collect();
    table.set_column(to, values)
}

#[cfg(test)]
mod test {
    use super::*;

    fn table(headers: &[&str], row: &[&str]) -> Table {
        Table::from_rows(
            headers.iter().copied(),
            vec![row.iter().map(|s| s.to_string()).collect()],
        )
        .unwrap()
    }

    #[test]
    fn detects_engines() {
        let comet = table(
            &["scan", "num", "charge", "exp_neutral_mass", "xcorr"],
            &["5", "1", "2", "1000.5", "3.2"],
        );
        assert_eq!(SearchEngine::detect(&comet), Some(SearchEngine::Comet));

        let fragger = table(
            &["scannum", "precursor_neutral_mass", "charge", "hyperscore"],
            &["7", "800.4", "3", "20.1"],
        );
        assert_eq!(SearchEngine::detect(&fragger), Some(SearchEngine::MsFragger));

        let pd = table(
            &["Spectrum File", "First Scan", "Charge", "Annotated Sequence"],
            &["Exp1.raw", "11", "2", "PEPTIDE"],
        );
        assert_eq!(SearchEngine::detect(&pd), Some(SearchEngine::ProteomeDiscoverer));

        let unknown = table(&["id", "score"], &["1", "2"]);
        assert_eq!(SearchEngine::detect(&unknown), None);
    }

    #[test]
    fn normalizes_msfragger() {
        let fragger = table(
            &["scannum", "precursor_neutral_mass", "charge", "hyperscore"],
            &["7", "800.4", "3", "20.1"],
        );
        let out = SearchEngine::MsFragger.preprocess(fragger).unwrap();
        assert_eq!(out.value(0, FIRST_SCAN), Some("7"));
        assert_eq!(out.value(0, CHARGE), Some("3"));
        assert!(!out.has_column(SPECTRUM_FILE));
    }

    #[test]
    fn pd_populates_spectrum_file() {
        let pd = table(
            &["Spectrum File", "First Scan", "Charge"],
            &["Exp1.raw", "11", "2"],
        );
        let out = SearchEngine::ProteomeDiscoverer.preprocess(pd).unwrap();
        assert_eq!(out.headers(), &["Spectrum File", "First Scan", "Charge", "FirstScan", "Spectrum_File"]);
        assert_eq!(out.value(0, SPECTRUM_FILE), Some("Exp1"));
        assert_eq!(out.value(0, FIRST_SCAN), Some("11"));
    }

    #[test]
    fn preprocess_checks_signature() {
        let unknown = table(&["id"], &["1"]);
        assert!(SearchEngine::Comet.preprocess(unknown).is_err());
    }
}
