pub mod engine;
pub mod mass;
pub mod pairing;
pub mod quant;
pub mod scanid;
pub mod schema;
pub mod spectrum;
pub mod table;

use std::path::Path;

/// Column holding the spectral file (base name, no extension) a row came from
pub const SPECTRUM_FILE: &str = "Spectrum_File";
/// Synthesized per-row identifier
pub const SCAN_ID: &str = "ScanID";
/// Normalized scan number column
pub const FIRST_SCAN: &str = "FirstScan";
/// Normalized precursor charge column
pub const CHARGE: &str = "Charge";

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Missing columns: {}", .columns.join(", "))]
    MissingColumns { columns: Vec<String> },
    #[error("row {row} has {found} fields, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("invalid scan number `{value}` in column `{column}`")]
    InvalidScan { column: String, value: String },
    #[error("{}", pairing::describe_gaps(.unmatched, .duplicates))]
    Pairing {
        unmatched: Vec<String>,
        duplicates: Vec<String>,
    },
}

/// Base file name with its final `.`-delimited extension removed.
///
/// Embedded dots in the stem are preserved (`a.b.tsv` -> `a.b`), and a
/// leading dot is not treated as an extension separator.
pub fn file_stem<P: AsRef<Path>>(path: P) -> String {
    let name = path
        .as_ref()
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    match name.rfind('.') {
        Some(ix) if ix > 0 => name[..ix].to_string(),
        _ => name,
    }
}

#[cfg(test)]
mod test {
    use super::file_stem;

    #[test]
    fn stems() {
        assert_eq!(file_stem("dir/run1.tsv"), "run1");
        assert_eq!(file_stem("/data/sample.01.mzML"), "sample.01");
        assert_eq!(file_stem("noext"), "noext");
        assert_eq!(file_stem(".hidden"), ".hidden");
        assert_eq!(file_stem("run1.mzML.gz"), "run1.mzML");
    }
}
