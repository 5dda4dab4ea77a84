//! Tab-separated identification and reporter ion tables

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use csv::{QuoteStyle, ReaderBuilder, Terminator, WriterBuilder};
use mzextractor_core::quant::ReporterIon;
use mzextractor_core::table::Table;

use crate::Error;

/// Comet writes its version on the first line, above the real header
pub const COMET_MARKER: &str = "CometVersion";

/// Whether the first line of a file is Comet's version banner
pub fn has_comet_banner(first_line: &str) -> bool {
    first_line
        .split('\t')
        .next()
        .map(|field| field.contains(COMET_MARKER))
        .unwrap_or(false)
}

/// Parse tab-separated text with a header line. Fields are never quoted.
///
/// Every non-empty line after the header must come out as exactly one row;
/// anything else means the text was not parsed the way it was written.
/// Blank lines above the header are skipped.
pub fn parse_table(contents: &str, source: &str) -> Result<Table, Error> {
    let contents = contents.trim_start_matches(['\n', '\r']);
    let mut lines = contents.lines();
    let header = lines.next().unwrap_or_default();
    let data_lines = lines.filter(|line| !line.trim_end_matches('\r').is_empty()).count();
    if header.trim_end_matches('\r').is_empty() {
        return Ok(Table::default());
    }

    let mut rdr = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .quoting(false)
        .from_reader(contents.as_bytes());

    let headers = rdr
        .headers()?
        .iter()
        .map(String::from)
        .collect::<Vec<_>>();
    let mut table = Table::new(headers);
    for record in rdr.records() {
        let record = record?;
        table.push_row(record.iter().map(String::from).collect())?;
    }

    if table.len() != data_lines {
        log::error!(
            "{}: read {} rows from {} lines",
            source,
            table.len(),
            data_lines
        );
        return Err(Error::RowCountMismatch {
            path: source.into(),
            lines: data_lines,
            rows: table.len(),
        });
    }
    Ok(table)
}

/// Read a search engine result table. Comet files carry a version banner on
/// line 1 that is skipped, taking the header from line 2.
pub fn read_ident_table<P: AsRef<Path>>(path: P) -> Result<Table, Error> {
    let path = path.as_ref();
    let source = path.display().to_string();
    let contents = crate::read_to_string(path)?;

    let first_line = contents.lines().next().unwrap_or_default();
    let table = if has_comet_banner(first_line) {
        log::debug!("{}: reading the \"comet\" data file", source);
        let body = contents.split_once('\n').map(|(_, rest)| rest).unwrap_or_default();
        parse_table(body, &source)?
    } else {
        log::debug!("{}: reading the data file", source);
        parse_table(&contents, &source)?
    };

    log::info!("{}: loaded {} rows", source, table.len());
    Ok(table)
}

/// Read the reference table of reporter ions: columns `label` and `mz`
pub fn read_reporter_ions<P: AsRef<Path>>(path: P) -> Result<Vec<ReporterIon>, Error> {
    let path = path.as_ref();
    let source = path.display().to_string();
    let table = parse_table(&crate::read_to_string(path)?, &source)?;
    mzextractor_core::schema::require_columns(&table, &["label", "mz"])?;

    let mut ions = Vec::with_capacity(table.len());
    for row in 0..table.len() {
        let label = table.value(row, "label").unwrap_or_default().trim();
        let mz = table.value(row, "mz").unwrap_or_default().trim();
        match mz.parse::<f32>() {
            Ok(value) if !label.is_empty() && value > 0.0 => ions.push(ReporterIon {
                label: label.to_string(),
                mz: value,
            }),
            _ => {
                return Err(Error::InvalidReporterIon {
                    path: source,
                    label: label.to_string(),
                    mz: mz.to_string(),
                })
            }
        }
    }
    Ok(ions)
}

/// Write `table` as UTF-8 tab-separated text with `\n` line endings and no
/// index column. The file is synced to disk before returning.
pub fn write_table<P: AsRef<Path>>(path: P, table: &Table) -> Result<(), Error> {
    let file = File::create(path.as_ref())?;
    let mut wtr = WriterBuilder::new()
        .delimiter(b'\t')
        .terminator(Terminator::Any(b'\n'))
        .quote_style(QuoteStyle::Never)
        .from_writer(BufWriter::new(file));

    wtr.write_record(table.headers())?;
    for row in table.rows() {
        wtr.write_record(row)?;
    }
    wtr.flush()?;

    let mut inner = wtr
        .into_inner()
        .map_err(|e| Error::IO(e.into_error()))?;
    inner.flush()?;
    inner.get_ref().sync_all()?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn banner_detection() {
        assert!(has_comet_banner("CometVersion 2019.01 rev. 5\t06/09/2020"));
        assert!(!has_comet_banner("scannum\tcharge"));
        assert!(!has_comet_banner("scan\tnote CometVersion"));
    }

    #[test]
    fn parse_counts_rows() -> Result<(), Error> {
        let table = parse_table("a\tb\r\n1\t2\r\n\r\n3\t4\n", "mem")?;
        assert_eq!(table.headers(), &["a", "b"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.value(1, "b"), Some("4"));
        Ok(())
    }

    #[test]
    fn quotes_are_literal() -> Result<(), Error> {
        let table = parse_table("a\tb\n\"x\ty\n", "mem")?;
        assert_eq!(table.value(0, "a"), Some("\"x"));
        Ok(())
    }

    #[test]
    fn ragged_rows_fail() {
        assert!(parse_table("a\tb\n1\t2\t3\n", "mem").is_err());
    }

    #[test]
    fn empty_input() -> Result<(), Error> {
        assert!(parse_table("", "mem")?.is_empty());
        assert!(parse_table("\n\r\n", "mem")?.headers().is_empty());
        Ok(())
    }

    #[test]
    fn leading_blank_lines() -> Result<(), Error> {
        let table = parse_table("\n\r\nscannum\tcharge\n1\t2\n3\t4\n", "mem")?;
        assert_eq!(table.headers(), &["scannum", "charge"]);
        assert_eq!(table.len(), 2);
        Ok(())
    }

    #[test]
    fn lone_carriage_return_is_a_parse_defect() {
        // csv ends a record at the bare `\r`, line counting does not
        match parse_table("a\tb\n1\t2\r3\t4\n", "mem") {
            Err(Error::RowCountMismatch { path, lines, rows }) => {
                assert_eq!(path, "mem");
                assert_eq!((lines, rows), (1, 2));
            }
            other => panic!("expected a row count mismatch, got {:?}", other),
        }
    }
}
