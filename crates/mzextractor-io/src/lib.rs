use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::GzDecoder;

pub mod mzml;
pub mod tsv;
pub mod util;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    IO(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("MzML error: {0}")]
    MzML(#[from] mzml::MzMLError),
    #[error(transparent)]
    Table(#[from] mzextractor_core::Error),
    #[error("{path}: {lines} data lines but {rows} parsed rows")]
    RowCountMismatch {
        path: String,
        lines: usize,
        rows: usize,
    },
    #[error("{path}: invalid reporter ion `{label}`: m/z `{mz}`")]
    InvalidReporterIon {
        path: String,
        label: String,
        mz: String,
    },
}

/// Does the path end in "gz" or "gzip"?
fn gzip_heuristic(path: &Path) -> bool {
    match path.extension() {
        Some(ext) => ext.eq_ignore_ascii_case("gz") || ext.eq_ignore_ascii_case("gzip"),
        None => false,
    }
}

/// Open a buffered reader over a local file, transparently decompressing
/// gzipped files
pub fn open<P: AsRef<Path>>(path: P) -> Result<Box<dyn BufRead + Send>, Error> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| Error::Open {
        path: path.display().to_string(),
        source,
    })?;
    match gzip_heuristic(path) {
        true => Ok(Box::new(BufReader::new(GzDecoder::new(file)))),
        false => Ok(Box::new(BufReader::new(file))),
    }
}

/// Read a whole (possibly gzipped) text file into memory
pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String, Error> {
    let mut contents = String::new();
    open(path)?.read_to_string(&mut contents)?;
    Ok(contents)
}
