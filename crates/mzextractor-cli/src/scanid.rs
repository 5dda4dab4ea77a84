use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{ensure, Context};
use mzextractor_core::scanid;
use mzextractor_io::tsv;
use regex::Regex;

use crate::output::write_replacing;

/// Directory created beside the input file when no output directory is given
pub const DEFAULT_OUTDIR: &str = "add_scanid";

/// Split a comma separated list of column names, tolerating whitespace
/// around the commas
pub fn parse_ids(ids: &str) -> Vec<String> {
    static SEP: OnceLock<Regex> = OnceLock::new();
    let sep = SEP.get_or_init(|| Regex::new(r"\s*,\s*").expect("valid separator regex"));
    sep.split(ids.trim())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(String::from)
        .collect()
}

/// Default output directory for `infile`
pub fn default_outdir(infile: &Path) -> PathBuf {
    infile
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join(DEFAULT_OUTDIR)
}

/// Add `Spectrum_File` and `ScanID` to `infile`, writing the result under
/// the same file name in `outdir`, which must not exist yet.
pub fn add_scan_ids(infile: &Path, ids: &[String], outdir: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    ensure!(!ids.is_empty(), "no ID columns given");
    let outdir = outdir.unwrap_or_else(|| default_outdir(infile));
    ensure!(
        !outdir.exists(),
        "output directory `{}` already exists",
        outdir.display()
    );
    let name = infile
        .file_name()
        .with_context(|| format!("`{}` is not a file", infile.display()))?;

    log::info!("reading {}", infile.display());
    let table = tsv::read_ident_table(infile)
        .with_context(|| format!("Failed to read `{}`", infile.display()))?;

    log::info!("adding ScanID from {}", ids.join(", "));
    let table = scanid::assign(table, infile, ids)?;

    std::fs::create_dir_all(&outdir)
        .with_context(|| format!("Failed to create `{}`", outdir.display()))?;
    let outfile = outdir.join(name);
    write_replacing(&outfile, &table)?;
    Ok(outfile)
}
