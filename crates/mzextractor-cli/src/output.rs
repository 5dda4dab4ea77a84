//! Crash-safe output files
//!
//! Every table is first written to `<name><ext>.tmp` beside its final path
//! and renamed over the final path once the write has fully succeeded. A
//! failed write leaves the previous output untouched and the `.tmp` file
//! behind.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::Context;
use mzextractor_core::table::Table;
use mzextractor_io::tsv;

const TMP_SUFFIX: &str = ".tmp";

/// Temporary path for `path`: the same file name with `.tmp` appended
pub fn tmp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(TMP_SUFFIX);
    PathBuf::from(name)
}

/// Write `table` to `<path>.tmp`, removing a stale temporary file of that
/// exact name first. Returns the temporary path.
pub fn write_tmp(path: &Path, table: &Table) -> anyhow::Result<PathBuf> {
    let tmp = tmp_path(path);
    if tmp.is_file() {
        log::debug!("removing stale temporary file {}", tmp.display());
        std::fs::remove_file(&tmp)
            .with_context(|| format!("Failed to remove `{}`", tmp.display()))?;
    }
    tsv::write_table(&tmp, table)
        .with_context(|| format!("Failed to write `{}`", tmp.display()))?;
    Ok(tmp)
}

/// Rename a temporary file written by [`write_tmp`] over its final path
pub fn finalize(tmp: &Path) -> anyhow::Result<PathBuf> {
    let path = tmp.with_extension("");
    debug_assert_eq!(tmp_path(&path), tmp);
    std::fs::rename(tmp, &path).with_context(|| {
        format!(
            "Failed to rename `{}` to `{}`",
            tmp.display(),
            path.display()
        )
    })?;
    Ok(path)
}

/// Write-then-rename of a single table
pub fn write_replacing(path: &Path, table: &Table) -> anyhow::Result<()> {
    let tmp = write_tmp(path, table)?;
    finalize(&tmp)?;
    log::info!("wrote {} rows to {}", table.len(), path.display());
    Ok(())
}

/// Places one output file per spectrum file in `output_directory`
#[derive(Clone, Debug)]
pub struct ExperimentWriter {
    pub output_directory: PathBuf,
    /// Used when the spectrum file name carries no extension, e.g. `.tsv`
    pub default_extension: String,
}

impl ExperimentWriter {
    pub fn new<P: Into<PathBuf>, S: Into<String>>(output_directory: P, default_extension: S) -> Self {
        Self {
            output_directory: output_directory.into(),
            default_extension: default_extension.into(),
        }
    }

    /// Final path of the output for spectrum file `key`
    pub fn output_path(&self, key: &str) -> PathBuf {
        let name = match key.rfind('.') {
            Some(ix) if ix > 0 && ix + 1 < key.len() => key.to_string(),
            _ => format!("{}{}", key, self.default_extension),
        };
        self.output_directory.join(name)
    }

    pub fn write_tmp(&self, key: &str, table: &Table) -> anyhow::Result<PathBuf> {
        let path = self.output_path(key);
        log::debug!("{}: writing {} rows to {}", key, table.len(), path.display());
        write_tmp(&path, table)
    }
}
