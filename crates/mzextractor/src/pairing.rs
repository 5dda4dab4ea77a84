//! Pairing of identification files with their spectral files
//!
//! Both file sets are keyed by base name without extension and joined on
//! that key. Every identification file must find exactly one spectral file;
//! spectral files without identifications are merely reported.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;

use crate::{file_stem, Error};

/// One unit of work for the pipeline: an identification file, the spectral
/// file it was searched from, and how to quantify it
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PairingRecord {
    pub key: String,
    pub ident_file: PathBuf,
    pub mzfile: PathBuf,
    pub quan_method: PathBuf,
    pub ppm: f32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilePairs {
    /// (key, identification file, spectral file), ascending by key
    pub matched: Vec<(String, PathBuf, PathBuf)>,
    /// Identification file keys without a spectral file
    pub unmatched: Vec<String>,
    /// Spectral file keys without an identification file
    pub unused: Vec<String>,
    /// Keys seen more than once within either file set
    pub duplicates: Vec<String>,
}

fn index_by_key(paths: Vec<PathBuf>, duplicates: &mut Vec<String>) -> BTreeMap<String, PathBuf> {
    let mut map = BTreeMap::new();
    for path in paths {
        let key = file_stem(&path);
        if let Some(previous) = map.insert(key.clone(), path) {
            log::error!("file key `{}` is shared by more than one file: {}", key, previous.display());
            if !duplicates.contains(&key) {
                duplicates.push(key);
            }
        }
    }
    map
}

/// Join identification files to spectral files by file key
pub fn match_files(ident_files: Vec<PathBuf>, spectral_files: Vec<PathBuf>) -> FilePairs {
    let mut duplicates = Vec::new();
    let idents = index_by_key(ident_files, &mut duplicates);
    let mut spectra = index_by_key(spectral_files, &mut duplicates);
    duplicates.sort();

    let mut pairs = FilePairs {
        duplicates,
        ..Default::default()
    };

    for (key, ident_file) in idents {
        match spectra.remove(&key) {
            Some(mzfile) => pairs.matched.push((key, ident_file, mzfile)),
            None => pairs.unmatched.push(key),
        }
    }
    pairs.unused = spectra.into_keys().collect();
    pairs
}

impl FilePairs {
    /// Turn matched pairs into pipeline records, failing if any
    /// identification file is left unpaired or any key is ambiguous
    pub fn into_records<P: Into<PathBuf>>(
        self,
        quan_method: P,
        ppm: f32,
    ) -> Result<Vec<PairingRecord>, Error> {
        for key in &self.unused {
            log::warn!("spectral file `{}` has no identification file", key);
        }
        if !self.unmatched.is_empty() || !self.duplicates.is_empty() {
            return Err(Error::Pairing {
                unmatched: self.unmatched,
                duplicates: self.duplicates,
            });
        }

        let quan_method = quan_method.into();
        Ok(self
            .matched
            .into_iter()
            .map(|(key, ident_file, mzfile)| PairingRecord {
                key,
                ident_file,
                mzfile,
                quan_method: quan_method.clone(),
                ppm,
            })
            .collect())
    }
}

pub(crate) fn describe_gaps(unmatched: &[String], duplicates: &[String]) -> String {
    let mut parts = Vec::new();
    if !unmatched.is_empty() {
        parts.push(format!(
            "identification files without a spectral file: {}",
            unmatched.join(", ")
        ));
    }
    if !duplicates.is_empty() {
        parts.push(format!("ambiguous file keys: {}", duplicates.join(", ")));
    }
    parts.join("; ")
}
