use std::path::Path;

use mzextractor_core::spectrum::Spectrum;

use crate::mzml::MzMLReader;
use crate::Error;

/// Read every spectrum of `ms_level` (or all spectra, if `None`) from a
/// (possibly gzipped) mzML file
pub fn read_mzml<P: AsRef<Path>>(path: P, ms_level: Option<u8>) -> Result<Vec<Spectrum>, Error> {
    let reader = match ms_level {
        Some(level) => MzMLReader::with_level_filter(level),
        None => MzMLReader::default(),
    };
    let spectra = reader.parse(crate::open(path.as_ref())?)?;
    log::trace!("{}: read {} spectra", path.as_ref().display(), spectra.len());
    Ok(spectra)
}

pub fn read_json<P, T>(path: P) -> Result<T, Error>
where
    P: AsRef<Path>,
    T: for<'de> serde::Deserialize<'de>,
{
    let contents = crate::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}
