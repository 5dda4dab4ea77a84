//! Reporter ion quantification
//!
//! Intensities are extracted per scan from the spectral file and joined back
//! into the identification rows of the same spectrum file.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::path::PathBuf;

use fnv::FnvHashMap;
use serde::Serialize;

use crate::mass::Tolerance;
use crate::schema;
use crate::spectrum::{select_most_intense_peak, Spectrum};
use crate::table::Table;
use crate::{Error, FIRST_SCAN, SPECTRUM_FILE};

/// Prefix of every extracted intensity column
pub const INTENSITY_PREFIX: &str = "Intensity_";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReporterIon {
    pub label: String,
    pub mz: f32,
}

impl ReporterIon {
    pub fn column(&self) -> String {
        format!("{}{}", INTENSITY_PREFIX, self.label)
    }
}

/// How one spectrum file is to be quantified
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QuantMetadata {
    pub spectrum_file: String,
    pub mzfile: String,
    pub quan_method: String,
    pub error_ppm: f32,
}

impl QuantMetadata {
    /// Names of the required fields that are blank
    pub fn blank_fields(&self) -> Vec<&'static str> {
        [
            ("spectrum_file", &self.spectrum_file),
            ("mzfile", &self.mzfile),
            ("quan_method", &self.quan_method),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

/// Why quantification cannot proceed
#[derive(Clone, Debug, PartialEq)]
pub enum MetadataGap {
    /// Required metadata fields are blank
    Incomplete(Vec<String>),
    /// `Spectrum_File` values without a spectral file
    Unmatched(Vec<String>),
}

impl std::fmt::Display for MetadataGap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetadataGap::Incomplete(fields) => {
                write!(f, "quantification metadata is incomplete: {}", fields.join(", "))
            }
            MetadataGap::Unmatched(files) => write!(
                f,
                "The following Spectrum_Files have not mzML files: {}",
                files.join(", ")
            ),
        }
    }
}

/// Check that every `Spectrum_File` of `idents` has complete metadata, and
/// index the metadata by spectrum file.
pub fn check_metadata(
    idents: &Table,
    metadata: Vec<QuantMetadata>,
) -> Result<BTreeMap<String, QuantMetadata>, MetadataGap> {
    let mut blank = metadata
        .iter()
        .flat_map(|meta| {
            meta.blank_fields()
                .into_iter()
                .map(move |field| format!("{} ({})", field, meta.spectrum_file))
        })
        .collect::<Vec<_>>();
    if idents.has_column(SPECTRUM_FILE) && metadata.is_empty() {
        blank.push("no spectral files".into());
    }
    if !blank.is_empty() {
        return Err(MetadataGap::Incomplete(blank));
    }

    let mut by_file = BTreeMap::new();
    for meta in metadata {
        by_file.entry(meta.spectrum_file.clone()).or_insert(meta);
    }

    let spectrum_files = match idents.values(SPECTRUM_FILE) {
        Some(values) => values.collect::<BTreeSet<_>>(),
        None => return Err(MetadataGap::Incomplete(vec![SPECTRUM_FILE.to_string()])),
    };
    let unmatched = spectrum_files
        .into_iter()
        .filter(|file| !by_file.contains_key(*file))
        .map(String::from)
        .collect::<Vec<_>>();
    match unmatched.is_empty() {
        true => Ok(by_file),
        false => Err(MetadataGap::Unmatched(unmatched)),
    }
}

/// Parameters of one extraction task
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExtractParams {
    pub spectrum_file: String,
    pub mzfile: PathBuf,
    /// Scan numbers to quantify, ascending
    pub scans: Vec<u32>,
    pub ions: Vec<ReporterIon>,
    pub tolerance: Tolerance,
    /// MS level carrying the reporter ions
    pub ms_level: u8,
}

/// Distinct scan numbers of a spectrum-file partition, ascending
pub fn partition_scans(partition: &Table) -> Result<Vec<u32>, Error> {
    schema::EXTRACTION.check_input(partition)?;
    let mut scans = BTreeSet::new();
    for value in partition.values(FIRST_SCAN).into_iter().flatten() {
        scans.insert(parse_scan(value)?);
    }
    Ok(scans.into_iter().collect())
}

fn parse_scan(value: &str) -> Result<u32, Error> {
    let value = value.trim();
    value
        .parse::<u32>()
        .ok()
        .or_else(|| {
            // Some exports write integral scan numbers as floats
            value
                .parse::<f64>()
                .ok()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= u32::MAX as f64)
                .map(|f| f as u32)
        })
        .ok_or_else(|| Error::InvalidScan {
            column: FIRST_SCAN.into(),
            value: value.into(),
        })
}

/// Fan a partition out into extraction tasks of at most `scans_per_task`
/// scans each
pub fn split_params(
    meta: &QuantMetadata,
    scans: Vec<u32>,
    ions: &[ReporterIon],
    ms_level: u8,
    scans_per_task: usize,
) -> Vec<ExtractParams> {
    scans
        .chunks(scans_per_task.max(1))
        .map(|chunk| ExtractParams {
            spectrum_file: meta.spectrum_file.clone(),
            mzfile: PathBuf::from(&meta.mzfile),
            scans: chunk.to_vec(),
            ions: ions.to_vec(),
            tolerance: Tolerance::ppm(meta.error_ppm),
            ms_level,
        })
        .collect()
}

/// Header of the table produced by [`extract_reporter_ions`]
pub fn quant_headers(ions: &[ReporterIon]) -> Vec<String> {
    let mut headers = vec![SPECTRUM_FILE.to_string(), FIRST_SCAN.to_string()];
    headers.extend(ions.iter().map(ReporterIon::column));
    headers
}

/// Most intense peak within tolerance of every reporter ion, for every
/// requested scan found in `spectra`. Scans absent from `spectra` produce
/// no row; ions without a peak are reported as `0.0`.
pub fn extract_reporter_ions(spectra: &[Spectrum], params: &ExtractParams) -> Result<Table, Error> {
    let by_scan = spectra
        .iter()
        .filter(|s| s.ms_level == params.ms_level)
        .map(|s| (s.scan_number(), s))
        .collect::<FnvHashMap<_, _>>();

    let mut table = Table::new(quant_headers(&params.ions));
    let mut missing = 0usize;
    for scan in &params.scans {
        let spectrum = match by_scan.get(scan) {
            Some(s) => s,
            None => {
                missing += 1;
                continue;
            }
        };
        let mut row = Vec::with_capacity(params.ions.len() + 2);
        row.push(params.spectrum_file.clone());
        row.push(itoa::Buffer::new().format(*scan).to_string());
        for ion in &params.ions {
            let intensity = select_most_intense_peak(&spectrum.peaks, ion.mz, params.tolerance)
                .map(|peak| peak.intensity)
                .unwrap_or(0.0);
            row.push(ryu::Buffer::new().format(intensity).to_string());
        }
        table.push_row(row)?;
    }

    if missing > 0 {
        log::warn!(
            "{}: {} of {} scans not found at MS level {}",
            params.spectrum_file,
            missing,
            params.scans.len(),
            params.ms_level
        );
    }
    Ok(table)
}

/// Left join `quant` into `idents` on `FirstScan`. Identification rows keep
/// their order; rows without a quantified scan get empty cells, and
/// intensity columns already present in `idents` are overwritten.
pub fn merge_quantification(mut idents: Table, quant: Option<Table>) -> Result<Table, Error> {
    schema::MERGE.check_input(&idents)?;
    let quant = match quant {
        Some(quant) => quant,
        None => return Ok(idents),
    };
    schema::MERGE.check_input(&quant)?;

    let scan_col = quant.column(FIRST_SCAN).unwrap_or_default();
    let mut by_scan: FnvHashMap<u32, usize> = FnvHashMap::default();
    for (ix, row) in quant.rows().iter().enumerate() {
        by_scan.entry(parse_scan(&row[scan_col])?).or_insert(ix);
    }

    let matches = idents
        .values(FIRST_SCAN)
        .into_iter()
        .flatten()
        .map(|v| parse_scan(v).map(|scan| by_scan.get(&scan).copied()))
        .collect::<Result<Vec<_>, _>>()?;

    for (col, header) in quant.headers().iter().enumerate() {
        if header == SPECTRUM_FILE || header == FIRST_SCAN {
            continue;
        }
        let values = matches
            .iter()
            .map(|m| match m {
                Some(ix) => quant.rows()[*ix][col].clone(),
                None => String::new(),
            })
            .collect();
        idents.set_column(header, values)?;
    }
    Ok(idents)
}
