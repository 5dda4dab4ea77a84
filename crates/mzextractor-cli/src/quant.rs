//! The quantification backend used by [`crate::runner::Runner`]

use std::sync::Arc;

use anyhow::{ensure, Context};
use mzextractor_core::quant::{
    extract_reporter_ions, merge_quantification, partition_scans, split_params, ExtractParams,
    QuantMetadata,
};
use mzextractor_core::spectrum::Spectrum;
use mzextractor_core::table::Table;
use mzextractor_io::{tsv, util};

/// Extraction and merge of quantitative signal for one spectrum file.
///
/// Implementations are called from worker threads: every call gets its own
/// input and must not share mutable state with other calls.
pub trait QuantEngine: Sync {
    type Params: Send;

    /// Split the identifications of one spectrum file into extraction tasks
    fn prepare_params(&self, idents: &Table, meta: &QuantMetadata)
        -> anyhow::Result<Vec<Self::Params>>;

    /// Run one extraction task. The result must carry `Spectrum_File`.
    fn extract(&self, params: Self::Params) -> anyhow::Result<Table>;

    /// Join extracted values into the identifications of one spectrum file
    fn merge(&self, idents: Table, quant: Option<Table>) -> anyhow::Result<Table>;
}

/// One chunk of scans, and the spectra of the whole spectrum file
#[derive(Clone, Debug)]
pub struct ReporterIonTask {
    pub params: ExtractParams,
    pub spectra: Arc<Vec<Spectrum>>,
}

/// Reporter ion intensities read from mzML files. Each mzML file is parsed
/// once and shared by all of its extraction tasks.
#[derive(Copy, Clone, Debug)]
pub struct ReporterIonEngine {
    pub ms_level: u8,
    pub scans_per_task: usize,
}

impl QuantEngine for ReporterIonEngine {
    type Params = ReporterIonTask;

    fn prepare_params(
        &self,
        idents: &Table,
        meta: &QuantMetadata,
    ) -> anyhow::Result<Vec<ReporterIonTask>> {
        let ions = tsv::read_reporter_ions(&meta.quan_method)
            .with_context(|| format!("Failed to read reporter ions from `{}`", meta.quan_method))?;
        ensure!(
            !ions.is_empty(),
            "no reporter ions listed in `{}`",
            meta.quan_method
        );
        let scans = partition_scans(idents)
            .with_context(|| format!("Invalid identifications for `{}`", meta.spectrum_file))?;

        let mut spectra = util::read_mzml(&meta.mzfile, Some(self.ms_level))
            .with_context(|| format!("Failed to read spectra from `{}`", meta.mzfile))?;
        let n_spectra = spectra.len();
        spectra.retain(|s| scans.binary_search(&s.scan_number()).is_ok());
        log::trace!(
            "- {}: kept {} of {} spectra",
            meta.mzfile,
            spectra.len(),
            n_spectra
        );
        let spectra = Arc::new(spectra);

        let params = split_params(meta, scans, &ions, self.ms_level, self.scans_per_task);
        log::debug!(
            "{}: {} extraction tasks for {} reporter ions",
            meta.spectrum_file,
            params.len(),
            ions.len()
        );
        Ok(params
            .into_iter()
            .map(|params| ReporterIonTask {
                params,
                spectra: Arc::clone(&spectra),
            })
            .collect())
    }

    fn extract(&self, task: ReporterIonTask) -> anyhow::Result<Table> {
        let table = extract_reporter_ions(&task.spectra, &task.params)
            .with_context(|| format!("Failed to extract from `{}`", task.params.mzfile.display()))?;
        Ok(table)
    }

    fn merge(&self, idents: Table, quant: Option<Table>) -> anyhow::Result<Table> {
        Ok(merge_quantification(idents, quant)?)
    }
}
