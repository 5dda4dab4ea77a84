use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, ensure, Context};
use log::info;
use mzextractor_core::engine::SearchEngine;
use mzextractor_core::pairing::{match_files, PairingRecord};
use mzextractor_core::quant::{check_metadata, MetadataGap, QuantMetadata};
use mzextractor_core::schema;
use mzextractor_core::table::Table;
use mzextractor_core::SPECTRUM_FILE;
use mzextractor_io::tsv;
use rayon::prelude::*;
use serde::Serialize;

use crate::input::Settings;
use crate::output::{self, ExperimentWriter};
use crate::quant::{QuantEngine, ReporterIonEngine};

/// Outcome of the quantification stages
#[derive(Debug)]
pub enum Quantification {
    Applied(Table),
    /// Quantification metadata did not cover the identifications; the table
    /// is passed on as it came out of preprocessing
    Skipped { table: Table, reason: MetadataGap },
}

impl Quantification {
    pub fn is_applied(&self) -> bool {
        matches!(self, Quantification::Applied(_))
    }

    pub fn into_table(self) -> Table {
        match self {
            Quantification::Applied(table) => table,
            Quantification::Skipped { table, .. } => table,
        }
    }
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct RunSummary {
    pub files_written: Vec<PathBuf>,
    pub quantified: bool,
    pub rows: usize,
}

/// Run every task of one stage on a fresh pool of `n_workers` threads and
/// wait for all of them. The first failing task fails the stage.
pub fn par_stage<T, R, F>(stage: &str, n_workers: usize, tasks: Vec<T>, f: F) -> anyhow::Result<Vec<R>>
where
    T: Send,
    R: Send,
    F: Fn(T) -> anyhow::Result<R> + Sync + Send,
{
    let start = Instant::now();
    let n_tasks = tasks.len();
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(n_workers)
        .build()
        .with_context(|| format!("Failed to start {} workers", n_workers))?;

    info!("- {}: {} tasks on {} workers", stage, n_tasks, n_workers);
    let results = pool
        .install(|| tasks.into_par_iter().map(&f).collect::<anyhow::Result<Vec<R>>>())
        .with_context(|| format!("{} stage failed", stage))?;

    let duration = Instant::now().duration_since(start).as_millis();
    info!("- {}: {:8} ms", stage, duration);
    Ok(results)
}

fn glob_paths(pattern: &str) -> anyhow::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in glob::glob(pattern).with_context(|| format!("Invalid glob pattern `{}`", pattern))? {
        paths.push(entry?);
    }
    paths.sort();
    Ok(paths)
}

/// Stage A task: read and normalize one identification file
pub fn preprocess(record: &PairingRecord) -> anyhow::Result<(Table, QuantMetadata)> {
    let table = tsv::read_ident_table(&record.ident_file)
        .with_context(|| format!("Failed to read `{}`", record.ident_file.display()))?;

    let engine = match SearchEngine::detect(&table) {
        Some(engine) => engine,
        None => bail!(
            "{}: unrecognized search engine",
            record.ident_file.display()
        ),
    };
    log::debug!("{}: {} results", record.key, engine);

    let mut table = engine
        .preprocess(table)
        .with_context(|| format!("Failed to normalize `{}`", record.ident_file.display()))?;
    if !table.has_column(SPECTRUM_FILE) {
        let key = record.key.clone();
        table.push_column(SPECTRUM_FILE, |_| key.clone());
    }
    schema::NORMALIZED.check_output(&table)?;

    let meta = QuantMetadata {
        spectrum_file: record.key.clone(),
        mzfile: record.mzfile.display().to_string(),
        quan_method: record.quan_method.display().to_string(),
        error_ppm: record.ppm,
    };
    Ok((table, meta))
}

pub struct Runner<E: QuantEngine> {
    settings: Settings,
    engine: E,
    writer: ExperimentWriter,
    start: Instant,
}

impl Runner<ReporterIonEngine> {
    pub fn with_reporter_ions(settings: Settings) -> Self {
        let engine = ReporterIonEngine {
            ms_level: settings.ms_level,
            scans_per_task: settings.scans_per_task,
        };
        Runner::new(settings, engine)
    }
}

impl<E: QuantEngine> Runner<E> {
    pub fn new(settings: Settings, engine: E) -> Self {
        let writer = ExperimentWriter::new(
            settings.output_directory.clone(),
            settings.default_extension.clone(),
        );
        Self {
            settings,
            engine,
            writer,
            start: Instant::now(),
        }
    }

    /// Glob both file sets and join them by file key
    pub fn pair_files(&self) -> anyhow::Result<Vec<PairingRecord>> {
        let ident_files = glob_paths(&self.settings.ident_files)?;
        ensure!(
            !ident_files.is_empty(),
            "no identification files match `{}`",
            self.settings.ident_files
        );
        let mzml_files = glob_paths(&self.settings.mzml_files)?;
        info!(
            "found {} identification files and {} mzML files",
            ident_files.len(),
            mzml_files.len()
        );

        let records = match_files(ident_files, mzml_files)
            .into_records(self.settings.reporter_ions.clone(), self.settings.ppm)?;
        for record in &records {
            log::debug!(
                "{}: {} <-> {}",
                record.key,
                record.ident_file.display(),
                record.mzfile.display()
            );
        }
        Ok(records)
    }

    /// Stages B, C and D, behind the metadata gate
    pub fn add_quantification(
        &self,
        idents: Table,
        metadata: Vec<QuantMetadata>,
    ) -> anyhow::Result<Quantification> {
        let by_file = match check_metadata(&idents, metadata) {
            Ok(by_file) => by_file,
            Err(reason) => {
                log::error!("{}", reason);
                log::error!("identifications will be written without quantification");
                return Ok(Quantification::Skipped {
                    table: idents,
                    reason,
                });
            }
        };

        let engine = &self.engine;
        let n_workers = self.settings.n_workers;
        let partitions = idents.partition_by(SPECTRUM_FILE)?;

        let mut tasks = Vec::with_capacity(partitions.len());
        for (key, partition) in &partitions {
            let meta = by_file
                .get(key)
                .with_context(|| format!("no quantification metadata for `{}`", key))?;
            tasks.push((partition, meta));
        }
        let params = par_stage("prepare", n_workers, tasks, |(partition, meta)| {
            engine.prepare_params(partition, meta)
        })?
        .into_iter()
        .flatten()
        .collect::<Vec<_>>();

        let extracted = par_stage("extract", n_workers, params, |params| engine.extract(params))?;
        let mut quant = match extracted.is_empty() {
            true => Default::default(),
            false => {
                let extracted = Table::concat(extracted);
                schema::EXTRACTION.check_output(&extracted)?;
                extracted.partition_by(SPECTRUM_FILE)?
            }
        };

        let tasks = partitions
            .into_iter()
            .map(|(key, partition)| {
                let q = quant.remove(&key);
                (partition, q)
            })
            .collect::<Vec<_>>();
        for key in quant.keys() {
            log::warn!("{}: extracted values without identifications", key);
        }
        let merged = par_stage("merge", n_workers, tasks, |(partition, q)| {
            engine.merge(partition, q)
        })?;

        Ok(Quantification::Applied(Table::concat(merged)))
    }

    /// Write one file per spectrum file. Temporary files are renamed only
    /// once every partition has been written.
    pub fn write_experiments(&self, table: Table) -> anyhow::Result<Vec<PathBuf>> {
        let partitions = table
            .partition_by(SPECTRUM_FILE)?
            .into_iter()
            .collect::<Vec<_>>();
        if partitions.is_empty() {
            log::warn!("no identifications to write");
        }

        let mut outputs = BTreeSet::new();
        for (key, _) in &partitions {
            let path = self.writer.output_path(key);
            ensure!(
                outputs.insert(path.clone()),
                "more than one spectrum file would be written to `{}`",
                path.display()
            );
        }

        let output_directory = &self.settings.output_directory;
        std::fs::create_dir_all(output_directory).with_context(|| {
            format!("Failed to create `{}`", output_directory.display())
        })?;

        let writer = &self.writer;
        let tmps = par_stage("write", self.settings.n_workers, partitions, |(key, partition)| {
            writer.write_tmp(&key, &partition)
        })?;

        let mut written = Vec::with_capacity(tmps.len());
        for tmp in tmps {
            let path = output::finalize(&tmp)?;
            info!("wrote {}", path.display());
            written.push(path);
        }
        Ok(written)
    }

    pub fn run(self) -> anyhow::Result<RunSummary> {
        let records = self.pair_files()?;
        let n_files = records.len();

        let preprocessed = par_stage("preprocess", self.settings.n_workers, records, |record| {
            preprocess(&record)
        })?;
        let (tables, metadata): (Vec<_>, Vec<_>) = preprocessed.into_iter().unzip();
        let idents = Table::concat(tables);
        info!("{} identifications from {} files", idents.len(), n_files);

        let quant = self.add_quantification(idents, metadata)?;
        let quantified = quant.is_applied();
        let table = quant.into_table();
        let rows = table.len();

        let files_written = self.write_experiments(table)?;

        let run_time = (Instant::now() - self.start).as_secs();
        info!("finished in {}s", run_time);
        Ok(RunSummary {
            files_written,
            quantified,
            rows,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn stage_collects_all_results() -> anyhow::Result<()> {
        let mut squares = par_stage("square", 3, (0..100u64).collect(), |x| Ok(x * x))?;
        squares.sort_unstable();
        assert_eq!(squares.len(), 100);
        assert_eq!(squares[99], 99 * 99);
        Ok(())
    }

    #[test]
    fn stage_fails_fast() {
        let result = par_stage("odd", 2, (0..10u32).collect(), |x| {
            ensure!(x != 7, "task {} failed", x);
            Ok(x)
        });
        let err = result.unwrap_err();
        assert!(format!("{:#}", err).contains("task 7 failed"));
    }
}
