use std::path::PathBuf;

use anyhow::{bail, ensure, Context};
use clap::ArgMatches;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Clone, Debug, PartialEq)]
/// Actual run parameters - may include overrides or default values not set by user
pub struct Settings {
    pub version: String,
    /// Glob matching the identification files
    pub ident_files: String,
    /// Glob matching the mzML files
    pub mzml_files: String,
    /// Table with the reporter ions to extract
    pub reporter_ions: PathBuf,
    pub ppm: f32,
    pub output_directory: PathBuf,
    pub n_workers: usize,
    pub fail_if_output_dir_exists: bool,
    /// Extension of output files whose spectrum file name has none
    pub default_extension: String,
    /// MS level carrying the reporter ions
    pub ms_level: u8,
    /// Maximum number of scans quantified by a single extraction task
    pub scans_per_task: usize,
}

#[derive(Deserialize, Default, Debug)]
#[serde(deny_unknown_fields)]
/// Run parameters deserialized from a JSON file and/or the command line
pub struct Input {
    ident_files: Option<String>,
    mzml_files: Option<String>,
    reporter_ions: Option<String>,
    ppm: Option<f32>,
    output_directory: Option<String>,
    n_workers: Option<usize>,
    fail_if_output_dir_exists: Option<bool>,
    default_extension: Option<String>,
    ms_level: Option<u8>,
    scans_per_task: Option<usize>,
}

impl Input {
    pub fn from_arguments(matches: &ArgMatches) -> anyhow::Result<Self> {
        let mut input = match matches.get_one::<String>("parameters") {
            Some(path) => Input::load(path)
                .with_context(|| format!("Failed to read parameters from `{path}`"))?,
            None => Input::default(),
        };

        // Command line values override the JSON configuration
        if let Some(ident_files) = matches.get_one::<String>("ident_files") {
            log::trace!("overriding `ident_files` parameter.");
            input.ident_files = Some(ident_files.clone());
        }
        if let Some(mzml_files) = matches.get_one::<String>("mzml_files") {
            log::trace!("overriding `mzml_files` parameter.");
            input.mzml_files = Some(mzml_files.clone());
        }
        if let Some(reporter_ions) = matches.get_one::<String>("reporter_ions") {
            log::trace!("overriding `reporter_ions` parameter.");
            input.reporter_ions = Some(reporter_ions.clone());
        }
        if let Some(ppm) = matches.get_one::<f32>("ppm").copied() {
            input.ppm = Some(ppm);
        }
        if let Some(output_directory) = matches.get_one::<String>("output_directory") {
            log::trace!("overriding `output_directory` parameter.");
            input.output_directory = Some(output_directory.clone());
        }
        if let Some(n_workers) = matches.get_one::<usize>("n_workers").copied() {
            input.n_workers = Some(n_workers);
        }
        if matches.get_flag("fail_if_exists") {
            input.fail_if_output_dir_exists = Some(true);
        }

        ensure!(
            input.ident_files.is_some(),
            "`ident_files` must be set. For more information try '--help'"
        );
        ensure!(
            input.mzml_files.is_some(),
            "`mzml_files` must be set. For more information try '--help'"
        );
        ensure!(
            input.reporter_ions.is_some(),
            "`reporter_ions` must be set. For more information try '--help'"
        );
        ensure!(
            input.output_directory.is_some(),
            "`output_directory` must be set. For more information try '--help'"
        );

        Ok(input)
    }

    pub fn load<S: AsRef<str>>(path: S) -> anyhow::Result<Self> {
        mzextractor_io::util::read_json(path.as_ref()).map_err(anyhow::Error::from)
    }

    pub fn build(self) -> anyhow::Result<Settings> {
        let ident_files = self
            .ident_files
            .context("`ident_files` must be provided")?;
        let mzml_files = self.mzml_files.context("`mzml_files` must be provided")?;
        let reporter_ions = self
            .reporter_ions
            .context("`reporter_ions` must be provided")?;
        let output_directory = PathBuf::from(
            self.output_directory
                .context("`output_directory` must be provided")?,
        );

        let ppm = self.ppm.unwrap_or(10.0);
        ensure!(
            ppm.is_finite() && ppm > 0.0,
            "`ppm` must be a positive number, got {}",
            ppm
        );
        if ppm > 50.0 {
            log::warn!("ppm tolerance of {} is higher than expected", ppm);
        }

        let n_workers = self.n_workers.unwrap_or(2);
        ensure!(n_workers >= 1, "`n_workers` must be at least 1");
        if n_workers > num_cpus::get() {
            log::warn!(
                "{} workers requested, but only {} CPUs are available",
                n_workers,
                num_cpus::get()
            );
        }

        let scans_per_task = self.scans_per_task.unwrap_or(5000);
        ensure!(scans_per_task >= 1, "`scans_per_task` must be at least 1");

        let default_extension = match self.default_extension {
            Some(ext) if ext.is_empty() => bail!("`default_extension` must not be empty"),
            Some(ext) if ext.starts_with('.') => ext,
            Some(ext) => format!(".{ext}"),
            None => ".tsv".into(),
        };

        let fail_if_output_dir_exists = self.fail_if_output_dir_exists.unwrap_or(false);
        if output_directory.exists() {
            ensure!(
                !fail_if_output_dir_exists,
                "output directory `{}` already exists",
                output_directory.display()
            );
            log::warn!(
                "output directory `{}` already exists, files in it may be replaced",
                output_directory.display()
            );
        }

        Ok(Settings {
            version: clap::crate_version!().into(),
            ident_files,
            mzml_files,
            reporter_ions: reporter_ions.into(),
            ppm,
            output_directory,
            n_workers,
            fail_if_output_dir_exists,
            default_extension,
            ms_level: self.ms_level.unwrap_or(2),
            scans_per_task,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn input(outdir: &std::path::Path) -> Input {
        Input {
            ident_files: Some("ids/*.tsv".into()),
            mzml_files: Some("raw/*.mzML".into()),
            reporter_ions: Some("ions.tsv".into()),
            output_directory: Some(outdir.display().to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn defaults() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let settings = input(&dir.path().join("out")).build()?;
        assert_eq!(settings.ppm, 10.0);
        assert_eq!(settings.n_workers, 2);
        assert_eq!(settings.default_extension, ".tsv");
        assert_eq!(settings.ms_level, 2);
        assert!(!settings.fail_if_output_dir_exists);
        Ok(())
    }

    #[test]
    fn validation() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let out = dir.path().join("out");

        let mut bad = input(&out);
        bad.n_workers = Some(0);
        assert!(bad.build().is_err());

        let mut bad = input(&out);
        bad.ppm = Some(-1.0);
        assert!(bad.build().is_err());

        let mut ext = input(&out);
        ext.default_extension = Some("txt".into());
        assert_eq!(ext.build()?.default_extension, ".txt");

        let mut missing = input(&out);
        missing.mzml_files = None;
        assert!(missing.build().is_err());
        Ok(())
    }

    #[test]
    fn existing_output_directory() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        assert!(input(dir.path()).build().is_ok());

        let mut strict = input(dir.path());
        strict.fail_if_output_dir_exists = Some(true);
        let err = strict.build().unwrap_err();
        assert!(err.to_string().contains("already exists"));
        Ok(())
    }

    #[test]
    fn json_parameters() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("params.json");
        std::fs::write(
            &path,
            r#"{"ident_files": "a/*.tsv", "mzml_files": "b/*.mzML", "reporter_ions": "ions.tsv",
                "output_directory": "out", "ppm": 20, "n_workers": 4}"#,
        )?;
        let input = Input::load(path.display().to_string())?;
        assert_eq!(input.ppm, Some(20.0));
        assert_eq!(input.n_workers, Some(4));

        std::fs::write(&path, r#"{"unknown": 1}"#)?;
        assert!(Input::load(path.display().to_string()).is_err());
        Ok(())
    }
}
