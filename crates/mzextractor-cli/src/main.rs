use clap::{value_parser, Arg, ArgAction, Command, ValueHint};
use env_logger::Target;
use mzextractor_cli::input::Input;
use mzextractor_cli::logging::LogSettings;
use mzextractor_cli::runner::Runner;

fn main() -> anyhow::Result<()> {
    let matches = Command::new("mz-extractor")
        .version(clap::crate_version!())
        .about("Add reporter ion intensities from mzML files into identification tables")
        .arg(
            Arg::new("ident_files")
                .short('i')
                .long("ident_files")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help("Glob matching the identification files (Comet, MSFragger or PD)")
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("mzml_files")
                .short('z')
                .long("mzml_files")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help("Glob matching the mzML files")
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("reporter_ions")
                .short('r')
                .long("reporter_ions")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help("Tab-separated table of reporter ions (`label` and `mz` columns)")
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("ppm")
                .short('p')
                .long("ppm")
                .value_parser(value_parser!(f32))
                .help("Mass tolerance in ppm [default: 10]"),
        )
        .arg(
            Arg::new("output_directory")
                .short('o')
                .long("outdir")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help("Directory where the quantified tables will be written")
                .value_hint(ValueHint::DirPath),
        )
        .arg(
            Arg::new("n_workers")
                .short('w')
                .long("n_workers")
                .value_parser(clap::builder::RangedU64ValueParser::<usize>::new().range(1..))
                .help("Number of parallel workers [default: 2]"),
        )
        .arg(
            Arg::new("parameters")
                .long("parameters")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help("Path to configuration parameters (JSON file). Command line flags take precedence")
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("fail_if_exists")
                .long("fail-if-exists")
                .action(ArgAction::SetTrue)
                .help("Fail if the output directory already exists"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Increase output verbosity"),
        )
        .get_matches();

    LogSettings::new("mz_extractor", matches.get_flag("verbose"), Target::Stderr).init();
    log::info!("start script");

    let settings = Input::from_arguments(&matches)?.build()?;
    log::debug!("{}", serde_json::to_string_pretty(&settings)?);

    match Runner::with_reporter_ions(settings).run() {
        Ok(summary) => {
            log::info!(
                "{} files written, {} rows, quantified: {}",
                summary.files_written.len(),
                summary.rows,
                summary.quantified
            );
            log::info!("end script");
            Ok(())
        }
        Err(err) => {
            log::error!("{:#}", err);
            Err(err)
        }
    }
}
