use std::path::PathBuf;

use clap::{value_parser, Arg, ArgAction, Command, ValueHint};
use env_logger::Target;
use mzextractor_cli::logging::LogSettings;
use mzextractor_cli::scanid::{add_scan_ids, parse_ids};

fn main() -> anyhow::Result<()> {
    let matches = Command::new("add-scanid")
        .version(clap::crate_version!())
        .about("Add a unique ScanID column to a search engine result table")
        .after_help(
            "ScanID = Spectrum_File-<id column 1>-<id column 2>...\n\
             Example: add-scanid -i run1.tsv -d \"scannum, charge\"",
        )
        .arg(
            Arg::new("infile")
                .short('i')
                .long("infile")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("Path to the input file")
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("ids")
                .short('d')
                .long("ids")
                .required(true)
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help("Comma separated list of the columns that build the ScanID"),
        )
        .arg(
            Arg::new("outdir")
                .short('o')
                .long("outdir")
                .value_parser(value_parser!(PathBuf))
                .help("Output directory [default: add_scanid beside the input file]")
                .value_hint(ValueHint::DirPath),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Increase output verbosity"),
        )
        .get_matches();

    LogSettings::new("add_scanid", matches.get_flag("verbose"), Target::Stderr).init();
    log::info!("start script");

    let infile = matches
        .get_one::<PathBuf>("infile")
        .cloned()
        .unwrap_or_default();
    let ids = matches
        .get_one::<String>("ids")
        .map(|ids| parse_ids(ids))
        .unwrap_or_default();
    let outdir = matches.get_one::<PathBuf>("outdir").cloned();

    match add_scan_ids(&infile, &ids, outdir) {
        Ok(_) => {
            log::info!("end script");
            Ok(())
        }
        Err(err) => {
            log::error!("{:#}", err);
            Err(err)
        }
    }
}
