use mzextractor_core::engine::SearchEngine;
use mzextractor_io::tsv::{read_ident_table, read_reporter_ions, write_table};
use mzextractor_io::Error;

const COMET: &str = "CometVersion 2019.01 rev. 5\t/data/run1.mzML\t06/09/2020\n\
scan\tnum\tcharge\texp_neutral_mass\tcalc_neutral_mass\txcorr\tplain_peptide\n\
41\t1\t2\t1000.5\t1000.49\t3.21\tPEPTIDE\n\
42\t1\t3\t1500.7\t1500.71\t2.05\tPEPTIDEK\n";

const MSFRAGGER: &str = "scannum\tprecursor_neutral_mass\tretention_time\tcharge\tpeptide\thyperscore\n\
7\t800.4\t12.5\t2\tPEPTIDE\t20.1\n";

#[test]
fn comet_header_on_second_line() -> Result<(), Error> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("run1.tsv");
    std::fs::write(&path, COMET)?;

    let table = read_ident_table(&path)?;
    assert_eq!(table.len(), 2);
    assert_eq!(table.headers()[0], "scan");
    assert_eq!(table.value(1, "plain_peptide"), Some("PEPTIDEK"));
    assert_eq!(SearchEngine::detect(&table), Some(SearchEngine::Comet));
    Ok(())
}

#[test]
fn msfragger_header_on_first_line() -> Result<(), Error> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("run2.tsv");
    std::fs::write(&path, MSFRAGGER)?;

    let table = read_ident_table(&path)?;
    assert_eq!(table.len(), 1);
    assert_eq!(SearchEngine::detect(&table), Some(SearchEngine::MsFragger));
    Ok(())
}

#[test]
fn written_tables_read_back() -> Result<(), Error> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("in.tsv");
    std::fs::write(&input, MSFRAGGER.replace('\n', "\r\n"))?;
    let table = read_ident_table(&input)?;

    let output = dir.path().join("out.tsv");
    write_table(&output, &table)?;
    let written = std::fs::read_to_string(&output)?;
    assert_eq!(written, MSFRAGGER);
    assert_eq!(read_ident_table(&output)?, table);
    Ok(())
}

#[test]
fn reporter_ion_table() -> Result<(), Error> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("ions.tsv");
    std::fs::write(
        &path,
        "label\tmz\tcomment\n126\t126.127726\tTMT\n127N\t127.124761\tTMT\n",
    )?;
    let ions = read_reporter_ions(&path)?;
    assert_eq!(ions.len(), 2);
    assert_eq!(ions[1].label, "127N");
    assert!((ions[1].mz - 127.124761).abs() < 1e-4);

    std::fs::write(&path, "label\tmz\n126\tnot-a-number\n")?;
    assert!(matches!(
        read_reporter_ions(&path),
        Err(Error::InvalidReporterIon { .. })
    ));

    std::fs::write(&path, "channel\tmass\n126\t126.1\n")?;
    assert!(matches!(read_reporter_ions(&path), Err(Error::Table(_))));
    Ok(())
}
