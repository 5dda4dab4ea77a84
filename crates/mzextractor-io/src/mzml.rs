//! Minimal mzML reader: spectrum ids, MS level and the m/z and intensity
//! arrays. Everything else in the document is skipped.

use std::io::{BufRead, Read};

use base64::Engine;
use flate2::read::ZlibDecoder;
use mzextractor_core::spectrum::{Peak, Spectrum};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

const ZLIB_COMPRESSION: &[u8] = b"MS:1000574";
const NO_COMPRESSION: &[u8] = b"MS:1000576";
const INTENSITY_ARRAY: &[u8] = b"MS:1000515";
const MZ_ARRAY: &[u8] = b"MS:1000514";
const FLOAT_64: &[u8] = b"MS:1000523";
const FLOAT_32: &[u8] = b"MS:1000521";

const MS_LEVEL: &[u8] = b"MS:1000511";

/// Element of a `<spectrum>` we are currently inside
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Section {
    Spectrum,
    Array,
    Binary,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ArrayKind {
    Mz,
    Intensity,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
enum Width {
    F32,
    #[default]
    F64,
}

/// How the current `<binaryDataArray>` is stored, from its cvParams
#[derive(Copy, Clone, Debug, Default)]
struct ArrayEncoding {
    zlib: bool,
    width: Width,
    kind: Option<ArrayKind>,
}

impl ArrayEncoding {
    fn set(&mut self, accession: &[u8]) {
        match accession {
            ZLIB_COMPRESSION => self.zlib = true,
            NO_COMPRESSION => self.zlib = false,
            FLOAT_64 => self.width = Width::F64,
            FLOAT_32 => self.width = Width::F32,
            MZ_ARRAY => self.kind = Some(ArrayKind::Mz),
            INTENSITY_ARRAY => self.kind = Some(ArrayKind::Intensity),
            _ => {}
        }
    }

    fn decode(&self, encoded: &str) -> Result<Vec<f32>, MzMLError> {
        let raw = base64::engine::general_purpose::STANDARD.decode(encoded)?;
        let bytes = match self.zlib {
            true => {
                let mut inflated = Vec::with_capacity(raw.len() * 4);
                ZlibDecoder::new(raw.as_slice()).read_to_end(&mut inflated)?;
                inflated
            }
            false => raw,
        };
        let values = match self.width {
            Width::F32 => bytes
                .chunks_exact(4)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
            Width::F64 => bytes
                .chunks_exact(8)
                .map(|c| {
                    let mut word = [0u8; 8];
                    word.copy_from_slice(c);
                    f64::from_le_bytes(word) as f32
                })
                .collect(),
        };
        Ok(values)
    }
}

/// Spectrum whose closing tag has not been seen yet
#[derive(Default)]
struct Pending {
    spectrum: Spectrum,
    mz: Vec<f32>,
    intensity: Vec<f32>,
}

impl Pending {
    fn finish(self) -> Spectrum {
        let Pending {
            mut spectrum,
            mz,
            intensity,
        } = self;
        if mz.len() != intensity.len() {
            log::warn!(
                "spectrum {}: {} m/z values but {} intensities",
                spectrum.id,
                mz.len(),
                intensity.len()
            );
        }
        spectrum.peaks = mz
            .into_iter()
            .zip(intensity)
            .map(|(mz, intensity)| Peak { mz, intensity })
            .collect();
        spectrum
    }
}

fn attribute(ev: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>, MzMLError> {
    match ev.try_get_attribute(key)? {
        Some(attr) => Ok(Some(std::str::from_utf8(&attr.value)?.to_string())),
        None => Ok(None),
    }
}

fn required(ev: &BytesStart<'_>, key: &[u8]) -> Result<String, MzMLError> {
    attribute(ev, key)?.ok_or(MzMLError::Malformed)
}

#[derive(Default)]
pub struct MzMLReader {
    ms_level: Option<u8>,
}

impl MzMLReader {
    /// Reader that only decodes and returns spectra of `ms_level`
    pub fn with_level_filter(ms_level: u8) -> Self {
        Self {
            ms_level: Some(ms_level),
        }
    }

    fn wanted(&self, ms_level: u8) -> bool {
        self.ms_level.map(|level| level == ms_level).unwrap_or(true)
    }

    pub fn parse<B: BufRead>(&self, b: B) -> Result<Vec<Spectrum>, MzMLError> {
        let mut reader = Reader::from_reader(b);
        let mut buf = Vec::new();

        let mut section = None;
        let mut encoding = ArrayEncoding::default();
        let mut pending = Pending::default();
        let mut ordinal = 0usize;
        let mut spectra = Vec::new();

        loop {
            let event = reader.read_event_into(&mut buf).map_err(|err| {
                log::error!(
                    "XML error while parsing mzML at byte {}: {}",
                    reader.buffer_position(),
                    err
                );
                MzMLError::from(err)
            });
            match event? {
                Event::Start(ev) => {
                    section = match (ev.name().as_ref(), section) {
                        (b"spectrum", _) => {
                            pending = Pending::default();
                            pending.spectrum.id = required(&ev, b"id")?;
                            pending.spectrum.index = match attribute(&ev, b"index")? {
                                Some(index) => index.parse()?,
                                None => ordinal,
                            };
                            ordinal += 1;
                            Some(Section::Spectrum)
                        }
                        (b"binaryDataArray", Some(Section::Spectrum)) => {
                            encoding = ArrayEncoding::default();
                            Some(Section::Array)
                        }
                        (b"binary", Some(Section::Array)) => Some(Section::Binary),
                        _ => section,
                    };
                }
                Event::Empty(ev) if ev.name().as_ref() == b"cvParam" => {
                    let accession = required(&ev, b"accession")?;
                    match (section, accession.as_bytes()) {
                        (Some(Section::Array), accession) => encoding.set(accession),
                        (Some(Section::Spectrum), MS_LEVEL) => {
                            pending.spectrum.ms_level = required(&ev, b"value")?.parse()?
                        }
                        _ => {}
                    }
                }
                // Arrays of filtered spectra are never decoded
                Event::Text(text)
                    if section == Some(Section::Binary) && self.wanted(pending.spectrum.ms_level) =>
                {
                    let encoded = text.unescape()?;
                    let encoded = encoded.trim();
                    match encoding.kind {
                        Some(_) if encoded.is_empty() => {}
                        Some(ArrayKind::Mz) => pending.mz = encoding.decode(encoded)?,
                        Some(ArrayKind::Intensity) => pending.intensity = encoding.decode(encoded)?,
                        None => {}
                    }
                }
                Event::End(ev) => {
                    section = match (ev.name().as_ref(), section) {
                        (b"binary", Some(Section::Binary)) => Some(Section::Array),
                        (b"binaryDataArray", Some(Section::Array)) => Some(Section::Spectrum),
                        (b"spectrum", _) => {
                            let done = std::mem::take(&mut pending);
                            if self.wanted(done.spectrum.ms_level) {
                                spectra.push(done.finish());
                            }
                            None
                        }
                        _ => section,
                    };
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }
        Ok(spectra)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum MzMLError {
    #[error("malformed mzML")]
    Malformed,
    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("XML attribute error: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("utf8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("error parsing float: {0}")]
    Float(#[from] std::num::ParseFloatError),
    #[error("error parsing int: {0}")]
    Int(#[from] std::num::ParseIntError),
    #[error("error decoding base64: {0}")]
    Base64(#[from] base64::DecodeError),
}

#[cfg(test)]
mod test {
    use super::{MzMLError, MzMLReader};

    const SPECTRA: &str = r#"<?xml version="1.0" encoding="utf-8"?>
    <mzML>
      <run id="run1">
        <spectrumList count="2">
          <spectrum id="controllerType=0 controllerNumber=1 scan=41" index="0" defaultArrayLength="2">
            <cvParam cvRef="MS" accession="MS:1000511" name="ms level" value="1" />
            <cvParam cvRef="MS" accession="MS:1000128" name="profile spectrum" />
            <binaryDataArrayList count="2">
              <binaryDataArray encodedLength="24">
                <cvParam cvRef="MS" accession="MS:1000514" name="m/z array" />
                <cvParam cvRef="MS" accession="MS:1000523" name="64-bit float" />
                <cvParam cvRef="MS" accession="MS:1000576" name="no compression" />
                <binary>AAAAAAAAWUAAAAAAAABpQA==</binary>
              </binaryDataArray>
              <binaryDataArray encodedLength="12">
                <cvParam cvRef="MS" accession="MS:1000515" name="intensity array" />
                <cvParam cvRef="MS" accession="MS:1000521" name="32-bit float" />
                <cvParam cvRef="MS" accession="MS:1000576" name="no compression" />
                <binary>AACAPwAAAEA=</binary>
              </binaryDataArray>
            </binaryDataArrayList>
          </spectrum>
          <spectrum id="controllerType=0 controllerNumber=1 scan=42" index="1" defaultArrayLength="2">
            <cvParam cvRef="MS" accession="MS:1000127" name="centroid spectrum" />
            <cvParam cvRef="MS" accession="MS:1000511" name="ms level" value="2" />
            <scanList count="1">
              <scan>
                <cvParam cvRef="MS" accession="MS:1000016" name="scan start time" value="12.5" />
              </scan>
            </scanList>
            <binaryDataArrayList count="2">
              <binaryDataArray encodedLength="24">
                <cvParam cvRef="MS" accession="MS:1000514" name="m/z array" />
                <cvParam cvRef="MS" accession="MS:1000523" name="64-bit float" />
                <cvParam cvRef="MS" accession="MS:1000576" name="no compression" />
                <binary>AAAAAAAAWUAAAAAAAABpQA==</binary>
              </binaryDataArray>
              <binaryDataArray encodedLength="12">
                <cvParam cvRef="MS" accession="MS:1000515" name="intensity array" />
                <cvParam cvRef="MS" accession="MS:1000521" name="32-bit float" />
                <cvParam cvRef="MS" accession="MS:1000576" name="no compression" />
                <binary>AACAPwAAAEA=</binary>
              </binaryDataArray>
            </binaryDataArrayList>
          </spectrum>
        </spectrumList>
      </run>
    </mzML>
    "#;

    #[test]
    fn parse_all_levels() -> Result<(), MzMLError> {
        let spectra = MzMLReader::default().parse(SPECTRA.as_bytes())?;
        assert_eq!(spectra.len(), 2);
        assert_eq!(spectra[0].ms_level, 1);
        assert_eq!(spectra[1].scan_number(), 42);
        assert_eq!(spectra[1].index, 1);
        Ok(())
    }

    #[test]
    fn level_filter_and_arrays() -> Result<(), MzMLError> {
        let spectra = MzMLReader::with_level_filter(2).parse(SPECTRA.as_bytes())?;
        assert_eq!(spectra.len(), 1);
        let peaks = &spectra[0].peaks;
        assert_eq!(peaks.len(), 2);
        assert_eq!((peaks[0].mz, peaks[0].intensity), (100.0, 1.0));
        assert_eq!((peaks[1].mz, peaks[1].intensity), (200.0, 2.0));
        Ok(())
    }

    #[test]
    fn zlib_arrays() -> Result<(), MzMLError> {
        use std::io::Write;

        use base64::Engine;
        use flate2::write::ZlibEncoder;

        let mut encoder = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        for mz in [126.127726f64, 127.124761] {
            encoder.write_all(&mz.to_le_bytes())?;
        }
        let mz = base64::engine::general_purpose::STANDARD.encode(encoder.finish()?);

        let doc = SPECTRA
            .replacen("MS:1000576", "MS:1000574", 1)
            .replacen("AAAAAAAAWUAAAAAAAABpQA==", &mz, 1);
        let spectra = MzMLReader::default().parse(doc.as_bytes())?;
        assert!((spectra[0].peaks[0].mz - 126.127726).abs() < 1e-4);
        assert!((spectra[0].peaks[1].mz - 127.124761).abs() < 1e-4);
        // The second spectrum is untouched
        assert_eq!(spectra[1].peaks[0].mz, 100.0);
        Ok(())
    }

    #[test]
    fn malformed_documents() {
        let truncated = "<mzML><spectrum id=\"scan=1\"></binary></mzML>";
        assert!(MzMLReader::default().parse(truncated.as_bytes()).is_err());

        let no_id = "<mzML><spectrum index=\"0\"></spectrum></mzML>";
        assert!(matches!(
            MzMLReader::default().parse(no_id.as_bytes()),
            Err(MzMLError::Malformed)
        ));
    }
}
