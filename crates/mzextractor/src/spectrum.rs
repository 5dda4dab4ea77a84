use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::mass::Tolerance;

/// A centroided peak
#[derive(PartialEq, PartialOrd, Copy, Clone, Default, Debug, Serialize)]
pub struct Peak {
    pub mz: f32,
    pub intensity: f32,
}

#[derive(Default, Debug, Clone)]
pub struct Spectrum {
    pub ms_level: u8,
    /// Native spectrum id, e.g. `controllerType=0 controllerNumber=1 scan=42`
    pub id: String,
    /// Zero-based position of the spectrum in its file
    pub index: usize,
    /// Peaks, in the order they were stored
    pub peaks: Vec<Peak>,
}

impl Spectrum {
    /// Scan number taken from the native id (`scan=N`), falling back to the
    /// one-based position of the spectrum in the file
    pub fn scan_number(&self) -> u32 {
        scan_number(&self.id).unwrap_or(self.index as u32 + 1)
    }
}

pub fn scan_number(native_id: &str) -> Option<u32> {
    static SCAN: OnceLock<Regex> = OnceLock::new();
    let re = SCAN.get_or_init(|| Regex::new(r"(?:^|\s)scan=(\d+)").expect("valid regex"));
    re.captures(native_id)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Most intense peak whose m/z falls within `tolerance` of `mz`. Ties go to
/// the later peak.
pub fn select_most_intense_peak(peaks: &[Peak], mz: f32, tolerance: Tolerance) -> Option<&Peak> {
    peaks
        .iter()
        .filter(|peak| tolerance.contains(mz, peak.mz))
        .fold(None, |best: Option<&Peak>, peak| match best {
            Some(b) if b.intensity > peak.intensity => Some(b),
            _ => Some(peak),
        })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn native_ids() {
        assert_eq!(scan_number("controllerType=0 controllerNumber=1 scan=2442"), Some(2442));
        assert_eq!(scan_number("scan=7"), Some(7));
        assert_eq!(scan_number("spectrum=2442"), None);
        assert_eq!(scan_number("index=3 subscan=4"), None);

        let spectrum = Spectrum {
            id: "spectrum=9".into(),
            index: 4,
            ..Default::default()
        };
        assert_eq!(spectrum.scan_number(), 5);
    }

    #[test]
    fn most_intense() {
        let peaks = [
            Peak { mz: 126.1270, intensity: 10.0 },
            Peak { mz: 126.1277, intensity: 30.0 },
            Peak { mz: 126.1284, intensity: 20.0 },
            Peak { mz: 127.1248, intensity: 50.0 },
        ];
        let best = select_most_intense_peak(&peaks, 126.127726, Tolerance::ppm(10.0));
        assert_eq!(best.map(|p| p.intensity), Some(30.0));
        assert!(select_most_intense_peak(&peaks, 128.128116, Tolerance::ppm(10.0)).is_none());
    }
}
