use serde::{Deserialize, Serialize};

/// Mass window around a theoretical m/z, as signed ppm offsets
#[derive(Copy, Clone, Serialize, Deserialize, Debug, PartialEq, PartialOrd)]
#[serde(rename_all = "lowercase")]
pub enum Tolerance {
    Ppm(f32, f32),
}

impl Tolerance {
    /// Symmetric window of `ppm` parts-per-million
    pub fn ppm(ppm: f32) -> Self {
        let ppm = ppm.abs();
        Tolerance::Ppm(-ppm, ppm)
    }

    /// Lowest and highest m/z accepted around `center`
    pub fn bounds(&self, center: f32) -> (f32, f32) {
        match self {
            Tolerance::Ppm(lo, hi) => (
                center + center * lo / 1_000_000.0,
                center + center * hi / 1_000_000.0,
            ),
        }
    }

    pub fn contains(&self, center: f32, rhs: f32) -> bool {
        let (lo, hi) = self.bounds(center);
        rhs >= lo && rhs <= hi
    }
}
