//! WISE flux to Vega magnitude conversion.
//!
//! The dataset stores fluxes in instrumental units. Each band is scaled to Jy
//! and compared against the band's zero-point flux:
//!
//! `mag = -2.5 * log10(flux * scale / zeropoint)`
//! `sigmag = (2.5 / ln 10) * (sigflux / flux)`

use std::f64::consts::LN_10;

/// Photometric band with its calibration constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    W1,
    W2,
}

impl Band {
    /// Instrumental flux to Jy.
    pub const fn flux_scale(self) -> f64 {
        match self {
            Band::W1 => 0.000_001_548_519_855_14,
            Band::W2 => 0.000_002_492_242_486_93,
        }
    }

    /// Zero-point flux in Jy.
    pub const fn zero_point(self) -> f64 {
        match self {
            Band::W1 => 309.54,
            Band::W2 => 171.787,
        }
    }

    pub fn magnitude(self, flux: f64) -> f64 {
        -2.5 * (flux * self.flux_scale() / self.zero_point()).log10()
    }
}

/// Magnitude uncertainty from the flux and its uncertainty.
pub fn magnitude_error(flux: f64, flux_error: f64) -> f64 {
    (2.5 / LN_10) * (flux_error / flux)
}

/// Element-wise magnitudes for a flux series.
pub fn magnitudes(band: Band, fluxes: &[f64]) -> Vec<f64> {
    fluxes.iter().map(|&f| band.magnitude(f)).collect()
}

/// Element-wise magnitude uncertainties. Series of different lengths are
/// truncated to the shorter one.
pub fn magnitude_errors(fluxes: &[f64], flux_errors: &[f64]) -> Vec<f64> {
    fluxes.iter().zip(flux_errors).map(|(&f, &e)| magnitude_error(f, e)).collect()
}
