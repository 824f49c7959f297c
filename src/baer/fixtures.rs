//! Shared tables and pixels for unit tests

use crate::auxdata::AuxCoefficients;
use crate::baer::model::{h2_term, reflectance_from_aot};
use crate::pixel::{PixelContext, PixelInput};
use crate::sat_bands::{NUM_BANDS, SpectralConstants};

// Nearly black at 412 nm, as assumed by the surface initialisation
const VEGETATION: [f64; NUM_BANDS] = [
    0.001, 0.004, 0.012, 0.018, 0.04, 0.03, 0.025, 0.03, 0.15, 0.3, 0.35, 0.38, 0.39, 0.4,
];

const SOIL: [f64; NUM_BANDS] = [
    0.08, 0.09, 0.11, 0.12, 0.15, 0.19, 0.21, 0.22, 0.23, 0.25, 0.26, 0.29, 0.3, 0.3,
];

pub fn aux() -> AuxCoefficients {
    AuxCoefficients {
        aerosol_phase: [[-2.0, 8.0, -0.03]; NUM_BANDS],
        relative_phase: [1.2, -0.004, 0.0],
        hemispherical_reflectance: [0.0, 0.1, 0.0, 0.0, 0.0],
        diffuse_transmission: [0.05, 0.0, 0.0, 0.0, 0.0],
        vegetation: Some(VEGETATION),
        soil: Some(SOIL),
        ndvi_tuning: 1.0,
        f_tuning: 1.08,
        soil_fraction: 0.0,
    }
}

/// No attenuation, no multiple scattering, linear phase model.
pub fn transparent_aux() -> AuxCoefficients {
    AuxCoefficients {
        aerosol_phase: [[0.0, 1.0, 0.0]; NUM_BANDS],
        relative_phase: [1.0, 0.0, 0.0],
        hemispherical_reflectance: [0.0; 5],
        diffuse_transmission: [0.0; 5],
        ..aux()
    }
}

/// Sun at 60 deg, nadir view, sea-level pressure: unit geometry factor.
pub fn pixel(toa: [f64; NUM_BANDS]) -> PixelInput {
    PixelInput::new(toa, 60.0, 0.0, 1013.25)
}

/// Vegetated surface under a thin aerosol layer, AOT 0.05 at 412 nm and
/// Angstrom exponent 1.3, rendered through [`aux`] at the [`pixel`] geometry.
pub fn clear_sky_toa() -> [f64; NUM_BANDS] {
    forward_toa(0.05, 1.3)
}

/// TOA spectrum of an Angstrom aerosol layer over half the vegetation
/// spectrum, which the mixing model can represent.
pub fn forward_toa(aot_412: f64, alpha: f64) -> [f64; NUM_BANDS] {
    let bands = SpectralConstants::default();
    let aux = aux();
    let blank = pixel([0.0; NUM_BANDS]);
    let Some(ctx) = PixelContext::new(&bands, &aux, &blank) else {
        return [0.0; NUM_BANDS];
    };
    let surface = vegetation_surface(0.5);

    std::array::from_fn(|band| {
        let aot = aot_412 * (bands.wavelengths[band] / bands.wavelengths[0]).powf(-alpha);
        reflectance_from_aot(&ctx, band, aot) + h2_term(&ctx, surface[band], aot)
    })
}

/// Vegetation spectrum scaled per band.
pub fn vegetation_surface(scale: f64) -> [f64; NUM_BANDS] {
    VEGETATION.map(|r| scale * r)
}

/// Bright, flat spectrum saturating the aerosol model in every band.
pub fn hazy_toa() -> [f64; NUM_BANDS] {
    [
        0.45, 0.45, 0.44, 0.44, 0.43, 0.43, 0.42, 0.42, 0.42, 0.42, 0.42, 0.42, 0.42, 0.42,
    ]
}
