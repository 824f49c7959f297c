use serde::Deserialize;

use crate::auxdata::AuxCoefficients;
use crate::sat_bands::{NUM_BANDS, SpectralConstants};

/// Scattering angle the aerosol phase tables are normalised to [deg]
pub const REFERENCE_SCATTERING_ANGLE: f64 = 140.0;

// Spectral and geometric input for a single pixel
#[derive(Debug, Clone, Deserialize)]
pub struct PixelInput {
    pub toa: [f64; NUM_BANDS], // TOA reflectance, 761 nm band skipped
    pub sun_zenith: f64,       // [deg]
    pub sun_azimuth: f64,      // [deg]
    pub view_zenith: f64,      // [deg]
    pub view_azimuth: f64,     // [deg]
    pub pressure: f64,         // Surface pressure [hPa]
    #[serde(default)]
    pub masked: bool, // Cloud or input mask from pre-filtering
}

impl PixelInput {
    pub fn new(toa: [f64; NUM_BANDS], sun_zenith: f64, view_zenith: f64, pressure: f64) -> Self {
        Self {
            toa,
            sun_zenith,
            sun_azimuth: 0.0,
            view_zenith,
            view_azimuth: 0.0,
            pressure,
            masked: false,
        }
    }

    pub fn with_azimuths(mut self, sun_azimuth: f64, view_azimuth: f64) -> Self {
        self.sun_azimuth = sun_azimuth;
        self.view_azimuth = view_azimuth;
        self
    }
}

/// Geometry terms derived once per pixel.
#[derive(Debug, Clone, Copy)]
pub struct Geometry {
    pub mus: f64,
    pub muv: f64,
    /// [deg]
    pub scattering_angle: f64,
    pub pressure_ratio: f64,
    /// `mus * muv / MU_LUT`
    pub geometry_norm: f64,
    /// Relative phase at 140 deg over the relative phase at the pixel angle
    pub phase_ratio: f64,
}

impl Geometry {
    /// Returns `None` for sun or view below the horizon or a non-positive pressure.
    pub fn new(pixel: &PixelInput, bands: &SpectralConstants, aux: &AuxCoefficients) -> Option<Self> {
        if !(0.0..90.0).contains(&pixel.sun_zenith)
            || !(0.0..90.0).contains(&pixel.view_zenith)
            || pixel.pressure.is_nan()
            || pixel.pressure <= 0.0
        {
            return None;
        }

        let sza = pixel.sun_zenith.to_radians();
        let vza = pixel.view_zenith.to_radians();
        let raa = (pixel.sun_azimuth - pixel.view_azimuth).to_radians();

        let mus = sza.cos();
        let muv = vza.cos();
        let cos_scat = (-mus * muv - sza.sin() * vza.sin() * raa.cos()).clamp(-1.0, 1.0);
        let scattering_angle = cos_scat.acos().to_degrees();

        let phase = aux.relative_phase_at(scattering_angle);
        let phase_ratio = if phase > 0.0 {
            aux.relative_phase_at(REFERENCE_SCATTERING_ANGLE) / phase
        } else {
            1.0
        };

        Some(Self {
            mus,
            muv,
            scattering_angle,
            pressure_ratio: pixel.pressure / bands.pressure_sea,
            geometry_norm: mus * muv / bands.mu_lut,
            phase_ratio,
        })
    }
}

/// Immutable inputs shared by every stage of one pixel's retrieval.
#[derive(Debug, Clone, Copy)]
pub struct PixelContext<'a> {
    pub bands: &'a SpectralConstants,
    pub aux: &'a AuxCoefficients,
    pub pixel: &'a PixelInput,
    pub geometry: Geometry,
}

impl<'a> PixelContext<'a> {
    pub fn new(
        bands: &'a SpectralConstants,
        aux: &'a AuxCoefficients,
        pixel: &'a PixelInput,
    ) -> Option<Self> {
        let geometry = Geometry::new(pixel, bands, aux)?;
        Some(Self {
            bands,
            aux,
            pixel,
            geometry,
        })
    }

    pub fn toa(&self, band: usize) -> f64 {
        self.pixel.toa[band]
    }

    pub fn wavelength(&self, band: usize) -> f64 {
        self.bands.wavelengths[band]
    }
}
