/// Number of spectral bands handled by the retrieval.
pub const NUM_BANDS: usize = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sensor {
    Meris,
}

/// Fixed per-sensor band tables and iteration limits.
#[derive(Debug, Clone)]
pub struct SpectralConstants {
    /// Band centre wavelengths [um]
    pub wavelengths: [f64; NUM_BANDS],
    /// Bands taking part in the Angstrom fit
    pub fit_selected: [bool; NUM_BANDS],
    /// Bands that are atmospherically corrected
    pub used: [bool; NUM_BANDS],
    /// Surface reflectance relaxation coefficient per band
    pub coeff: [f64; NUM_BANDS],
    pub const_max: u32,
    pub rmsd_const: f64,
    pub iteration_max: u32,
    /// Reference sea level pressure [hPa]
    pub pressure_sea: f64,
    /// Cosine product of the geometry the aerosol tables refer to
    pub mu_lut: f64,
}

impl SpectralConstants {
    pub fn new(sensor: Sensor) -> Self {
        match sensor {
            // Physical bands 1-10 and 12-15, the 761 nm oxygen band is skipped
            Sensor::Meris => Self {
                wavelengths: [
                    0.4127, 0.4426, 0.4900, 0.5097, 0.5597, 0.6197, 0.6649, 0.6813, 0.7088,
                    0.7535, 0.7789, 0.8650, 0.8850, 0.9000,
                ],
                fit_selected: [
                    true, true, true, true, true, true, true, false, false, false, false, false,
                    false, false,
                ],
                // 900 nm is water vapour contaminated
                used: [
                    true, true, true, true, true, true, true, true, true, true, true, true, true,
                    false,
                ],
                coeff: [
                    1.0, 1.0, 0.9, 0.9, 0.8, 0.7, 0.7, 0.6, 0.6, 0.5, 0.5, 0.5, 0.5, 0.5,
                ],
                const_max: 6,
                rmsd_const: 0.0025,
                iteration_max: 12,
                pressure_sea: 1013.25,
                mu_lut: 0.5,
            },
        }
    }

    /// Indices of the bands selected for the Angstrom fit.
    pub fn fit_bands(&self) -> impl Iterator<Item = usize> + '_ {
        (0..NUM_BANDS).filter(|&band| self.fit_selected[band])
    }
}

impl Default for SpectralConstants {
    fn default() -> Self {
        Self::new(Sensor::Meris)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meris_tables_are_consistent() {
        let bands = SpectralConstants::new(Sensor::Meris);

        assert!(bands.wavelengths.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(bands.fit_bands().count(), 7);
        assert!(!bands.used[13]);
    }
}
