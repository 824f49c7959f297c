use serde::Deserialize;
use serde::Deserializer;
use serde::de::Error;

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::auxdata::error::AuxError;
use crate::auxdata::spectra::SpectrumLibrary;
use crate::sat_bands::NUM_BANDS;

/// Ground cover types with a reference reflectance spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroundCover {
    Vegetation,
    Soil,
}

/// Read-only coefficient tables for the aerosol retrieval.
#[derive(Debug, Clone)]
pub struct AuxCoefficients {
    /// Quadratic aerosol phase model per band, `AOT = a*x^2 + b*x + c`
    pub aerosol_phase: [[f64; 3]; NUM_BANDS],
    /// Relative aerosol phase, polynomial in the scattering angle [deg]
    pub relative_phase: [f64; 3],
    /// Hemispherical reflectance, polynomial in AOT
    pub hemispherical_reflectance: [f64; 5],
    /// Aerosol diffuse transmission, polynomial in the pressure scaled cosine
    pub diffuse_transmission: [f64; 5],
    pub vegetation: Option<[f64; NUM_BANDS]>,
    pub soil: Option<[f64; NUM_BANDS]>,
    pub ndvi_tuning: f64,
    pub f_tuning: f64,
    pub soil_fraction: f64,
}

/// Evaluates `sum(coefs[k] * x^k)` with Horner's scheme.
pub fn polynomial(coefs: &[f64], x: f64) -> f64 {
    coefs.iter().rev().fold(0.0, |acc, &c| acc * x + c)
}

fn to_array<const N: usize>(values: Vec<f64>, table: &'static str) -> Result<[f64; N], AuxError> {
    if values.iter().any(|v| !v.is_finite()) {
        return Err(AuxError::NonFinite(table));
    }
    let found = values.len();
    values.try_into().map_err(|_| AuxError::TableLength {
        table,
        expected: N,
        found,
    })
}

// Checks table lengths and finiteness while deserializing so that a loaded
// table can be indexed by band without further checks.
impl<'de> Deserialize<'de> for AuxCoefficients {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct AuxHelper {
            aerosol_phase: Vec<Vec<f64>>,
            relative_phase: Vec<f64>,
            hemispherical_reflectance: Vec<f64>,
            diffuse_transmission: Vec<f64>,
            vegetation: Option<Vec<f64>>,
            soil: Option<Vec<f64>>,
            ndvi_tuning: f64,
            f_tuning: f64,
            soil_fraction: f64,
        }

        let helper = AuxHelper::deserialize(deserializer)?;

        let rows = helper.aerosol_phase.len();
        if rows != NUM_BANDS {
            return Err(D::Error::custom(AuxError::TableLength {
                table: "aerosol_phase",
                expected: NUM_BANDS,
                found: rows,
            }));
        }

        let mut aerosol_phase = [[0.0; 3]; NUM_BANDS];
        for (band, row) in helper.aerosol_phase.into_iter().enumerate() {
            aerosol_phase[band] = to_array(row, "aerosol_phase").map_err(D::Error::custom)?;
        }

        let vegetation = helper
            .vegetation
            .map(|v| to_array(v, "vegetation"))
            .transpose()
            .map_err(D::Error::custom)?;
        let soil = helper
            .soil
            .map(|v| to_array(v, "soil"))
            .transpose()
            .map_err(D::Error::custom)?;

        Ok(AuxCoefficients {
            aerosol_phase,
            relative_phase: to_array(helper.relative_phase, "relative_phase")
                .map_err(D::Error::custom)?,
            hemispherical_reflectance: to_array(
                helper.hemispherical_reflectance,
                "hemispherical_reflectance",
            )
            .map_err(D::Error::custom)?,
            diffuse_transmission: to_array(helper.diffuse_transmission, "diffuse_transmission")
                .map_err(D::Error::custom)?,
            vegetation,
            soil,
            ndvi_tuning: helper.ndvi_tuning,
            f_tuning: helper.f_tuning,
            soil_fraction: helper.soil_fraction,
        })
    }
}

impl AuxCoefficients {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<AuxCoefficients, AuxError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);

        let aux: AuxCoefficients = serde_json::from_reader(reader)?;

        Ok(aux)
    }

    pub fn aer_phase(&self, band: usize) -> [f64; 3] {
        self.aerosol_phase[band]
    }

    /// Relative aerosol phase at a scattering angle in degrees.
    pub fn relative_phase_at(&self, scattering_angle: f64) -> f64 {
        polynomial(&self.relative_phase, scattering_angle)
    }

    pub fn hemispherical(&self, aot: f64) -> f64 {
        polynomial(&self.hemispherical_reflectance, aot)
    }

    pub fn transmission_coefficient(&self, scaled_mu: f64) -> f64 {
        polynomial(&self.diffuse_transmission, scaled_mu)
    }

    pub fn ground_spectrum(&self, cover: GroundCover) -> Option<&[f64; NUM_BANDS]> {
        match cover {
            GroundCover::Vegetation => self.vegetation.as_ref(),
            GroundCover::Soil => self.soil.as_ref(),
        }
    }

    /// Ground reflectance at a band, zero when the spectrum is unset.
    pub fn ground_reflectance(&self, cover: GroundCover, band: usize) -> f64 {
        self.ground_spectrum(cover).map_or(0.0, |s| s[band])
    }

    pub fn set_ground_spectrum(&mut self, cover: GroundCover, spectrum: Option<[f64; NUM_BANDS]>) {
        match cover {
            GroundCover::Vegetation => self.vegetation = spectrum,
            GroundCover::Soil => self.soil = spectrum,
        }
    }

    /// Replaces a ground spectrum with the one named in `library`.
    ///
    /// A failed lookup is logged and leaves the slot unset; the retrieval then
    /// treats that cover as zero reflectance.
    pub fn load_ground_spectrum(&mut self, library: &SpectrumLibrary, cover: GroundCover, name: &str) {
        match library.find(name) {
            Ok(spectrum) => self.set_ground_spectrum(cover, Some(spectrum)),
            Err(e) => {
                log::warn!("Could not load {:?} spectrum '{}': {}", cover, name, e);
                self.set_ground_spectrum(cover, None);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn aux_json(rows: usize) -> String {
        let row = "[-1.0, 8.0, 0.0]";
        let phase = vec![row; rows].join(", ");
        format!(
            r#"{{
                "aerosol_phase": [{phase}],
                "relative_phase": [1.2, -0.004, 0.0],
                "hemispherical_reflectance": [0.0, 0.1, 0.0, 0.0, 0.0],
                "diffuse_transmission": [0.5, 0.1, 0.0, 0.0, 0.0],
                "vegetation": [0.02, 0.03, 0.04, 0.05, 0.08, 0.06, 0.04, 0.05, 0.2, 0.35, 0.4, 0.42, 0.42, 0.42],
                "ndvi_tuning": 1.0,
                "f_tuning": 1.0,
                "soil_fraction": 0.5
            }}"#
        )
    }

    #[test]
    fn test_polynomial() {
        assert_eq!(polynomial(&[1.0, 2.0, 3.0], 2.0), 17.0);
        assert_eq!(polynomial(&[], 2.0), 0.0);
        assert_eq!(polynomial(&[0.5, 0.0, 0.0, 0.0, 0.0], 10.0), 0.5);
    }

    #[test]
    fn test_from_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("aux.json");
        let mut file = File::create(&file_path).unwrap();
        file.write_all(aux_json(NUM_BANDS).as_bytes()).unwrap();

        let aux = AuxCoefficients::from_file(&file_path).unwrap();

        assert_eq!(aux.aer_phase(3), [-1.0, 8.0, 0.0]);
        assert!(aux.ground_spectrum(GroundCover::Vegetation).is_some());
        assert!(aux.ground_spectrum(GroundCover::Soil).is_none());
        assert_eq!(aux.ground_reflectance(GroundCover::Soil, 4), 0.0);
        assert!((aux.relative_phase_at(140.0) - 0.64).abs() < 1e-12);
    }

    #[test]
    fn test_wrong_band_count_is_rejected() {
        let result: Result<AuxCoefficients, _> = serde_json::from_str(&aux_json(13));
        let err = result.unwrap_err().to_string();
        assert!(err.contains("aerosol_phase"), "{err}");
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let result = AuxCoefficients::from_file(dir.path().join("missing.json"));
        assert!(matches!(result, Err(AuxError::Io(_))));
    }
}
