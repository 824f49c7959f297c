use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::auxdata::error::AuxError;
use crate::sat_bands::NUM_BANDS;

#[derive(Debug, Deserialize)]
struct SpectrumFile {
    reflectance: Vec<f64>,
}

/// Directory of named ground reflectance spectra, one `<name>.json` file each.
#[derive(Debug, Clone)]
pub struct SpectrumLibrary {
    base_directory: PathBuf,
}

impl SpectrumLibrary {
    pub fn new<P: AsRef<Path>>(base_directory: P) -> Self {
        Self {
            base_directory: base_directory.as_ref().to_path_buf(),
        }
    }

    /// Search for the spectrum file recursively within the base directory
    fn locate(&self, name: &str) -> Option<PathBuf> {
        let filename = format!("{}.json", name);

        let direct_path = self.base_directory.join(&filename);
        if direct_path.is_file() {
            return Some(direct_path);
        }

        for entry in WalkDir::new(&self.base_directory)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if entry.file_type().is_file()
                && let Some(file_name) = entry.path().file_name()
                && file_name.to_string_lossy() == filename
            {
                return Some(entry.path().to_path_buf());
            }
        }

        None
    }

    pub fn find(&self, name: &str) -> Result<[f64; NUM_BANDS], AuxError> {
        let path = self
            .locate(name)
            .ok_or_else(|| AuxError::SpectrumNotFound(name.to_string()))?;

        let reader = BufReader::new(File::open(&path)?);
        let spectrum: SpectrumFile = serde_json::from_reader(reader)?;

        if spectrum.reflectance.iter().any(|v| !v.is_finite()) {
            return Err(AuxError::NonFinite("reflectance"));
        }
        let found = spectrum.reflectance.len();
        spectrum
            .reflectance
            .try_into()
            .map_err(|_| AuxError::TableLength {
                table: "reflectance",
                expected: NUM_BANDS,
                found,
            })
    }
}
