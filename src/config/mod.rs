use serde::Deserialize;
use serde::Deserializer;
use serde::de::Error;

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::processor::ProcessingMode;

pub mod error;
pub use error::ConfigError;

pub mod output_mode;
pub use output_mode::OutputMode;

/// Run configuration of the binary.
#[derive(Debug, Clone)]
pub struct Config {
    aux_file: PathBuf,
    spectra_dir: Option<PathBuf>,
    vegetation_spectrum: Option<String>,
    soil_spectrum: Option<String>,
    output_mode: OutputMode,
    threads: Option<usize>,
    pixels_file: PathBuf,
    output_file: Option<PathBuf>,
}

// Deserializes a Config, rejecting empty paths and a zero thread count.
impl<'de> Deserialize<'de> for Config {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct ConfigHelper {
            aux_file: String,
            spectra_dir: Option<String>,
            vegetation_spectrum: Option<String>,
            soil_spectrum: Option<String>,
            #[serde(default)]
            output_mode: OutputMode,
            threads: Option<usize>,
            pixels_file: String,
            output_file: Option<String>,
        }

        let helper = ConfigHelper::deserialize(deserializer)?;

        if helper.aux_file.is_empty() {
            return Err(D::Error::custom(ConfigError::EmptyPath("aux_file")));
        }

        if helper.pixels_file.is_empty() {
            return Err(D::Error::custom(ConfigError::EmptyPath("pixels_file")));
        }

        if helper.threads == Some(0) {
            return Err(D::Error::custom(ConfigError::InvalidThreads));
        }

        Ok(Config {
            aux_file: PathBuf::from(helper.aux_file),
            spectra_dir: helper.spectra_dir.map(PathBuf::from),
            vegetation_spectrum: helper.vegetation_spectrum,
            soil_spectrum: helper.soil_spectrum,
            output_mode: helper.output_mode,
            threads: helper.threads,
            pixels_file: PathBuf::from(helper.pixels_file),
            output_file: helper.output_file.map(PathBuf::from),
        })
    }
}

impl Config {
    pub fn new<P: AsRef<Path>>(aux_file: P, pixels_file: P) -> Self {
        Self {
            aux_file: aux_file.as_ref().to_path_buf(),
            spectra_dir: None,
            vegetation_spectrum: None,
            soil_spectrum: None,
            output_mode: OutputMode::default(),
            threads: None,
            pixels_file: pixels_file.as_ref().to_path_buf(),
            output_file: None,
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);

        let config: Config = serde_json::from_reader(reader).map_err(ConfigError::from)?;

        Ok(config)
    }

    pub fn aux_file(&self) -> &Path {
        &self.aux_file
    }

    pub fn spectra_dir(&self) -> Option<&Path> {
        self.spectra_dir.as_deref()
    }

    pub fn vegetation_spectrum(&self) -> Option<&str> {
        self.vegetation_spectrum.as_deref()
    }

    pub fn soil_spectrum(&self) -> Option<&str> {
        self.soil_spectrum.as_deref()
    }

    pub fn output_mode(&self) -> OutputMode {
        self.output_mode
    }

    pub fn pixels_file(&self) -> &Path {
        &self.pixels_file
    }

    /// Records go to stdout when unset.
    pub fn output_file(&self) -> Option<&Path> {
        self.output_file.as_deref()
    }

    pub fn processing_mode(&self) -> ProcessingMode {
        match self.threads {
            None => ProcessingMode::Parallel,
            Some(1) => ProcessingMode::Sequential,
            Some(n) => ProcessingMode::ParallelWith(n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_config(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("config.json");
        let mut file = File::create(&file_path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        (dir, file_path)
    }

    #[test]
    fn test_from_file() {
        let (_dir, file_path) = write_config(
            r#"
    {
        "aux_file": "data/aux/meris.json",
        "spectra_dir": "data/spectra",
        "vegetation_spectrum": "grass",
        "output_mode": "reduced",
        "threads": 4,
        "pixels_file": "data/pixels.json"
    }
    "#,
        );

        let config = Config::from_file(file_path).unwrap();

        assert_eq!(config.aux_file(), Path::new("data/aux/meris.json"));
        assert_eq!(config.spectra_dir(), Some(Path::new("data/spectra")));
        assert_eq!(config.vegetation_spectrum(), Some("grass"));
        assert_eq!(config.soil_spectrum(), None);
        assert_eq!(config.output_mode(), OutputMode::Reduced);
        assert_eq!(config.processing_mode(), ProcessingMode::ParallelWith(4));
        assert_eq!(config.output_file(), None);
    }

    #[test]
    fn test_defaults() {
        let (_dir, file_path) = write_config(
            r#"{ "aux_file": "aux.json", "pixels_file": "pixels.json" }"#,
        );

        let config = Config::from_file(file_path).unwrap();

        assert_eq!(config.output_mode(), OutputMode::Full);
        assert_eq!(config.processing_mode(), ProcessingMode::Parallel);
    }

    #[test]
    fn test_single_thread_is_sequential() {
        let mut config = Config::new("aux.json", "pixels.json");
        config.threads = Some(1);

        assert_eq!(config.processing_mode(), ProcessingMode::Sequential);
    }

    #[test]
    fn test_zero_threads_is_rejected() {
        let (_dir, file_path) = write_config(
            r#"{ "aux_file": "aux.json", "pixels_file": "pixels.json", "threads": 0 }"#,
        );

        let err = Config::from_file(file_path).unwrap_err();

        assert!(matches!(err, ConfigError::Json(_)));
        assert!(err.to_string().contains("threads"));
    }

    #[test]
    fn test_unknown_output_mode_is_rejected() {
        let (_dir, file_path) = write_config(
            r#"{ "aux_file": "aux.json", "pixels_file": "pixels.json", "output_mode": "partial" }"#,
        );

        assert!(matches!(
            Config::from_file(file_path),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_empty_aux_file_is_rejected() {
        let result: Result<Config, _> =
            serde_json::from_str(r#"{ "aux_file": "", "pixels_file": "pixels.json" }"#);

        assert!(result.unwrap_err().to_string().contains("aux_file"));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let result = Config::from_file(dir.path().join("missing.json"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
