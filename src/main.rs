use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use baer::auxdata::{AuxCoefficients, GroundCover, SpectrumLibrary};
use baer::config::Config;
use baer::pixel::PixelInput;
use baer::processor::{BaerProcessor, RunSummary};

const DEFAULT_CONFIG: &str = "./data/config/baer.json";

fn read_pixels(path: &Path) -> Result<Vec<PixelInput>, Box<dyn std::error::Error>> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

fn load_aux(config: &Config) -> Result<AuxCoefficients, Box<dyn std::error::Error>> {
    let mut aux = AuxCoefficients::from_file(config.aux_file())?;

    if let Some(dir) = config.spectra_dir() {
        let library = SpectrumLibrary::new(dir);
        if let Some(name) = config.vegetation_spectrum() {
            aux.load_ground_spectrum(&library, GroundCover::Vegetation, name);
        }
        if let Some(name) = config.soil_spectrum() {
            aux.load_ground_spectrum(&library, GroundCover::Soil, name);
        }
    }

    Ok(aux)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    log::info!("Starting aerosol retrieval with {}", config_path);

    let config = Config::from_file(&config_path)?;
    let aux = load_aux(&config)?;
    let pixels = read_pixels(config.pixels_file())?;

    let processor = BaerProcessor::new(Arc::new(aux), config.output_mode())
        .with_processing(config.processing_mode());
    let records = processor.process(&pixels)?;

    RunSummary::from_records(&records).log();

    let writer: Box<dyn Write> = match config.output_file() {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(std::io::stdout().lock()),
    };
    let mut writer = BufWriter::new(writer);
    serde_json::to_writer_pretty(&mut writer, &records)?;
    writer.flush()?;

    Ok(())
}
