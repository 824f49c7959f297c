//! Batch processing of pixels
//!
//! Every pixel is retrieved independently against the same read-only band and
//! auxiliary tables, so the batch is a plain parallel map. Records come back in
//! input order.

use rayon::prelude::*;
use std::sync::Arc;

use crate::auxdata::AuxCoefficients;
use crate::baer::{self, ForwardModelCorrection, PixelRecord};
use crate::config::OutputMode;
use crate::pixel::PixelInput;
use crate::sat_bands::SpectralConstants;

pub mod error;
pub use error::ProcessorError;

pub mod summary;
pub use summary::RunSummary;

/// How the pixels of a batch are scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingMode {
    Sequential,
    /// Rayon global pool
    #[default]
    Parallel,
    /// Dedicated pool with the given number of threads
    ParallelWith(usize),
}

pub struct BaerProcessor {
    bands: SpectralConstants,
    aux: Arc<AuxCoefficients>,
    corrector: ForwardModelCorrection,
    output_mode: OutputMode,
    processing: ProcessingMode,
}

impl BaerProcessor {
    pub fn new(aux: Arc<AuxCoefficients>, output_mode: OutputMode) -> Self {
        Self {
            bands: SpectralConstants::default(),
            aux,
            corrector: ForwardModelCorrection,
            output_mode,
            processing: ProcessingMode::default(),
        }
    }

    pub fn with_processing(mut self, processing: ProcessingMode) -> Self {
        self.processing = processing;
        self
    }

    fn process_one(&self, pixel: &PixelInput) -> PixelRecord {
        baer::process_pixel(
            &self.bands,
            &self.aux,
            pixel,
            &self.corrector,
            self.output_mode,
        )
    }

    pub fn process(&self, pixels: &[PixelInput]) -> Result<Vec<PixelRecord>, ProcessorError> {
        log::info!(
            "Processing {} pixels ({:?}, {} output)",
            pixels.len(),
            self.processing,
            self.output_mode
        );

        let records: Vec<PixelRecord> = match self.processing {
            ProcessingMode::Sequential => pixels.iter().map(|p| self.process_one(p)).collect(),
            ProcessingMode::Parallel => pixels.par_iter().map(|p| self.process_one(p)).collect(),
            ProcessingMode::ParallelWith(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()?;
                pool.install(|| pixels.par_iter().map(|p| self.process_one(p)).collect())
            }
        };

        Ok(records)
    }
}
