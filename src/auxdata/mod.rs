//! Auxiliary coefficient tables consumed by the retrieval
//!
//! The tables are loaded once per run and shared read-only between all pixels.

pub mod coefficients;
pub mod error;
pub mod spectra;

pub use coefficients::{AuxCoefficients, GroundCover, polynomial};
pub use error::AuxError;
pub use spectra::SpectrumLibrary;
