//! Per-pixel aerosol retrieval (BAER) for MERIS-class imagery.

pub mod auxdata;
pub mod baer;
pub mod config;
pub mod pixel;
pub mod processor;
pub mod sat_bands;
