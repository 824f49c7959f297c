//! BAER (Bremen AErosol Retrieval) per-pixel engine
//!
//! [`process_pixel`] runs the whole chain for one pixel: surface
//! initialisation, the fixed-point iteration over per-band AOT, Angstrom fit
//! and surface relaxation, and the output assembly. Pixels are independent;
//! all shared inputs are read-only.

pub mod angstrom;
pub mod aot_estimator;
pub mod constants;
pub mod convergence;
pub mod correction;
pub mod iteration;
pub mod model;
pub mod output;
pub mod state;
pub mod surface_init;

#[cfg(test)]
pub(crate) mod fixtures;

pub use correction::{AtmosphericCorrection, ForwardModelCorrection};
pub use iteration::{Retrieval, Termination};
pub use output::{PixelFlags, PixelRecord};

use crate::auxdata::AuxCoefficients;
use crate::config::OutputMode;
use crate::pixel::{PixelContext, PixelInput};
use crate::sat_bands::SpectralConstants;

pub fn process_pixel(
    bands: &SpectralConstants,
    aux: &AuxCoefficients,
    pixel: &PixelInput,
    corrector: &dyn AtmosphericCorrection,
    mode: OutputMode,
) -> PixelRecord {
    if pixel.masked {
        return PixelRecord::masked(mode);
    }

    let Some(ctx) = PixelContext::new(bands, aux, pixel) else {
        log::debug!(
            "Skipping pixel with invalid geometry (sza {}, vza {}, pressure {})",
            pixel.sun_zenith,
            pixel.view_zenith,
            pixel.pressure
        );
        return PixelRecord::invalid(mode);
    };

    let retrieval = iteration::run(&ctx);
    output::assemble(&ctx, &retrieval, mode, corrector)
}
