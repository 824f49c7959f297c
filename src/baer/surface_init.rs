//! First guess of surface reflectance and band-0 AOT
//!
//! A dark offset `h2` is subtracted from the 412 nm TOA reflectance and the
//! remainder is treated as aerosol signal. The resulting AOT is extrapolated to
//! 665 and 885 nm with a working Angstrom exponent, and `h2` and the exponent
//! are adjusted until the three corrected bands are positive. The corrected
//! red and NIR bands then drive a vegetation/soil mixing model.

use crate::auxdata::GroundCover;
use crate::baer::constants::{
    ALPHA_NEUTRAL, INIT_ALPHA_MAX, INIT_ALPHA_START, INIT_ALPHA_STEP, INIT_AOT_DEFAULT, INIT_BAND_BLUE,
    INIT_BAND_NIR, INIT_BAND_RED, INIT_DARK_TOA, INIT_H2_DECREMENT, INIT_H2_INCREMENT,
    INIT_H2_MIN, INIT_H2_NUDGE, INIT_PASS_MAX, SURF_REFL_FLOOR,
};
use crate::baer::model::{angstrom, aot_from_reflectance, normalise, reflectance_from_aot};
use crate::pixel::PixelContext;
use crate::sat_bands::NUM_BANDS;

#[derive(Debug, Clone)]
pub struct SurfaceInit {
    pub surf_refl: [f64; NUM_BANDS],
    pub aot_guess_band0: f64,
    /// Working exponent at loop exit
    pub alpha_help: f64,
    /// Corrected reflectance at 412, 665 and 885 nm
    pub corrected: [f64; 3],
    pub ndvi: f64,
    pub passes: u32,
}

/// Decision taken at the end of one pass of the offset loop.
#[derive(Debug, Clone, Copy, PartialEq)]
enum InitStep {
    Done,
    /// Both blue and red corrected bands non-positive
    RaiseOffset,
    /// Red or NIR corrected band non-positive
    SteepenAlpha,
}

fn classify_pass(corrected: &[f64; 3]) -> InitStep {
    let [blue, red, nir] = *corrected;
    if blue <= 0.0 && red <= 0.0 {
        InitStep::RaiseOffset
    } else if red <= 0.0 || nir <= 0.0 {
        InitStep::SteepenAlpha
    } else {
        InitStep::Done
    }
}

fn corrected_bands(ctx: &PixelContext, aot_band0: f64, alpha: f64) -> [f64; 3] {
    let lambda0 = ctx.wavelength(INIT_BAND_BLUE);
    [INIT_BAND_BLUE, INIT_BAND_RED, INIT_BAND_NIR].map(|band| {
        let aot = angstrom(aot_band0, lambda0, ctx.wavelength(band), alpha);
        ctx.toa(band) - reflectance_from_aot(ctx, band, aot)
    })
}

pub fn init(ctx: &PixelContext) -> SurfaceInit {
    let mut h2: f64 = 0.0;
    let mut alpha = INIT_ALPHA_START;
    let mut aot_guess1 = INIT_AOT_DEFAULT;
    let mut corrected = [0.0; 3];
    let mut stop = false;
    let mut passes = 0;

    while passes < INIT_PASS_MAX {
        passes += 1;

        let mut correct_band1 = ctx.toa(INIT_BAND_BLUE) - h2;
        while correct_band1 <= 0.0 && h2 > INIT_H2_MIN {
            h2 = (h2 - INIT_H2_DECREMENT).max(0.0);
            correct_band1 = ctx.toa(INIT_BAND_BLUE) - h2;
        }

        aot_guess1 = aot_from_reflectance(ctx, INIT_BAND_BLUE, normalise(ctx, correct_band1));
        if aot_guess1 < 0.0 {
            aot_guess1 = INIT_AOT_DEFAULT;
            // A larger offset would exceed the blue signal itself
            if ctx.toa(INIT_BAND_BLUE) < INIT_DARK_TOA
                || h2 + INIT_H2_INCREMENT >= ctx.toa(INIT_BAND_BLUE)
            {
                corrected = corrected_bands(ctx, aot_guess1, alpha);
                break;
            }
            h2 += INIT_H2_INCREMENT;
            continue;
        }

        corrected = corrected_bands(ctx, aot_guess1, alpha);

        if stop {
            break;
        }

        match classify_pass(&corrected) {
            InitStep::Done => break,
            InitStep::RaiseOffset => {
                h2 += INIT_H2_INCREMENT;
                alpha = INIT_ALPHA_START;
            }
            InitStep::SteepenAlpha => {
                alpha += INIT_ALPHA_STEP;
                h2 += INIT_H2_INCREMENT;
                if alpha > INIT_ALPHA_MAX {
                    alpha = ALPHA_NEUTRAL;
                    h2 += INIT_H2_NUDGE;
                    stop = true;
                }
            }
        }
    }

    if passes >= INIT_PASS_MAX {
        log::debug!("Surface initialisation stopped after {} passes", passes);
    }

    let [_, red, nir] = corrected;
    let ndvi = if red + nir != 0.0 {
        (nir - red) / (red + nir)
    } else {
        0.0
    };
    let vegc = if ndvi < 0.0 {
        0.0
    } else {
        (ctx.aux.ndvi_tuning * ndvi).min(1.0)
    };

    let mix: [f64; NUM_BANDS] = std::array::from_fn(|band| {
        vegc * ctx.aux.ground_reflectance(GroundCover::Vegetation, band)
            + (1.0 - vegc)
                * ctx.aux.soil_fraction
                * ctx.aux.ground_reflectance(GroundCover::Soil, band)
    });

    // A red band left darker than the aerosol gets the floor reflectance
    let f = if mix[INIT_BAND_RED] <= 0.0 {
        0.0
    } else if red <= 0.0 {
        SURF_REFL_FLOOR / mix[INIT_BAND_RED]
    } else {
        ctx.aux.f_tuning * red / mix[INIT_BAND_RED]
    };

    SurfaceInit {
        surf_refl: mix.map(|m| f * m),
        aot_guess_band0: aot_guess1,
        alpha_help: alpha,
        corrected,
        ndvi,
        passes,
    }
}
