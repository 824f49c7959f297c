use serde::Serialize;

use crate::baer::constants::{LAMBDA_440, LAMBDA_550};
use crate::baer::correction::AtmosphericCorrection;
use crate::baer::iteration::Retrieval;
use crate::baer::model::angstrom;
use crate::baer::state::AlphaFlag;
use crate::config::OutputMode;
use crate::pixel::PixelContext;
use crate::sat_bands::NUM_BANDS;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PixelFlags {
    pub alpha_out_of_range: bool,
    pub aot_out_of_range: bool,
    pub invalid: bool,
    /// Set by pre-filtering, passed through
    pub masked: bool,
}

/// Per-pixel output record.
///
/// `reflectance` is only present in [`OutputMode::Full`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PixelRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reflectance: Option<[f64; NUM_BANDS]>,
    pub aot_412: f64,
    pub aot_440: f64,
    pub aot_550: f64,
    pub alpha: f64,
    pub flags: PixelFlags,
}

impl PixelRecord {
    /// All-zero record carrying only flags.
    pub fn empty(mode: OutputMode, flags: PixelFlags) -> Self {
        Self {
            reflectance: match mode {
                OutputMode::Full => Some([0.0; NUM_BANDS]),
                OutputMode::Reduced => None,
            },
            aot_412: 0.0,
            aot_440: 0.0,
            aot_550: 0.0,
            alpha: 0.0,
            flags,
        }
    }

    pub fn masked(mode: OutputMode) -> Self {
        Self::empty(
            mode,
            PixelFlags {
                masked: true,
                ..Default::default()
            },
        )
    }

    /// Record of a pixel whose geometry cannot be processed.
    pub fn invalid(mode: OutputMode) -> Self {
        Self::empty(
            mode,
            PixelFlags {
                invalid: true,
                ..Default::default()
            },
        )
    }

    pub fn is_valid(&self) -> bool {
        !self.flags.invalid && !self.flags.masked
    }
}

fn is_physical(reflectance: f64) -> bool {
    reflectance.is_finite() && (0.0..=1.0).contains(&reflectance)
}

/// Renders the terminal state of a pixel.
///
/// Pure in its inputs: assembling the same retrieval twice yields the same
/// record.
pub fn assemble(
    ctx: &PixelContext,
    retrieval: &Retrieval,
    mode: OutputMode,
    corrector: &dyn AtmosphericCorrection,
) -> PixelRecord {
    let state = &retrieval.state;
    let mut flags = PixelFlags {
        alpha_out_of_range: state.alpha_flag != AlphaFlag::InRange,
        aot_out_of_range: state.has_flag_aot,
        // A reverted snapshot can still hold clamped bands
        invalid: retrieval.termination.is_failure() || state.has_flag_aot,
        masked: false,
    };

    let reflectance = match mode {
        OutputMode::Reduced => None,
        OutputMode::Full => {
            if flags.invalid {
                return PixelRecord::empty(mode, flags);
            }
            let mut reflectance = corrector.correct(ctx, &state.aot, state.alpha);
            for band in 0..NUM_BANDS {
                if !ctx.bands.used[band] {
                    reflectance[band] = ctx.toa(band);
                }
            }
            let physical = (0..NUM_BANDS)
                .filter(|&band| ctx.bands.used[band])
                .all(|band| is_physical(reflectance[band]));
            if !physical {
                flags.invalid = true;
                return PixelRecord::empty(mode, flags);
            }
            Some(reflectance)
        }
    };

    let aot0 = state.aot[0];
    let lambda0 = ctx.wavelength(0);
    PixelRecord {
        reflectance,
        aot_412: aot0,
        aot_440: angstrom(aot0, lambda0, LAMBDA_440, state.alpha),
        aot_550: angstrom(aot0, lambda0, LAMBDA_550, state.alpha),
        alpha: state.alpha,
        flags,
    }
}
