use crate::baer::constants::{ALPHA_TRUSTED_MAX, ALPHA_TRUSTED_MIN};
use crate::sat_bands::NUM_BANDS;

/// Outcome of the AOT clamp for one band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AotFlag {
    #[default]
    InRange,
    BelowZero,
    AboveMax,
}

impl AotFlag {
    pub fn is_in_range(self) -> bool {
        self == AotFlag::InRange
    }
}

/// Position of the Angstrom exponent relative to the trusted range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlphaFlag {
    #[default]
    InRange,
    TooLow,
    TooHigh,
}

impl AlphaFlag {
    pub fn classify(alpha: f64) -> Self {
        if alpha < ALPHA_TRUSTED_MIN {
            AlphaFlag::TooLow
        } else if alpha > ALPHA_TRUSTED_MAX {
            AlphaFlag::TooHigh
        } else {
            AlphaFlag::InRange
        }
    }
}

/// Working state of one pixel's retrieval.
///
/// Created fresh for every pixel and dropped once the output record has been
/// assembled. Nothing in here outlives the pixel.
#[derive(Debug, Clone, Default)]
pub struct PixelState {
    /// Current best AOT per band
    pub aot: [f64; NUM_BANDS],
    /// Working AOT estimate before the fit
    pub aot_guess: [f64; NUM_BANDS],
    pub surf_refl: [f64; NUM_BANDS],
    /// Aerosol reflectance at the reference scattering angle
    pub aero_refl: [f64; NUM_BANDS],
    /// Relaxation weights from the last weighted fit
    pub weights: [f64; NUM_BANDS],
    pub aot_flags: [AotFlag; NUM_BANDS],
    /// Fitted exponent, always usable for extrapolation
    pub alpha: f64,
    /// Raw exponent of the last weighted regression
    pub alpha_tentative: f64,
    pub beta: f64,
    pub rmsd: f64,
    pub alpha_flag: AlphaFlag,
    /// Any fit-selected band out of range
    pub has_flag_aot: bool,
    /// Last band clamped to the upper AOT limit in the current pass
    pub last_high_band: Option<usize>,
    /// Bands clamped to the upper AOT limit in the current pass
    pub icheck: u32,
    /// Out-of-range surface reflectance updates, cumulative
    pub jcount: u32,
    pub iteration: u32,
    /// Out-of-range AOT bands, cumulative over passes
    pub num_const_total: u32,
}

impl PixelState {
    pub fn new() -> Self {
        Self {
            weights: [1.0; NUM_BANDS],
            ..Default::default()
        }
    }

    /// Resets the per-pass clamp bookkeeping.
    pub fn begin_pass(&mut self) {
        self.icheck = 0;
        self.last_high_band = None;
    }

    pub fn update_has_flag_aot(&mut self, fit_selected: &[bool; NUM_BANDS]) {
        self.has_flag_aot = (0..NUM_BANDS)
            .any(|band| fit_selected[band] && !self.aot_flags[band].is_in_range());
    }
}
