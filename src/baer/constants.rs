//! Numeric constants of the BAER retrieval
//!
//! The thresholds below were fit empirically against reference retrievals.
//! Branch order in the code depends on them, so they are kept together here
//! and referenced by name only.

/// Upper AOT clamp applied to every band
pub const AOT_MAX: f64 = 2.0;

/// RMSD below which a pass with at least two fit bands may converge
pub const RMSD_CONVERGED: f64 = 0.005;

/// Trusted Angstrom exponent range
pub const ALPHA_TRUSTED_MIN: f64 = -0.5;
pub const ALPHA_TRUSTED_MAX: f64 = 2.2;

/// Range accepted straight from the weighted regression
pub const ALPHA_FIT_MIN: f64 = 0.0;
pub const ALPHA_FIT_MAX: f64 = 2.0;

/// Neutral exponent used when the regression is rejected
pub const ALPHA_NEUTRAL: f64 = 1.3;

/// Coefficient used when no in-range reference AOT is available
pub const BETA_SMALL_AEROSOL: f64 = 0.1;

/// Relaxation failures tolerated before the pixel is abandoned
pub const JCOUNT_MAX: u32 = 150;

/// Retries granted to a too-high exponent at an otherwise converged pass
pub const ALPHA_RETRY_MAX: u32 = 3;

/// Passes allowed per pixel, as a multiple of the iteration limit
pub const PASS_LIMIT_FACTOR: u32 = 3;

/// Slack on the best-so-far RMSD before reverting to it
pub const BEST_RMSD_SLACK: f64 = 1.2;

/// Surface reflectance substituted for an update landing exactly on zero
pub const SURF_REFL_FLOOR: f64 = 0.002;

/// Relaxation delta floor for bands with a positive aerosol reflectance
pub const DELTA_FLOOR: f64 = -0.5;
/// Reference AOT for bands whose aerosol reflectance is non-positive
pub const DELTA_OFFSET_AOT: f64 = 0.025;
/// Delta substituted when the offset delta is exactly zero
pub const DELTA_OFFSET_ZERO: f64 = -0.1;

/// Damped relaxation multipliers for out-of-range updates
pub const RELAX_STEP_SMALL_DELTA: f64 = 0.1;
pub const RELAX_STEP_LARGE_DELTA: f64 = 0.01;

/// Weight of band 0 relative to band 1 in the RMSD reference pair
pub const REFERENCE_PAIR_WEIGHT: f64 = 6.0;

/// Surface initialisation
pub const INIT_PASS_MAX: u32 = 200;
pub const INIT_ALPHA_START: f64 = 1.0;
pub const INIT_ALPHA_STEP: f64 = 0.05;
pub const INIT_ALPHA_MAX: f64 = 2.5;
pub const INIT_AOT_DEFAULT: f64 = 0.05;
pub const INIT_DARK_TOA: f64 = 0.005;
pub const INIT_H2_MIN: f64 = 0.002;
pub const INIT_H2_DECREMENT: f64 = 0.001;
pub const INIT_H2_INCREMENT: f64 = 0.005;
pub const INIT_H2_NUDGE: f64 = 0.001;
/// Bands used to check the initial aerosol guess (412, 665 and 885 nm)
pub const INIT_BAND_BLUE: usize = 0;
pub const INIT_BAND_RED: usize = 6;
pub const INIT_BAND_NIR: usize = 12;

/// Floor for the `1 - s*r` denominator of the H2 term
pub const H2_DENOMINATOR_MIN: f64 = 1e-6;

/// Output wavelengths [um]
pub const LAMBDA_440: f64 = 0.44;
pub const LAMBDA_550: f64 = 0.55;

/// Weight added to both bands of a consistent pair
pub const PAIR_WEIGHT_BONUS: f64 = 0.5;

/// Acceptance window of a band pair in the weighted Angstrom fit.
///
/// `d` is the relative discrepancy between the anchor AOT and the value
/// projected back from the partner band, `a` the local log-log slope.
#[derive(Debug, Clone, Copy)]
pub struct PairWindow {
    pub partner: usize,
    pub d_min: f64,
    pub d_max: f64,
    pub a_min: f64,
    pub a_max: f64,
}

const fn window(partner: usize, d_min: f64, d_max: f64, a_min: f64, a_max: f64) -> PairWindow {
    PairWindow {
        partner,
        d_min,
        d_max,
        a_min,
        a_max,
    }
}

/// Windows with band 0 (412 nm) as anchor
pub const PAIR_WINDOWS_BAND0: [PairWindow; 6] = [
    window(1, -0.10, 0.10, 0.2, 2.2),
    window(2, -0.12, 0.12, 0.2, 2.2),
    window(3, -0.15, 0.15, 0.1, 2.3),
    window(4, -0.15, 0.15, 0.1, 2.3),
    window(5, -0.20, 0.20, 0.0, 2.4),
    window(6, -0.25, 0.25, 0.0, 2.5),
];

/// Windows with band 1 (443 nm) as anchor, used when band 0 is out of range
pub const PAIR_WINDOWS_BAND1: [PairWindow; 5] = [
    window(2, -0.08, 0.08, 0.3, 2.0),
    window(3, -0.10, 0.10, 0.3, 2.0),
    window(4, -0.12, 0.12, 0.2, 2.1),
    window(5, -0.15, 0.15, 0.1, 2.2),
    window(6, -0.20, 0.20, 0.0, 2.3),
];
