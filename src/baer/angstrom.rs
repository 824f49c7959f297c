//! Log-log regression of AOT against wavelength
//!
//! `ln(AOT) = ln(beta) - alpha * ln(lambda)`

use crate::baer::constants::{
    ALPHA_FIT_MAX, ALPHA_FIT_MIN, ALPHA_NEUTRAL, AOT_MAX, BETA_SMALL_AEROSOL, PAIR_WEIGHT_BONUS,
    PAIR_WINDOWS_BAND0, PAIR_WINDOWS_BAND1, PairWindow,
};
use crate::baer::model::angstrom;
use crate::baer::state::PixelState;
use crate::pixel::PixelContext;
use crate::sat_bands::NUM_BANDS;

#[derive(Debug, Clone, PartialEq)]
pub struct AngstromFit {
    /// Exponent after the range fallback
    pub alpha: f64,
    pub beta: f64,
    /// Regression exponent before the fallback, `None` if degenerate
    pub tentative_alpha: Option<f64>,
    pub weights: [f64; NUM_BANDS],
    /// Bands counted three times in the regression
    pub doubled: [bool; NUM_BANDS],
    pub fallback: bool,
}

/// Result of the log-log regression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogLogFit {
    pub alpha: f64,
    pub beta: f64,
}

/// Ordinary least squares on `(ln lambda, ln aot)` with integer multiplicities.
///
/// Bands with `multiplicity == 0` or a non-positive AOT are skipped. Returns
/// `None` when fewer than two distinct wavelengths remain.
pub fn log_log_regression(
    wavelengths: &[f64; NUM_BANDS],
    aot: &[f64; NUM_BANDS],
    multiplicity: &[u32; NUM_BANDS],
) -> Option<LogLogFit> {
    let mut n = 0.0;
    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    for band in 0..NUM_BANDS {
        if multiplicity[band] == 0 || aot[band] <= 0.0 {
            continue;
        }
        let m = multiplicity[band] as f64;
        n += m;
        sum_x += m * wavelengths[band].ln();
        sum_y += m * aot[band].ln();
    }
    if n < 2.0 {
        return None;
    }
    let mean_x = sum_x / n;
    let mean_y = sum_y / n;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for band in 0..NUM_BANDS {
        if multiplicity[band] == 0 || aot[band] <= 0.0 {
            continue;
        }
        let m = multiplicity[band] as f64;
        let dx = wavelengths[band].ln() - mean_x;
        let dy = aot[band].ln() - mean_y;
        sxy += m * dx * dy;
        sxx += m * dx * dx;
    }
    if sxx <= 0.0 {
        return None;
    }

    let alpha = -sxy / sxx;
    Some(LogLogFit {
        alpha,
        beta: (mean_y + mean_x * alpha).exp(),
    })
}

/// Unweighted regression over the fit-selected bands.
pub fn fit_simple(
    wavelengths: &[f64; NUM_BANDS],
    aot: &[f64; NUM_BANDS],
    selected: &[bool; NUM_BANDS],
) -> Option<f64> {
    let multiplicity = selected.map(u32::from);
    log_log_regression(wavelengths, aot, &multiplicity).map(|fit| fit.alpha)
}

/// Local slope and back-projection discrepancy of one anchor/partner pair.
fn pair_statistics(
    ctx: &PixelContext,
    state: &PixelState,
    anchor: usize,
    partner: usize,
) -> Option<(f64, f64)> {
    let aot_anchor = state.aot[anchor];
    let aot_partner = state.aot[partner];
    if aot_anchor <= 0.0 || aot_partner <= 0.0 {
        return None;
    }
    let lambda_anchor = ctx.wavelength(anchor);
    let lambda_partner = ctx.wavelength(partner);

    let slope = -(aot_partner / aot_anchor).ln() / (lambda_partner / lambda_anchor).ln();
    let projected = angstrom(aot_partner, lambda_partner, lambda_anchor, state.alpha);
    let discrepancy = (aot_anchor - projected) / aot_anchor;

    Some((slope, discrepancy))
}

fn within(window: &PairWindow, slope: f64, discrepancy: f64) -> bool {
    (window.d_min..=window.d_max).contains(&discrepancy)
        && (window.a_min..=window.a_max).contains(&slope)
}

fn is_in_range(state: &PixelState, band: usize) -> bool {
    state.aot_flags[band].is_in_range() && state.aot[band] > 0.0
}

/// Robust fit: consistent band pairs are weighted up and counted three times.
pub fn fit_weighted(ctx: &PixelContext, state: &PixelState) -> AngstromFit {
    let mut weights = [1.0; NUM_BANDS];
    let mut doubled = [false; NUM_BANDS];

    let pairs: Option<(usize, &[PairWindow])> = if is_in_range(state, 0) {
        Some((0, &PAIR_WINDOWS_BAND0))
    } else if is_in_range(state, 1) {
        Some((1, &PAIR_WINDOWS_BAND1))
    } else {
        None
    };

    if let Some((anchor, windows)) = pairs {
        for window in windows {
            let Some((slope, discrepancy)) = pair_statistics(ctx, state, anchor, window.partner)
            else {
                continue;
            };
            if within(window, slope, discrepancy) {
                weights[anchor] += PAIR_WEIGHT_BONUS;
                weights[window.partner] += PAIR_WEIGHT_BONUS;
                doubled[anchor] = true;
                doubled[window.partner] = true;
            }
        }
    }

    let multiplicity: [u32; NUM_BANDS] = std::array::from_fn(|band| {
        match (ctx.bands.fit_selected[band], doubled[band]) {
            (false, _) => 0,
            (true, false) => 1,
            (true, true) => 3,
        }
    });

    let regression = log_log_regression(&ctx.bands.wavelengths, &state.aot, &multiplicity);
    let tentative_alpha = regression.map(|fit| fit.alpha);

    let (alpha, beta, fallback) = match regression {
        Some(fit) if (ALPHA_FIT_MIN..=ALPHA_FIT_MAX).contains(&fit.alpha) => {
            (fit.alpha, fit.beta, false)
        }
        _ => {
            let beta = if is_in_range(state, 1) && state.aot[1] < AOT_MAX {
                let aot_mean = 0.5 * (state.aot[0] + state.aot[1]);
                let lambda_mean = 0.5 * (ctx.wavelength(0) + ctx.wavelength(1));
                aot_mean * lambda_mean.powf(ALPHA_NEUTRAL)
            } else {
                BETA_SMALL_AEROSOL
            };
            (ALPHA_NEUTRAL, beta, true)
        }
    };

    AngstromFit {
        alpha,
        beta,
        tentative_alpha,
        weights,
        doubled,
        fallback,
    }
}
