//! Per-pixel fixed-point iteration
//!
//! Every pass re-estimates the per-band AOT from the current surface
//! reflectance, fits the Angstrom law, measures the spectral smoothness of the
//! AOT and either terminates or relaxes the surface reflectance for the next
//! pass. Each exit path is a [`Termination`] value.

use crate::baer::angstrom::{fit_simple, fit_weighted};
use crate::baer::aot_estimator::estimate_all;
use crate::baer::constants::{
    ALPHA_RETRY_MAX, ALPHA_TRUSTED_MAX, ALPHA_TRUSTED_MIN, AOT_MAX, BEST_RMSD_SLACK, JCOUNT_MAX,
    PASS_LIMIT_FACTOR, RMSD_CONVERGED,
};
use crate::baer::convergence::{compute_rmsd, relax_surface_reflectance};
use crate::baer::model::{angstrom, clamp_aot};
use crate::baer::state::{AlphaFlag, AotFlag, PixelState};
use crate::baer::surface_init::{self, SurfaceInit};
use crate::pixel::PixelContext;
use crate::sat_bands::NUM_BANDS;

/// Why the iteration stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Smooth AOT spectrum with a trusted exponent
    Converged,
    /// Small RMSD, exponent recomputed with the unweighted fit
    AlphaConverged,
    /// A fit-selected band hit an AOT clamp
    BandFailure,
    /// Too many clamped bands over all passes
    ConstExceeded,
    /// Too many out-of-range surface reflectance updates
    RmsdIterationExceeded,
    /// Pass budget exhausted, best-effort values kept
    IterationLimit,
    /// RMSD diverged, reverted to the best pass
    RetryWithBest,
}

impl Termination {
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            Termination::BandFailure
                | Termination::ConstExceeded
                | Termination::RmsdIterationExceeded
        )
    }
}

/// Terminal state of one pixel.
#[derive(Debug, Clone)]
pub struct Retrieval {
    pub termination: Termination,
    pub state: PixelState,
    /// Passes that ended above `RMSD_CONST`
    pub iterations: u32,
    pub passes: u32,
}

/// AOT spectrum, band flags and exponent of the smoothest pass so far.
#[derive(Debug, Clone, PartialEq)]
pub struct BestSoFar {
    pub aot: [f64; NUM_BANDS],
    pub aot_flags: [AotFlag; NUM_BANDS],
    /// Tentative exponent of that pass
    pub alpha: f64,
    pub rmsd: f64,
    /// RMSD above which a later pass reverts to this one
    pub threshold: f64,
}

/// Keeps the best pass and decides when a diverging pixel reverts to it.
#[derive(Debug, Default)]
pub struct BestTracker {
    best: Option<BestSoFar>,
    previous_rmsd: Option<f64>,
}

impl BestTracker {
    pub fn best(&self) -> Option<&BestSoFar> {
        self.best.as_ref()
    }

    /// Records one pass. Returns the snapshot to revert to, if any.
    pub fn observe(&mut self, state: &PixelState) -> Option<BestSoFar> {
        let rmsd = state.rmsd;
        // First pass
        let previous = self.previous_rmsd.replace(rmsd)?;

        if rmsd <= previous && rmsd.is_finite() {
            self.best = Some(BestSoFar {
                aot: state.aot,
                aot_flags: state.aot_flags,
                alpha: state.alpha_tentative,
                rmsd,
                threshold: BEST_RMSD_SLACK * rmsd,
            });
            return None;
        }

        if state.has_flag_aot {
            return None;
        }
        match &self.best {
            Some(best) if rmsd > best.threshold => Some(best.clone()),
            _ => None,
        }
    }
}

/// Exponent kept when reverting: the tentative one wins when the stored one
/// lies further out on the same side of the trusted range.
pub fn revert_alpha(best_alpha: f64, tentative_alpha: f64) -> f64 {
    if best_alpha > ALPHA_TRUSTED_MAX && best_alpha > tentative_alpha {
        tentative_alpha
    } else if best_alpha < ALPHA_TRUSTED_MIN && best_alpha < tentative_alpha {
        tentative_alpha
    } else {
        best_alpha
    }
}

/// Outcome of the convergence check of one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvergenceStep {
    Accept,
    /// Converged with an exponent above the trusted range
    HighAlpha,
    /// Converged with an exponent below the trusted range
    LowAlpha,
    NotConverged,
}

pub fn convergence_step(count: usize, rmsd: f64, alpha_flag: AlphaFlag) -> ConvergenceStep {
    if count < 2 || rmsd > RMSD_CONVERGED {
        return ConvergenceStep::NotConverged;
    }
    match alpha_flag {
        AlphaFlag::InRange => ConvergenceStep::Accept,
        AlphaFlag::TooHigh => ConvergenceStep::HighAlpha,
        AlphaFlag::TooLow => ConvergenceStep::LowAlpha,
    }
}

/// Working state seeded from the surface initialisation.
pub fn seed_state(ctx: &PixelContext, init: &SurfaceInit) -> PixelState {
    let mut state = PixelState::new();
    let lambda0 = ctx.wavelength(0);

    for band in 0..NUM_BANDS {
        let aot = clamp_aot(angstrom(
            init.aot_guess_band0,
            lambda0,
            ctx.wavelength(band),
            init.alpha_help,
        ));
        state.aot[band] = aot;
        state.aot_guess[band] = aot;
    }
    state.surf_refl = init.surf_refl;
    state.alpha = init.alpha_help;
    state.alpha_tentative = init.alpha_help;
    state.beta = state.aot[0] * lambda0.powf(init.alpha_help);

    state
}

/// Re-extrapolates the single saturated band of a pass from the slope of the
/// others and refits the exponent with it.
fn refine_saturated_band(ctx: &PixelContext, state: &mut PixelState) {
    let Some(high) = state.last_high_band else {
        return;
    };
    let wavelengths = &ctx.bands.wavelengths;

    let mut others = ctx.bands.fit_selected;
    others[high] = false;
    let Some(alpha) = fit_simple(wavelengths, &state.aot, &others) else {
        return;
    };

    let anchor = if high == 0 { 1 } else { 0 };
    state.aot[high] = clamp_aot(angstrom(
        state.aot[anchor],
        ctx.wavelength(anchor),
        ctx.wavelength(high),
        alpha,
    ));
    if state.aot[high] < AOT_MAX {
        state.aot_flags[high] = AotFlag::InRange;
    }

    if let Some(alpha) = fit_simple(wavelengths, &state.aot, &ctx.bands.fit_selected) {
        state.alpha = alpha;
    }
}

/// Replaces the fitted exponent by the unweighted one when it is trusted.
fn accept_simple_alpha(ctx: &PixelContext, state: &mut PixelState) {
    let simple = fit_simple(&ctx.bands.wavelengths, &state.aot, &ctx.bands.fit_selected);
    if let Some(alpha) = simple
        && (ALPHA_TRUSTED_MIN..=ALPHA_TRUSTED_MAX).contains(&alpha)
    {
        state.alpha = alpha;
    }
}

/// Runs the retrieval for one pixel from the surface initialisation on.
pub fn run(ctx: &PixelContext) -> Retrieval {
    let init = surface_init::init(ctx);
    iterate(ctx, seed_state(ctx, &init))
}

/// Iterates an already seeded state until a termination reason fires.
pub fn iterate(ctx: &PixelContext, mut state: PixelState) -> Retrieval {
    let bands = ctx.bands;
    let pass_limit = PASS_LIMIT_FACTOR * bands.iteration_max;
    let mut tracker = BestTracker::default();
    let mut alpha_retries = 0;
    let mut passes = 0;

    let termination = loop {
        if passes >= pass_limit {
            break Termination::IterationLimit;
        }
        passes += 1;
        state.begin_pass();

        let num_const = estimate_all(ctx, &mut state);
        state.num_const_total += num_const;
        if num_const > 0 && state.icheck == 1 {
            refine_saturated_band(ctx, &mut state);
        }
        state.update_has_flag_aot(&bands.fit_selected);

        let fit = fit_weighted(ctx, &state);
        state.alpha = fit.alpha;
        state.beta = fit.beta;
        state.weights = fit.weights;
        state.alpha_tentative = fit.tentative_alpha.unwrap_or(fit.alpha);
        state.alpha_flag = AlphaFlag::classify(state.alpha_tentative);

        let outcome = compute_rmsd(ctx, &state);
        state.rmsd = outcome.rmsd;

        if let Some(best) = tracker.observe(&state) {
            state.aot = best.aot;
            state.aot_flags = best.aot_flags;
            state.update_has_flag_aot(&bands.fit_selected);
            state.alpha = revert_alpha(best.alpha, state.alpha_tentative);
            state.rmsd = best.rmsd;
            break Termination::RetryWithBest;
        }

        if state.has_flag_aot {
            break Termination::BandFailure;
        }

        match convergence_step(outcome.count, state.rmsd, state.alpha_flag) {
            ConvergenceStep::Accept => break Termination::Converged,
            ConvergenceStep::HighAlpha if alpha_retries < ALPHA_RETRY_MAX => {
                alpha_retries += 1;
                continue;
            }
            ConvergenceStep::LowAlpha => continue,
            ConvergenceStep::HighAlpha | ConvergenceStep::NotConverged => {}
        }

        if relax_surface_reflectance(ctx, &mut state) > JCOUNT_MAX {
            break Termination::RmsdIterationExceeded;
        }

        if state.num_const_total > bands.const_max {
            break Termination::ConstExceeded;
        }

        if state.rmsd > bands.rmsd_const {
            state.iteration += 1;
            if state.iteration >= bands.iteration_max {
                break Termination::IterationLimit;
            }
            continue;
        }

        if state.alpha_flag == AlphaFlag::TooLow {
            continue;
        }

        accept_simple_alpha(ctx, &mut state);
        break Termination::AlphaConverged;
    };

    log::debug!(
        "Pixel terminated with {:?} after {} passes (rmsd {:.5}, alpha {:.3})",
        termination,
        passes,
        state.rmsd,
        state.alpha
    );

    Retrieval {
        termination,
        iterations: state.iteration,
        state,
        passes,
    }
}
