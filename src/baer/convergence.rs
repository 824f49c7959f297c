use crate::baer::constants::{
    DELTA_FLOOR, DELTA_OFFSET_AOT, DELTA_OFFSET_ZERO, RELAX_STEP_LARGE_DELTA,
    RELAX_STEP_SMALL_DELTA, REFERENCE_PAIR_WEIGHT, SURF_REFL_FLOOR,
};
use crate::baer::model::angstrom;
use crate::baer::state::{AotFlag, PixelState};
use crate::pixel::PixelContext;
use crate::sat_bands::NUM_BANDS;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RmsdOutcome {
    /// `+inf` when no band qualifies
    pub rmsd: f64,
    pub count: usize,
}

/// Reference point of the Angstrom prediction: `(aot, wavelength)`.
fn reference_point(ctx: &PixelContext, state: &PixelState) -> (f64, f64) {
    let band0 = state.aot_flags[0].is_in_range();
    let band1 = state.aot_flags[1].is_in_range();
    let w = REFERENCE_PAIR_WEIGHT;

    match (band0, band1) {
        (true, true) => (
            (w * state.aot[0] + state.aot[1]) / (w + 1.0),
            (w * ctx.wavelength(0) + ctx.wavelength(1)) / (w + 1.0),
        ),
        (true, false) => (state.aot[0], ctx.wavelength(0)),
        (false, true) => (state.aot[1], ctx.wavelength(1)),
        // beta is the AOT at 1 um
        (false, false) => (state.beta, 1.0),
    }
}

/// AOT predicted for `band` by the current Angstrom parameters.
pub fn predicted_aot(ctx: &PixelContext, state: &PixelState, band: usize) -> f64 {
    let (aot_ref, lambda_ref) = reference_point(ctx, state);
    angstrom(aot_ref, lambda_ref, ctx.wavelength(band), state.alpha)
}

/// Spectral smoothness of the per-band AOT around the Angstrom law.
///
/// Bands clamped from above are left out; with no band left the RMSD is
/// infinite so the pixel cannot pass as converged.
pub fn compute_rmsd(ctx: &PixelContext, state: &PixelState) -> RmsdOutcome {
    let mut sum = 0.0;
    let mut count = 0;

    for band in ctx.bands.fit_bands() {
        if state.aot_flags[band] == AotFlag::AboveMax {
            continue;
        }
        let residual = state.aot[band] - predicted_aot(ctx, state, band);
        sum += residual * residual;
        count += 1;
    }

    let rmsd = if count == 0 {
        f64::INFINITY
    } else {
        sum.sqrt() / count as f64
    };

    RmsdOutcome { rmsd, count }
}

/// How an out-of-range surface reflectance update is replaced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RelaxStep {
    /// Update stays within `[0, 1]`
    Accept,
    /// No correction possible, keep the previous value
    Revert,
    /// Move a fraction of the remaining distance towards 1
    Raise(f64),
    /// Remove a fraction of the previous value
    Lower(f64),
}

/// Picks the damped step for an update `old -> new` driven by `delta`.
pub fn relax_step(new: f64, delta: f64) -> RelaxStep {
    if (0.0..=1.0).contains(&new) {
        return RelaxStep::Accept;
    }
    if delta == 0.0 {
        return RelaxStep::Revert;
    }
    if new > 1.0 {
        if delta < 1.0 {
            RelaxStep::Raise(RELAX_STEP_SMALL_DELTA)
        } else {
            RelaxStep::Raise(RELAX_STEP_LARGE_DELTA)
        }
    } else if delta > -1.0 {
        RelaxStep::Lower(RELAX_STEP_SMALL_DELTA)
    } else {
        RelaxStep::Lower(RELAX_STEP_LARGE_DELTA)
    }
}

/// Relative AOT residual driving the surface update of one band.
fn relaxation_delta(ctx: &PixelContext, state: &PixelState, band: usize) -> f64 {
    let predicted = predicted_aot(ctx, state, band);

    if state.aero_refl[band] > 0.0 {
        if predicted <= 0.0 {
            return 0.0;
        }
        ((state.aot[band] - predicted) / predicted).max(DELTA_FLOOR)
    } else {
        let delta = (DELTA_OFFSET_AOT - predicted) / DELTA_OFFSET_AOT;
        if delta == 0.0 { DELTA_OFFSET_ZERO } else { delta }
    }
}

/// Corrects the surface reflectance of the fit-selected bands from the AOT
/// residuals. Returns the cumulative count of out-of-range updates.
pub fn relax_surface_reflectance(ctx: &PixelContext, state: &mut PixelState) -> u32 {
    let mut deltas = [0.0; NUM_BANDS];
    for band in ctx.bands.fit_bands() {
        deltas[band] = relaxation_delta(ctx, state, band);
    }

    for band in ctx.bands.fit_bands() {
        let delta = deltas[band];
        let mut old = state.surf_refl[band];
        let mut new = old * (1.0 + ctx.bands.coeff[band] * state.weights[band] * delta);
        if new == 0.0 {
            new = SURF_REFL_FLOOR;
        }
        // Damped steps scale with `old` and cannot leave negative values
        if old < 0.0 {
            old = SURF_REFL_FLOOR;
        }

        let step = relax_step(new, delta);
        if step != RelaxStep::Accept {
            state.jcount += 1;
        }
        state.surf_refl[band] = match step {
            RelaxStep::Accept => new,
            RelaxStep::Revert => old,
            RelaxStep::Raise(fraction) => old + fraction * (1.0 - old),
            RelaxStep::Lower(fraction) => old - fraction * old,
        };
    }

    state.jcount
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baer::fixtures;
    use crate::sat_bands::SpectralConstants;

    fn context_fixture() -> (SpectralConstants, crate::auxdata::AuxCoefficients) {
        (SpectralConstants::default(), fixtures::aux())
    }

    #[test]
    fn test_rmsd_of_flat_spectrum_is_zero() {
        let (bands, aux) = context_fixture();
        let pixel = fixtures::pixel(fixtures::clear_sky_toa());
        let ctx = PixelContext::new(&bands, &aux, &pixel).unwrap();
        let mut state = PixelState::new();
        state.aot = [0.1; NUM_BANDS];
        state.alpha = 0.0;

        let outcome = compute_rmsd(&ctx, &state);

        assert_eq!(outcome.count, 7);
        assert!(outcome.rmsd < 1e-12);
    }

    #[test]
    fn test_rmsd_of_power_law_is_small() {
        let (bands, aux) = context_fixture();
        let pixel = fixtures::pixel(fixtures::clear_sky_toa());
        let ctx = PixelContext::new(&bands, &aux, &pixel).unwrap();
        let mut state = PixelState::new();
        state.aot = bands.wavelengths.map(|l| 0.1 * l.powf(-1.3));
        state.alpha = 1.3;

        let smooth = compute_rmsd(&ctx, &state);
        state.aot[4] *= 1.3;
        let rough = compute_rmsd(&ctx, &state);

        // The 6:1 reference pair is a linear blend, so a pure power law
        // leaves a small residual
        assert!(smooth.rmsd < 1e-3);
        assert!(rough.rmsd > smooth.rmsd);
    }

    #[test]
    fn test_rmsd_single_band_left() {
        let (bands, aux) = context_fixture();
        let pixel = fixtures::pixel(fixtures::hazy_toa());
        let ctx = PixelContext::new(&bands, &aux, &pixel).unwrap();
        let mut state = PixelState::new();
        state.alpha = 1.0;
        state.beta = 0.5;
        for band in bands.fit_bands() {
            state.aot[band] = 2.0;
            state.aot_flags[band] = AotFlag::AboveMax;
        }
        state.aot[4] = 0.8;
        state.aot_flags[4] = AotFlag::InRange;

        let outcome = compute_rmsd(&ctx, &state);

        assert_eq!(outcome.count, 1);
        assert!(outcome.rmsd.is_finite());
        let expected = (0.8 - 0.5 * bands.wavelengths[4].powf(-1.0)).abs();
        assert!((outcome.rmsd - expected).abs() < 1e-12);
    }

    #[test]
    fn test_rmsd_without_bands_is_infinite() {
        let (bands, aux) = context_fixture();
        let pixel = fixtures::pixel(fixtures::hazy_toa());
        let ctx = PixelContext::new(&bands, &aux, &pixel).unwrap();
        let mut state = PixelState::new();
        state.aot_flags = [AotFlag::AboveMax; NUM_BANDS];

        let outcome = compute_rmsd(&ctx, &state);

        assert_eq!(outcome.count, 0);
        assert_eq!(outcome.rmsd, f64::INFINITY);
    }

    #[test]
    fn test_reference_pair_weighting() {
        let (bands, aux) = context_fixture();
        let pixel = fixtures::pixel(fixtures::clear_sky_toa());
        let ctx = PixelContext::new(&bands, &aux, &pixel).unwrap();
        let mut state = PixelState::new();
        state.aot[0] = 0.7;
        state.aot[1] = 0.0;
        state.alpha = 0.0;

        // alpha = 0 makes the prediction equal to the reference AOT
        assert!((predicted_aot(&ctx, &state, 5) - 0.6).abs() < 1e-12);

        state.aot_flags[1] = AotFlag::BelowZero;
        assert!((predicted_aot(&ctx, &state, 5) - 0.7).abs() < 1e-12);

        state.aot_flags[0] = AotFlag::AboveMax;
        state.beta = 0.25;
        assert!((predicted_aot(&ctx, &state, 5) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_relax_step_branches() {
        assert_eq!(relax_step(0.5, 3.0), RelaxStep::Accept);
        assert_eq!(relax_step(1.2, 0.0), RelaxStep::Revert);
        assert_eq!(relax_step(1.2, 0.5), RelaxStep::Raise(RELAX_STEP_SMALL_DELTA));
        assert_eq!(relax_step(1.2, 1.5), RelaxStep::Raise(RELAX_STEP_LARGE_DELTA));
        assert_eq!(relax_step(-0.1, -0.5), RelaxStep::Lower(RELAX_STEP_SMALL_DELTA));
        assert_eq!(relax_step(-0.1, -1.5), RelaxStep::Lower(RELAX_STEP_LARGE_DELTA));
    }

    #[test]
    fn test_relaxation_moves_surface_towards_consistency() {
        let (bands, aux) = context_fixture();
        let pixel = fixtures::pixel(fixtures::clear_sky_toa());
        let ctx = PixelContext::new(&bands, &aux, &pixel).unwrap();
        let mut state = PixelState::new();
        state.aot = bands.wavelengths.map(|l| 0.1 * l.powf(-1.3));
        state.alpha = 1.3;
        state.aero_refl = [0.05; NUM_BANDS];
        state.surf_refl = [0.1; NUM_BANDS];
        // Band 3 shows too much aerosol, so its surface must brighten
        state.aot[3] *= 1.2;
        // Band 5 shows too little
        state.aot[5] *= 0.9;

        let jcount = relax_surface_reflectance(&ctx, &mut state);

        assert_eq!(jcount, 0);
        assert!(state.surf_refl[3] > 0.1);
        assert!(state.surf_refl[5] < 0.1);
        assert!((state.surf_refl[2] - 0.1).abs() < 1e-3);
        // Bands outside the fit are untouched
        assert_eq!(state.surf_refl[10], 0.1);
    }

    #[test]
    fn test_out_of_range_update_is_damped() {
        let (bands, aux) = context_fixture();
        let pixel = fixtures::pixel(fixtures::clear_sky_toa());
        let ctx = PixelContext::new(&bands, &aux, &pixel).unwrap();
        let mut state = PixelState::new();
        state.aot = bands.wavelengths.map(|l| 0.1 * l.powf(-1.3));
        state.alpha = 1.3;
        state.aero_refl = [0.05; NUM_BANDS];
        state.surf_refl = [0.1; NUM_BANDS];
        state.surf_refl[2] = 0.9;
        state.aot[2] *= 1.4;
        state.jcount = 7;

        let jcount = relax_surface_reflectance(&ctx, &mut state);

        assert_eq!(jcount, 8);
        let expected = 0.9 + RELAX_STEP_SMALL_DELTA * 0.1;
        assert!((state.surf_refl[2] - expected).abs() < 1e-12);
    }

    #[test]
    fn test_zero_update_uses_floor() {
        let (bands, aux) = context_fixture();
        let pixel = fixtures::pixel(fixtures::clear_sky_toa());
        let ctx = PixelContext::new(&bands, &aux, &pixel).unwrap();
        let mut state = PixelState::new();
        state.aot = bands.wavelengths.map(|l| 0.1 * l.powf(-1.3));
        state.alpha = 1.3;
        state.aero_refl = [0.05; NUM_BANDS];

        relax_surface_reflectance(&ctx, &mut state);

        for band in bands.fit_bands() {
            assert_eq!(state.surf_refl[band], SURF_REFL_FLOOR);
        }
    }

    #[test]
    fn test_negative_surface_recovers_positive() {
        let (bands, aux) = context_fixture();
        let pixel = fixtures::pixel(fixtures::clear_sky_toa());
        let ctx = PixelContext::new(&bands, &aux, &pixel).unwrap();
        let mut state = PixelState::new();
        state.aot = bands.wavelengths.map(|l| 0.1 * l.powf(-1.3));
        state.alpha = 1.3;
        state.aero_refl = [0.05; NUM_BANDS];
        state.surf_refl = [-0.01; NUM_BANDS];

        let jcount = relax_surface_reflectance(&ctx, &mut state);

        assert_eq!(jcount, 7);
        let expected = SURF_REFL_FLOOR * (1.0 - RELAX_STEP_SMALL_DELTA);
        for band in bands.fit_bands() {
            assert!((state.surf_refl[band] - expected).abs() < 1e-15);
        }
    }
}
