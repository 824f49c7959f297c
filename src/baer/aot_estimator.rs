use crate::baer::constants::AOT_MAX;
use crate::baer::model::{angstrom, aot_from_reflectance, clamp_aot, h2_term};
use crate::baer::state::{AotFlag, PixelState};
use crate::pixel::PixelContext;
use crate::sat_bands::NUM_BANDS;

/// Classifies a raw inverted AOT against `[0, AOT_MAX]`.
pub fn clamp_with_flag(raw: f64) -> (f64, AotFlag) {
    if raw < 0.0 {
        (0.0, AotFlag::BelowZero)
    } else if raw > AOT_MAX {
        (AOT_MAX, AotFlag::AboveMax)
    } else {
        (raw, AotFlag::InRange)
    }
}

/// Updates the aerosol reflectance and AOT of one band.
///
/// `alpha_prev` is the exponent of the previous fit; bands that cannot be
/// inverted borrow band 0's AOT through it. Band 0 must be estimated before
/// the other bands of a pass. Returns `num_const` incremented by one when the
/// band was clamped.
pub fn estimate_band(
    ctx: &PixelContext,
    state: &mut PixelState,
    band: usize,
    alpha_prev: f64,
    num_const: u32,
) -> u32 {
    let aot = state.aot_guess[band];
    let h2 = h2_term(ctx, state.surf_refl[band], aot);
    state.aero_refl[band] = (ctx.toa(band) - h2) * ctx.geometry.phase_ratio;

    if !ctx.bands.fit_selected[band] || state.aero_refl[band] <= 0.0 {
        let extrapolated = clamp_aot(angstrom(
            state.aot[0],
            ctx.wavelength(0),
            ctx.wavelength(band),
            alpha_prev,
        ));
        state.aot_guess[band] = extrapolated;
        state.aot[band] = extrapolated;
        state.aot_flags[band] = AotFlag::InRange;
        return num_const;
    }

    // aero_refl already carries the phase ratio
    let x = state.aero_refl[band] * ctx.geometry.geometry_norm;
    let raw = aot_from_reflectance(ctx, band, x);
    let (value, flag) = clamp_with_flag(raw);

    state.aot_guess[band] = value;
    state.aot[band] = value;
    state.aot_flags[band] = flag;

    match flag {
        AotFlag::InRange => num_const,
        AotFlag::BelowZero => num_const + 1,
        AotFlag::AboveMax => {
            state.last_high_band = Some(band);
            state.icheck += 1;
            num_const + 1
        }
    }
}

/// Runs [`estimate_band`] over every band in index order.
pub fn estimate_all(ctx: &PixelContext, state: &mut PixelState) -> u32 {
    let alpha_prev = state.alpha;
    (0..NUM_BANDS).fold(0, |num_const, band| {
        estimate_band(ctx, state, band, alpha_prev, num_const)
    })
}
