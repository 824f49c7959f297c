//! Forward model shared by the retrieval stages
//!
//! Aerosol reflectance is related to AOT through a per-band quadratic,
//! `AOT = a*x^2 + b*x + c`, where `x` is the aerosol reflectance normalised
//! to the reference scattering angle and cosine product of the tables.

use crate::baer::constants::{AOT_MAX, H2_DENOMINATOR_MIN};
use crate::pixel::PixelContext;

/// Solves `a*x^2 + b*x + (c - d) = 0` for the aerosol reflectance.
///
/// Returns the smaller strictly positive root, or `0.0` when the discriminant
/// is negative or neither root is positive. A zero `a` reduces to the linear
/// root under the same positivity rule.
pub fn equation_resolution(a: f64, b: f64, c: f64, d: f64) -> f64 {
    let c = c - d;

    if a == 0.0 {
        if b == 0.0 {
            return 0.0;
        }
        let x = -c / b;
        return if x > 0.0 { x } else { 0.0 };
    }

    let delta = b * b - 4.0 * a * c;
    if delta < 0.0 {
        return 0.0;
    }

    let sqrt_delta = delta.sqrt();
    let x1 = (-b - sqrt_delta) / (2.0 * a);
    let x2 = (-b + sqrt_delta) / (2.0 * a);

    match (x1 > 0.0, x2 > 0.0) {
        (true, true) => x1.min(x2),
        (true, false) => x1,
        (false, true) => x2,
        (false, false) => 0.0,
    }
}

/// Angstrom power law: AOT at `lambda` from a reference AOT at `lambda_ref`.
pub fn angstrom(aot_ref: f64, lambda_ref: f64, lambda: f64, alpha: f64) -> f64 {
    aot_ref * (lambda / lambda_ref).powf(-alpha)
}

pub fn clamp_aot(aot: f64) -> f64 {
    aot.clamp(0.0, AOT_MAX)
}

/// TOA-geometry aerosol reflectance to the normalised table abscissa.
pub fn normalise(ctx: &PixelContext, reflectance: f64) -> f64 {
    reflectance * ctx.geometry.phase_ratio * ctx.geometry.geometry_norm
}

pub fn denormalise(ctx: &PixelContext, x: f64) -> f64 {
    x / (ctx.geometry.phase_ratio * ctx.geometry.geometry_norm)
}

/// Direct evaluation of the band's quadratic.
///
/// Past the vertex of a concave model the AOT would decrease again, so the
/// abscissa saturates at the vertex.
pub fn aot_from_reflectance(ctx: &PixelContext, band: usize, x: f64) -> f64 {
    let [a, b, c] = ctx.aux.aer_phase(band);
    let mut x = x;
    if a < 0.0 {
        let vertex = -b / (2.0 * a);
        if x > vertex {
            x = vertex;
        }
    }
    a * x * x + b * x + c
}

/// Aerosol reflectance at TOA geometry producing `aot` in the given band.
pub fn reflectance_from_aot(ctx: &PixelContext, band: usize, aot: f64) -> f64 {
    let [a, b, c] = ctx.aux.aer_phase(band);
    denormalise(ctx, equation_resolution(a, b, c, aot))
}

/// Aerosol diffuse transmission along a path with cosine `mu`.
pub fn transmission(ctx: &PixelContext, mu: f64, aot: f64) -> f64 {
    let scaled_mu = mu * ctx.geometry.pressure_ratio;
    (-ctx.aux.transmission_coefficient(scaled_mu) * aot / scaled_mu).exp()
}

/// Multiply scattered surface contribution to the TOA signal.
pub fn h2_term(ctx: &PixelContext, surf_refl: f64, aot: f64) -> f64 {
    let t_down = transmission(ctx, ctx.geometry.mus, aot);
    let t_up = transmission(ctx, ctx.geometry.muv, aot);
    let s = ctx.aux.hemispherical(aot);
    let denominator = (1.0 - s * surf_refl).max(H2_DENOMINATOR_MIN);
    t_down * t_up * surf_refl / denominator
}
