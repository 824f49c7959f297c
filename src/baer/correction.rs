use crate::baer::model::{reflectance_from_aot, transmission};
use crate::pixel::PixelContext;
use crate::sat_bands::NUM_BANDS;

/// Converts TOA reflectance to surface reflectance once the aerosol is known.
///
/// Implementations are shared between worker threads and must not hold
/// per-pixel state.
pub trait AtmosphericCorrection: Sync {
    fn correct(&self, ctx: &PixelContext, aot: &[f64; NUM_BANDS], alpha: f64) -> [f64; NUM_BANDS];
}

/// Inverts the forward model used by the retrieval,
/// `toa = r_aer + Td * Tu * rs / (1 - s * rs)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForwardModelCorrection;

impl ForwardModelCorrection {
    fn correct_band(ctx: &PixelContext, band: usize, aot: f64) -> f64 {
        let aerosol = reflectance_from_aot(ctx, band, aot);
        let t_down = transmission(ctx, ctx.geometry.mus, aot);
        let t_up = transmission(ctx, ctx.geometry.muv, aot);
        let s = ctx.aux.hemispherical(aot);

        let y = (ctx.toa(band) - aerosol) / (t_down * t_up);
        y / (1.0 + s * y)
    }
}

impl AtmosphericCorrection for ForwardModelCorrection {
    fn correct(&self, ctx: &PixelContext, aot: &[f64; NUM_BANDS], _alpha: f64) -> [f64; NUM_BANDS] {
        std::array::from_fn(|band| Self::correct_band(ctx, band, aot[band]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baer::fixtures;
    use crate::baer::model::h2_term;
    use crate::sat_bands::SpectralConstants;

    #[test]
    fn test_correction_recovers_surface() {
        let bands = SpectralConstants::default();
        let aux = fixtures::aux();
        let surface: [f64; NUM_BANDS] = std::array::from_fn(|band| 0.03 + 0.02 * band as f64);
        let aot: [f64; NUM_BANDS] = bands.wavelengths.map(|l| 0.05 * (l / 0.4127).powf(-1.3));

        let blank = fixtures::pixel([0.0; NUM_BANDS]);
        let blank_ctx = PixelContext::new(&bands, &aux, &blank).unwrap();
        let toa: [f64; NUM_BANDS] = std::array::from_fn(|band| {
            reflectance_from_aot(&blank_ctx, band, aot[band])
                + h2_term(&blank_ctx, surface[band], aot[band])
        });
        let pixel = fixtures::pixel(toa);
        let ctx = PixelContext::new(&bands, &aux, &pixel).unwrap();

        let corrected = ForwardModelCorrection.correct(&ctx, &aot, 1.3);

        for band in 0..NUM_BANDS {
            assert!(
                (corrected[band] - surface[band]).abs() < 1e-9,
                "band {band}: {} vs {}",
                corrected[band],
                surface[band]
            );
        }
    }

    #[test]
    fn test_transparent_atmosphere_is_identity() {
        let bands = SpectralConstants::default();
        let aux = fixtures::transparent_aux();
        let pixel = fixtures::pixel([0.2; NUM_BANDS]);
        let ctx = PixelContext::new(&bands, &aux, &pixel).unwrap();

        let corrected = ForwardModelCorrection.correct(&ctx, &[0.0; NUM_BANDS], 1.0);

        assert!(corrected.iter().all(|&r| (r - 0.2).abs() < 1e-12));
    }
}
