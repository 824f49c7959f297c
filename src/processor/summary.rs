use crate::baer::PixelRecord;

/// Statistics over the records of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    pub masked: usize,
    pub alpha_out_of_range: usize,
    pub aot_out_of_range: usize,
    /// AOT at 550 nm over valid pixels as (min, max, mean)
    pub aot_550: Option<(f64, f64, f64)>,
}

impl RunSummary {
    pub fn from_records(records: &[PixelRecord]) -> Self {
        let valid_aot: Vec<f64> = records
            .iter()
            .filter(|r| r.is_valid())
            .map(|r| r.aot_550)
            .filter(|v| v.is_finite())
            .collect();

        let aot_550 = if valid_aot.is_empty() {
            None
        } else {
            Some((
                valid_aot.iter().fold(f64::INFINITY, |a, &b| a.min(b)),
                valid_aot.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b)),
                valid_aot.iter().sum::<f64>() / valid_aot.len() as f64,
            ))
        };

        Self {
            total: records.len(),
            valid: records.iter().filter(|r| r.is_valid()).count(),
            invalid: records.iter().filter(|r| r.flags.invalid).count(),
            masked: records.iter().filter(|r| r.flags.masked).count(),
            alpha_out_of_range: records.iter().filter(|r| r.flags.alpha_out_of_range).count(),
            aot_out_of_range: records.iter().filter(|r| r.flags.aot_out_of_range).count(),
            aot_550,
        }
    }

    pub fn log(&self) {
        log::info!(
            "Valid pixels: {} / {} ({:.1}%), invalid: {}, masked: {}",
            self.valid,
            self.total,
            if self.total == 0 {
                0.0
            } else {
                100.0 * self.valid as f64 / self.total as f64
            },
            self.invalid,
            self.masked
        );
        log::info!(
            "Flags - alpha out of range: {}, AOT out of range: {}",
            self.alpha_out_of_range,
            self.aot_out_of_range
        );

        match self.aot_550 {
            Some((min, max, mean)) => log::info!(
                "AOT 550 nm - Min: {:.4}, Max: {:.4}, Mean: {:.4}",
                min,
                max,
                mean
            ),
            None => log::warn!("No valid pixels, AOT statistics unavailable"),
        }
    }
}
