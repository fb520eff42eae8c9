//! Spectrum smoothing and magnitude scaling utilities

/// Applies per-bin exponential smoothing across analyzer snapshots
pub struct SpectrumSmoother {
    time_constant: f32,
    smoothed: Vec<f32>,
}

impl SpectrumSmoother {
    /// Create a smoother for `bins` bins, all starting at zero
    pub fn new(bins: usize, time_constant: f32) -> Self {
        Self {
            time_constant: time_constant.clamp(0.0, 1.0),
            smoothed: vec![0.0; bins],
        }
    }

    /// Blend a new magnitude snapshot into the running values
    /// Returns the smoothed magnitudes
    pub fn update(&mut self, magnitudes: &[f32]) -> &[f32] {
        let tau = self.time_constant;
        for (smoothed, &raw) in self.smoothed.iter_mut().zip(magnitudes) {
            let value = tau * *smoothed + (1.0 - tau) * raw;
            // A NaN or infinity would otherwise stick forever
            *smoothed = if value.is_finite() { value } else { 0.0 };
        }
        &self.smoothed
    }
}

/// Convert linear amplitude to decibels
pub fn amplitude_to_db(amplitude: f32) -> f32 {
    if amplitude > 0.0 {
        20.0 * amplitude.log10()
    } else {
        f32::NEG_INFINITY
    }
}

/// Map a decibel value onto 0..=255 over the `min_db..max_db` range
pub fn db_to_byte(db: f32, min_db: f32, max_db: f32) -> u8 {
    if !db.is_finite() || db <= min_db {
        return 0;
    }
    let scaled = 255.0 * (db - min_db) / (max_db - min_db);
    scaled.floor().clamp(0.0, 255.0) as u8
}
