/// Generates sine wave tones with envelope shaping
pub struct ToneGenerator {
    frequency_hz: f32,
    sample_rate: f32,
    phase: f64,
    // Envelope for click-free keying (in samples)
    ramp_samples: usize,
}

impl ToneGenerator {
    pub fn new(frequency_hz: f32, sample_rate: u32, ramp_ms: f32) -> Self {
        let ramp_samples = (sample_rate as f32 * ramp_ms / 1000.0).round().max(1.0) as usize;

        Self {
            frequency_hz,
            sample_rate: sample_rate as f32,
            phase: 0.0,
            ramp_samples,
        }
    }

    pub fn ramp_samples(&self) -> usize {
        self.ramp_samples
    }

    /// Generate a sample at the current phase
    pub fn next_sample(&mut self) -> f32 {
        let sample = (self.phase * 2.0 * std::f64::consts::PI).sin() as f32;
        self.phase += self.frequency_hz as f64 / self.sample_rate as f64;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        sample
    }

    /// Raised cosine envelope, symmetric so both the first and last sample
    /// of a tone are silent. Tones shorter than two ramps get a shorter ramp.
    pub fn envelope(&self, position: usize, total: usize) -> f32 {
        let ramp = self.ramp_samples.min(total / 2);
        if ramp == 0 || position >= total {
            return if position < total { 1.0 } else { 0.0 };
        }

        let edge = position.min(total - 1 - position);
        if edge < ramp {
            0.5 * (1.0 - (std::f32::consts::PI * edge as f32 / ramp as f32).cos())
        } else {
            1.0
        }
    }

    /// Reset phase (for starting fresh)
    pub fn reset_phase(&mut self) {
        self.phase = 0.0;
    }
}
