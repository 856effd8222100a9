use rayon::prelude::*;

use super::tone::ToneGenerator;
use crate::config::AudioSettings;
use crate::error::{TrainerError, TrainerResult};
use crate::morse::{TimingEvent, TimingKind};

/// Default attack/release time for click-free keying
pub const DEFAULT_RAMP_MS: f32 = 5.0;

/// Sequences with at least this many events render their segments in parallel
const PARALLEL_MIN_EVENTS: usize = 64;

/// Rendered mono audio. Samples are in [-1.0, 1.0].
#[derive(Clone, Debug, PartialEq)]
pub struct Waveform {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl Waveform {
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_ms(&self) -> f64 {
        self.samples.len() as f64 * 1000.0 / self.sample_rate as f64
    }

    /// Convert to 16-bit PCM, scaled by a volume in [0.0, 1.0]
    pub fn to_pcm_i16(&self, volume: f32) -> Vec<i16> {
        let scale = volume.clamp(0.0, 1.0) * i16::MAX as f32;
        self.samples
            .iter()
            .map(|s| (s * scale).round().clamp(i16::MIN as f32, i16::MAX as f32) as i16)
            .collect()
    }
}

/// Number of samples covering `duration_ms`, rounded half-up
pub fn sample_count(duration_ms: f64, sample_rate: u32) -> usize {
    round_half_up(duration_ms * sample_rate as f64 / 1000.0)
}

fn round_half_up(x: f64) -> usize {
    (x + 0.5).floor().max(0.0) as usize
}

/// Turns timing events into sampled audio
#[derive(Clone, Debug)]
pub struct Renderer {
    sample_rate: u32,
    tone_frequency_hz: f32,
    ramp_ms: f32,
    amplitude: f32,
}

impl Renderer {
    pub fn new(sample_rate: u32, tone_frequency_hz: f32) -> TrainerResult<Self> {
        if sample_rate == 0 {
            return Err(TrainerError::InvalidParameters(
                "sample rate must be positive".to_string(),
            ));
        }
        if !tone_frequency_hz.is_finite() || tone_frequency_hz <= 0.0 {
            return Err(TrainerError::InvalidParameters(format!(
                "tone frequency must be positive, got {}",
                tone_frequency_hz
            )));
        }
        if tone_frequency_hz >= sample_rate as f32 / 2.0 {
            return Err(TrainerError::InvalidParameters(format!(
                "tone frequency {} Hz is at or above Nyquist for {} Hz",
                tone_frequency_hz, sample_rate
            )));
        }

        Ok(Self {
            sample_rate,
            tone_frequency_hz,
            ramp_ms: DEFAULT_RAMP_MS,
            amplitude: 1.0,
        })
    }

    pub fn from_settings(settings: &AudioSettings) -> TrainerResult<Self> {
        Self::new(settings.sample_rate, settings.tone_frequency_hz)?.with_ramp_ms(settings.ramp_ms)
    }

    pub fn with_ramp_ms(mut self, ramp_ms: f32) -> TrainerResult<Self> {
        if !ramp_ms.is_finite() || ramp_ms <= 0.0 {
            return Err(TrainerError::InvalidParameters(format!(
                "envelope ramp must be positive, got {} ms",
                ramp_ms
            )));
        }
        self.ramp_ms = ramp_ms;
        Ok(self)
    }

    pub fn with_amplitude(mut self, amplitude: f32) -> TrainerResult<Self> {
        if !amplitude.is_finite() || amplitude <= 0.0 || amplitude > 1.0 {
            return Err(TrainerError::InvalidParameters(format!(
                "amplitude must be in (0, 1], got {}",
                amplitude
            )));
        }
        self.amplitude = amplitude;
        Ok(self)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Sample length of each event. Boundaries are rounded from the running
    /// total so long sequences do not drift.
    pub fn segment_lengths(&self, events: &[TimingEvent]) -> TrainerResult<Vec<usize>> {
        let mut lengths = Vec::with_capacity(events.len());
        let mut elapsed_ms = 0.0;
        let mut start = 0;

        for event in events {
            if !event.duration_ms.is_finite() || event.duration_ms <= 0.0 {
                return Err(TrainerError::InvalidParameters(format!(
                    "event duration must be positive, got {} ms",
                    event.duration_ms
                )));
            }
            elapsed_ms += event.duration_ms;
            let end = sample_count(elapsed_ms, self.sample_rate);
            lengths.push(end - start);
            start = end;
        }

        Ok(lengths)
    }

    pub fn render(&self, events: &[TimingEvent]) -> TrainerResult<Waveform> {
        let lengths = self.segment_lengths(events)?;
        let total: usize = lengths.iter().sum();

        let segments: Vec<Vec<f32>> = if events.len() >= PARALLEL_MIN_EVENTS {
            // Indexed collect keeps input order
            events
                .par_iter()
                .zip(lengths.par_iter())
                .map(|(event, &len)| self.render_segment(event.kind, len))
                .collect()
        } else {
            events
                .iter()
                .zip(lengths.iter())
                .map(|(event, &len)| self.render_segment(event.kind, len))
                .collect()
        };

        let mut samples = Vec::with_capacity(total);
        for segment in segments {
            samples.extend(segment);
        }

        Ok(Waveform {
            samples,
            sample_rate: self.sample_rate,
        })
    }

    fn render_segment(&self, kind: TimingKind, len: usize) -> Vec<f32> {
        if !kind.is_tone() {
            return vec![0.0; len];
        }

        let mut tone = ToneGenerator::new(self.tone_frequency_hz, self.sample_rate, self.ramp_ms);
        tone.reset_phase();
        (0..len)
            .map(|i| {
                let raw = tone.next_sample();
                raw * tone.envelope(i, len) * self.amplitude
            })
            .collect()
    }
}

/// Render with the default envelope at full amplitude
pub fn render(
    events: &[TimingEvent],
    sample_rate: u32,
    tone_frequency_hz: f32,
) -> TrainerResult<Waveform> {
    Renderer::new(sample_rate, tone_frequency_hz)?.render(events)
}
