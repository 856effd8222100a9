pub mod renderer;
pub mod tone;

pub use renderer::{render, sample_count, Renderer, Waveform, DEFAULT_RAMP_MS};
pub use tone::ToneGenerator;
