//! Morse code training engine.
//!
//! Characters are resolved through a [`morse::CodeTable`], expanded into
//! timed tone/silence events, and rendered into click-free audio. A
//! [`drill::Scheduler`] decides what to drill next from the learner's
//! accuracy and response times, and a [`drill::DrillSession`] ties the
//! pieces together. Playback, input capture and persistence stay with the
//! caller.

pub mod audio;
pub mod config;
pub mod drill;
pub mod error;
pub mod export;
pub mod morse;
pub mod stats;

pub use audio::{render, Renderer, Waveform};
pub use config::{DrillMode, TrainerSettings};
pub use drill::{
    score, Attempt, CharacterProficiency, DrillItem, DrillSession, DrillTarget, LessonState,
    Scheduler,
};
pub use error::{TrainerError, TrainerResult};
pub use morse::{
    expand, expand_sequence, unit_ms_from_wpm, Alphabet, CodeSymbol, CodeTable, SequenceItem,
    TimingEvent, TimingKind,
};
