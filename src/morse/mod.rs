pub mod table;
pub mod timing;

pub use table::{normalize, Alphabet, CodeSymbol, CodeTable, MorseUnit};
pub use timing::{
    expand, expand_sequence, parse_text, total_duration_ms, total_units, unit_ms_from_wpm,
    SequenceItem, TimingEvent, TimingKind,
};
