use serde::{Deserialize, Serialize};

use super::table::{CodeSymbol, CodeTable};
use crate::error::{TrainerError, TrainerResult};

/// Units in the reference word PARIS, including its trailing word gap
pub const PARIS_UNITS: u32 = 50;

/// What a timing event sounds like
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimingKind {
    Tone,           // 1 or 3 units
    IntraSymbolGap, // 1 unit silence (between dot/dash in same character)
    InterSymbolGap, // 3 units silence (between characters)
    InterWordGap,   // 7 units silence (between words)
}

impl TimingKind {
    /// Returns true if this event produces a tone
    pub fn is_tone(&self) -> bool {
        matches!(self, TimingKind::Tone)
    }
}

/// A tone or silence of a fixed duration
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimingEvent {
    pub kind: TimingKind,
    pub units: u32,
    pub duration_ms: f64,
}

impl TimingEvent {
    fn new(kind: TimingKind, units: u32, unit_ms: f64) -> Self {
        Self {
            kind,
            units,
            duration_ms: units as f64 * unit_ms,
        }
    }
}

/// One entry of a sequence to be keyed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SequenceItem {
    Char(char),
    WordBoundary,
}

/// Unit length for a speed in words per minute (PARIS = 50 units)
pub fn unit_ms_from_wpm(wpm: f64) -> TrainerResult<f64> {
    if !wpm.is_finite() || wpm <= 0.0 {
        return Err(TrainerError::InvalidSpeed(wpm));
    }
    Ok(60_000.0 / (wpm * PARIS_UNITS as f64))
}

fn check_unit(unit_ms: f64) -> TrainerResult<()> {
    if !unit_ms.is_finite() || unit_ms <= 0.0 {
        return Err(TrainerError::InvalidSpeed(unit_ms));
    }
    Ok(())
}

fn push_symbol(events: &mut Vec<TimingEvent>, symbol: &CodeSymbol, unit_ms: f64) {
    let units = symbol.units();
    for (idx, unit) in units.iter().enumerate() {
        events.push(TimingEvent::new(TimingKind::Tone, unit.units(), unit_ms));
        // Element gap after each dot/dash except the last in character
        if idx < units.len() - 1 {
            events.push(TimingEvent::new(TimingKind::IntraSymbolGap, 1, unit_ms));
        }
    }
}

/// Expand a single character's symbol into timed events
pub fn expand(symbol: &CodeSymbol, unit_ms: f64) -> TrainerResult<Vec<TimingEvent>> {
    check_unit(unit_ms)?;
    let mut events = Vec::with_capacity(symbol.len() * 2);
    push_symbol(&mut events, symbol, unit_ms);
    Ok(events)
}

/// Expand a sequence of characters and word boundaries into one flat event list.
///
/// Characters within a word are separated by an inter-symbol gap, words by an
/// inter-word gap. Boundaries at the start or end, or repeated, add nothing.
pub fn expand_sequence(
    table: &CodeTable,
    items: &[SequenceItem],
    unit_ms: f64,
) -> TrainerResult<Vec<TimingEvent>> {
    check_unit(unit_ms)?;

    let mut events = Vec::new();
    let mut pending_boundary = false;

    for item in items {
        match *item {
            SequenceItem::WordBoundary => pending_boundary = true,
            SequenceItem::Char(ch) => {
                let symbol = table.encode(ch)?;
                if !events.is_empty() {
                    let gap = if pending_boundary {
                        TimingEvent::new(TimingKind::InterWordGap, 7, unit_ms)
                    } else {
                        TimingEvent::new(TimingKind::InterSymbolGap, 3, unit_ms)
                    };
                    events.push(gap);
                }
                pending_boundary = false;
                push_symbol(&mut events, symbol, unit_ms);
            }
        }
    }

    Ok(events)
}

/// Split text on whitespace into characters and word boundaries
pub fn parse_text(text: &str) -> Vec<SequenceItem> {
    let mut items = Vec::new();
    for (word_idx, word) in text.split_whitespace().enumerate() {
        if word_idx > 0 {
            items.push(SequenceItem::WordBoundary);
        }
        items.extend(word.chars().map(SequenceItem::Char));
    }
    items
}

pub fn total_duration_ms(events: &[TimingEvent]) -> f64 {
    events.iter().map(|e| e.duration_ms).sum()
}

pub fn total_units(events: &[TimingEvent]) -> u32 {
    events.iter().map(|e| e.units).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::morse::table::Alphabet;

    fn latin() -> &'static CodeTable {
        CodeTable::for_alphabet(Alphabet::Latin)
    }

    #[test]
    fn test_unit_from_wpm() {
        assert_eq!(unit_ms_from_wpm(20.0).unwrap(), 60.0);
        assert_eq!(unit_ms_from_wpm(12.0).unwrap(), 100.0);
        assert!(matches!(
            unit_ms_from_wpm(0.0),
            Err(TrainerError::InvalidSpeed(_))
        ));
        assert!(matches!(
            unit_ms_from_wpm(-5.0),
            Err(TrainerError::InvalidSpeed(_))
        ));
        assert!(unit_ms_from_wpm(f64::NAN).is_err());
    }

    #[test]
    fn test_expand_single_a() {
        let events = expand(latin().encode('A').unwrap(), 60.0).unwrap();
        assert_eq!(
            events,
            vec![
                TimingEvent {
                    kind: TimingKind::Tone,
                    units: 1,
                    duration_ms: 60.0
                },
                TimingEvent {
                    kind: TimingKind::IntraSymbolGap,
                    units: 1,
                    duration_ms: 60.0
                },
                TimingEvent {
                    kind: TimingKind::Tone,
                    units: 3,
                    duration_ms: 180.0
                },
            ]
        );
        assert_eq!(total_duration_ms(&events), 300.0);
    }

    #[test]
    fn test_expand_rejects_bad_unit() {
        let symbol = latin().encode('E').unwrap();
        assert!(matches!(
            expand(symbol, 0.0),
            Err(TrainerError::InvalidSpeed(_))
        ));
        assert!(matches!(
            expand(symbol, -1.0),
            Err(TrainerError::InvalidSpeed(_))
        ));
    }

    #[test]
    fn test_sequence_single_char_has_no_outer_gaps() {
        let events = expand_sequence(latin(), &[SequenceItem::Char('A')], 60.0).unwrap();
        assert_eq!(events.len(), 3);
        assert!(events.first().unwrap().kind.is_tone());
        assert!(events.last().unwrap().kind.is_tone());
    }

    #[test]
    fn test_sequence_word_boundary() {
        let items = [
            SequenceItem::Char('A'),
            SequenceItem::WordBoundary,
            SequenceItem::Char('B'),
        ];
        let events = expand_sequence(latin(), &items, 60.0).unwrap();
        let gaps: Vec<_> = events
            .iter()
            .filter(|e| matches!(e.kind, TimingKind::InterWordGap | TimingKind::InterSymbolGap))
            .collect();
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].kind, TimingKind::InterWordGap);
        assert_eq!(gaps[0].duration_ms, 420.0);
    }

    #[test]
    fn test_sequence_inter_symbol_gap() {
        let items = parse_text("SO");
        let events = expand_sequence(latin(), &items, 100.0).unwrap();
        // S = 5 units, gap 3, O = 11 units
        assert_eq!(total_units(&events), 19);
        assert_eq!(events[5].kind, TimingKind::InterSymbolGap);
        assert_eq!(events[5].duration_ms, 300.0);
    }

    #[test]
    fn test_sequence_collapses_boundaries() {
        let items = [
            SequenceItem::WordBoundary,
            SequenceItem::Char('E'),
            SequenceItem::WordBoundary,
            SequenceItem::WordBoundary,
            SequenceItem::Char('T'),
            SequenceItem::WordBoundary,
        ];
        let events = expand_sequence(latin(), &items, 10.0).unwrap();
        let kinds: Vec<_> = events.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![TimingKind::Tone, TimingKind::InterWordGap, TimingKind::Tone]
        );
    }

    #[test]
    fn test_sequence_unsupported_char() {
        let items = parse_text("AB#");
        assert!(matches!(
            expand_sequence(latin(), &items, 60.0),
            Err(TrainerError::UnsupportedCharacter('#'))
        ));
    }

    #[test]
    fn test_sequence_empty() {
        assert!(expand_sequence(latin(), &[], 60.0).unwrap().is_empty());
        assert!(expand_sequence(latin(), &[SequenceItem::WordBoundary], 60.0)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_paris_timing() {
        // PARIS plus a trailing word gap is 50 units: 43 for the word itself
        let events = expand_sequence(latin(), &parse_text("PARIS"), 60.0).unwrap();
        assert_eq!(total_units(&events), PARIS_UNITS - 7);
    }

    #[test]
    fn test_parse_text() {
        assert_eq!(
            parse_text("  a b "),
            vec![
                SequenceItem::Char('a'),
                SequenceItem::WordBoundary,
                SequenceItem::Char('b')
            ]
        );
        assert!(parse_text("   ").is_empty());
    }
}
