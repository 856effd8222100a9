use serde::{Deserialize, Serialize};

use crate::morse::normalize;

/// Outcome of one drilled character
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    pub expected: char,
    pub submitted: Option<char>,
    pub latency_ms: f64,
    pub correct: bool,
}

/// Outcome of one drilled word
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WordAttempt {
    pub expected: String,
    pub submitted: String,
    pub latency_ms: f64,
    pub correct: bool,
}

/// Physical keyboard layout used to type answers
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyLayout {
    /// Keys produce the characters being drilled
    #[default]
    Direct,
    /// Latin key caps typed on a ЙЦУКЕН keyboard
    Jcuken,
}

impl KeyLayout {
    /// Character a key stands for in this layout
    pub fn translate(&self, key: char) -> char {
        match self {
            KeyLayout::Direct => key,
            KeyLayout::Jcuken => jcuken(normalize(key)).unwrap_or(key),
        }
    }
}

fn jcuken(key: char) -> Option<char> {
    let mapped = match key {
        // Top row
        'Q' => 'Й',
        'W' => 'Ц',
        'E' => 'У',
        'R' => 'К',
        'T' => 'Е',
        'Y' => 'Н',
        'U' => 'Г',
        'I' => 'Ш',
        'O' => 'Щ',
        'P' => 'З',
        '[' => 'Х',
        ']' => 'Ъ',
        // Home row
        'A' => 'Ф',
        'S' => 'Ы',
        'D' => 'В',
        'F' => 'А',
        'G' => 'П',
        'H' => 'Р',
        'J' => 'О',
        'K' => 'Л',
        'L' => 'Д',
        ';' => 'Ж',
        '\'' => 'Э',
        // Bottom row
        'Z' => 'Я',
        'X' => 'Ч',
        'C' => 'С',
        'V' => 'М',
        'B' => 'И',
        'N' => 'Т',
        'M' => 'Ь',
        ',' => 'Б',
        '.' => 'Ю',
        _ => return None,
    };
    Some(mapped)
}

/// Score a typed character against the drilled one (case-insensitive)
pub fn score(expected: char, submitted: Option<char>, latency_ms: f64) -> Attempt {
    let correct = submitted.is_some_and(|c| normalize(c) == normalize(expected));
    Attempt {
        expected,
        submitted,
        latency_ms,
        correct,
    }
}

/// Score a physical key press, translated through a keyboard layout
pub fn score_key(expected: char, key: char, latency_ms: f64, layout: KeyLayout) -> Attempt {
    score(expected, Some(layout.translate(key)), latency_ms)
}

/// Score a typed word. Whitespace and case are ignored.
pub fn score_word(expected: &str, submitted: &str, latency_ms: f64) -> WordAttempt {
    let clean = |s: &str| -> String {
        s.chars()
            .filter(|c| !c.is_whitespace())
            .map(normalize)
            .collect()
    };
    let expected_clean = clean(expected);
    let submitted_clean = clean(submitted);
    let correct = !submitted_clean.is_empty() && submitted_clean == expected_clean;

    WordAttempt {
        expected: expected.to_string(),
        submitted: submitted.to_string(),
        latency_ms,
        correct,
    }
}
