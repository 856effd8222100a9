use std::collections::HashMap;

use crate::drill::{Attempt, WordAttempt};
use crate::morse::normalize;

/// Characters per word in WPM arithmetic
const CHARS_PER_WORD: f64 = 5.0;

/// Session statistics collector and analyzer
#[derive(Clone, Debug, Default)]
pub struct SessionStats {
    pub attempts: Vec<Attempt>,
    pub words: Vec<WordAttempt>,
}

/// Analysis results for display
#[derive(Clone, Debug, Default)]
pub struct StatsAnalysis {
    pub total_attempts: usize,
    pub correct_attempts: usize,
    pub incorrect_attempts: usize,
    pub accuracy: f32, // Percentage of correct characters
    pub avg_latency_ms: f64,
    pub char_error_rates: Vec<(char, f32, usize)>, // (char, error_rate, total_count)
    pub total_words: usize,
    pub correct_words: usize,
    pub word_accuracy: f32,
}

impl SessionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log_attempt(&mut self, attempt: Attempt) {
        self.attempts.push(attempt);
    }

    pub fn log_word(&mut self, attempt: WordAttempt) {
        self.words.push(attempt);
    }

    pub fn clear(&mut self) {
        self.attempts.clear();
        self.words.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty() && self.words.is_empty()
    }

    /// Characters answered correctly, counting every letter of a correct word
    pub fn correct_characters(&self) -> usize {
        let chars = self.attempts.iter().filter(|a| a.correct).count();
        let word_chars: usize = self
            .words
            .iter()
            .filter(|w| w.correct)
            .map(|w| w.expected.chars().filter(|c| !c.is_whitespace()).count())
            .sum();
        chars + word_chars
    }

    /// Copy speed over an elapsed time, five characters to the word
    pub fn effective_wpm(&self, elapsed_ms: f64) -> f64 {
        if !elapsed_ms.is_finite() || elapsed_ms <= 0.0 {
            return 0.0;
        }
        let minutes = elapsed_ms / 60_000.0;
        (self.correct_characters() as f64 / CHARS_PER_WORD) / minutes
    }

    pub fn analyze(&self) -> StatsAnalysis {
        if self.is_empty() {
            return StatsAnalysis::default();
        }

        let total_attempts = self.attempts.len();
        let correct_attempts = self.attempts.iter().filter(|a| a.correct).count();
        let incorrect_attempts = total_attempts - correct_attempts;
        let accuracy = percentage(correct_attempts, total_attempts);

        let latencies: Vec<f64> = self
            .attempts
            .iter()
            .map(|a| a.latency_ms)
            .chain(self.words.iter().map(|w| w.latency_ms))
            .filter(|l| l.is_finite())
            .collect();
        let avg_latency_ms = if latencies.is_empty() {
            0.0
        } else {
            latencies.iter().sum::<f64>() / latencies.len() as f64
        };

        let total_words = self.words.len();
        let correct_words = self.words.iter().filter(|w| w.correct).count();

        StatsAnalysis {
            total_attempts,
            correct_attempts,
            incorrect_attempts,
            accuracy,
            avg_latency_ms,
            char_error_rates: self.analyze_character_errors(),
            total_words,
            correct_words,
            word_accuracy: percentage(correct_words, total_words),
        }
    }

    fn analyze_character_errors(&self) -> Vec<(char, f32, usize)> {
        let mut char_totals: HashMap<char, usize> = HashMap::new();
        let mut char_errors: HashMap<char, usize> = HashMap::new();

        for attempt in &self.attempts {
            let ch = normalize(attempt.expected);
            *char_totals.entry(ch).or_insert(0) += 1;
            if !attempt.correct {
                *char_errors.entry(ch).or_insert(0) += 1;
            }
        }

        // Calculate error rates and sort by error rate descending
        let mut results: Vec<(char, f32, usize)> = char_totals
            .iter()
            .map(|(&ch, &total)| {
                let errors = *char_errors.get(&ch).unwrap_or(&0);
                (ch, percentage(errors, total), total)
            })
            .filter(|(_, _, total)| *total >= 3) // Only show chars with enough samples
            .collect();

        // Sort by error rate descending, then by character ascending for stable ordering
        results.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        results
    }
}

fn percentage(part: usize, total: usize) -> f32 {
    if total == 0 {
        0.0
    } else {
        (part as f32 / total as f32) * 100.0
    }
}
