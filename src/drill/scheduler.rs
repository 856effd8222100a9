//! Adaptive character selection.
//!
//! The scheduler keeps a proficiency record for every character of the
//! alphabet and draws the next character from the active set with weights
//! that favour characters the learner misses, answers slowly, or has not
//! seen for a while. Characters never attempted get the largest weight any
//! character can reach, so every active character is drilled eventually.

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

use super::scorer::Attempt;
use crate::config::{LessonSettings, WeightSettings};
use crate::error::{TrainerError, TrainerResult};
use crate::morse::{normalize, CodeTable};

/// Learning record for one character
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CharacterProficiency {
    pub character: char,
    pub correct_count: u32,
    pub attempt_count: u32,
    pub ema_latency_ms: f64,
    /// Value of the attempt counter when this character was last answered
    pub last_seen_index: u64,
}

impl CharacterProficiency {
    pub fn new(character: char) -> Self {
        Self {
            character,
            correct_count: 0,
            attempt_count: 0,
            ema_latency_ms: 0.0,
            last_seen_index: 0,
        }
    }

    pub fn accuracy(&self) -> f64 {
        self.correct_count as f64 / self.attempt_count.max(1) as f64
    }

    pub fn error_rate(&self) -> f64 {
        if self.attempt_count == 0 {
            0.0
        } else {
            1.0 - self.accuracy()
        }
    }
}

/// Everything a practice session has learned about the learner.
/// Serializable so it can be persisted between runs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LessonState {
    pub active_characters: Vec<char>,
    pub proficiency: BTreeMap<char, CharacterProficiency>,
    pub attempt_counter: u64,
}

pub struct Scheduler {
    state: LessonState,
    curriculum: Vec<char>,
    weights: WeightSettings,
    min_attempts: u32,
    accuracy_threshold: f64,
    latency_smoothing: f64,
    rng: SmallRng,
}

fn seeded_rng(seed: Option<u64>) -> SmallRng {
    match seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_entropy(),
    }
}

fn validated_curriculum(table: &CodeTable, lesson: &LessonSettings) -> TrainerResult<Vec<char>> {
    let curriculum = lesson.curriculum_chars();
    if curriculum.is_empty() {
        return Err(TrainerError::InvalidParameters(
            "curriculum is empty".to_string(),
        ));
    }
    for (idx, ch) in curriculum.iter().enumerate() {
        if !table.contains(*ch) {
            return Err(TrainerError::UnsupportedCharacter(*ch));
        }
        if curriculum[..idx].contains(ch) {
            return Err(TrainerError::InvalidParameters(format!(
                "curriculum lists {:?} more than once",
                ch
            )));
        }
    }
    Ok(curriculum)
}

impl Scheduler {
    /// Start a fresh lesson with the first curriculum characters active
    pub fn new(
        table: &CodeTable,
        lesson: &LessonSettings,
        weights: &WeightSettings,
        seed: Option<u64>,
    ) -> TrainerResult<Self> {
        lesson.validate()?;
        weights.validate()?;
        let curriculum = validated_curriculum(table, lesson)?;
        if lesson.initial_characters == 0 || lesson.initial_characters > curriculum.len() {
            return Err(TrainerError::InvalidParameters(format!(
                "initial_characters must be between 1 and {}, got {}",
                curriculum.len(),
                lesson.initial_characters
            )));
        }

        let proficiency = table
            .characters()
            .iter()
            .map(|&ch| (ch, CharacterProficiency::new(ch)))
            .collect();
        let state = LessonState {
            active_characters: curriculum[..lesson.initial_characters].to_vec(),
            proficiency,
            attempt_counter: 0,
        };

        debug!(
            "Starting lesson with {:?} ({} characters in curriculum)",
            state.active_characters,
            curriculum.len()
        );
        Ok(Self::with_state(state, curriculum, lesson, weights, seed))
    }

    /// Resume from a persisted snapshot. Characters are normalized to their
    /// table form; duplicates and inconsistent records are rejected.
    pub fn restore(
        table: &CodeTable,
        state: LessonState,
        lesson: &LessonSettings,
        weights: &WeightSettings,
        seed: Option<u64>,
    ) -> TrainerResult<Self> {
        lesson.validate()?;
        weights.validate()?;
        let curriculum = validated_curriculum(table, lesson)?;
        if state.active_characters.is_empty() {
            return Err(TrainerError::InvalidParameters(
                "snapshot has no active characters".to_string(),
            ));
        }

        let mut active_characters = Vec::with_capacity(state.active_characters.len());
        for &ch in &state.active_characters {
            let key = normalize(ch);
            if !table.contains(key) {
                return Err(TrainerError::UnsupportedCharacter(ch));
            }
            if active_characters.contains(&key) {
                return Err(TrainerError::InvalidParameters(format!(
                    "snapshot lists {:?} as active more than once",
                    key
                )));
            }
            active_characters.push(key);
        }

        let mut proficiency = BTreeMap::new();
        for (ch, mut record) in state.proficiency {
            let key = normalize(ch);
            if !table.contains(key) {
                return Err(TrainerError::UnsupportedCharacter(ch));
            }
            if normalize(record.character) != key {
                return Err(TrainerError::InvalidParameters(format!(
                    "proficiency entry {:?} holds the record for {:?}",
                    ch, record.character
                )));
            }
            if record.correct_count > record.attempt_count
                || record.last_seen_index > state.attempt_counter
            {
                return Err(TrainerError::InvalidParameters(format!(
                    "proficiency record for {:?} is inconsistent",
                    key
                )));
            }
            record.character = key;
            if proficiency.insert(key, record).is_some() {
                return Err(TrainerError::InvalidParameters(format!(
                    "snapshot has more than one record for {:?}",
                    key
                )));
            }
        }
        for &ch in table.characters() {
            proficiency
                .entry(ch)
                .or_insert_with(|| CharacterProficiency::new(ch));
        }

        let state = LessonState {
            active_characters,
            proficiency,
            attempt_counter: state.attempt_counter,
        };
        Ok(Self::with_state(state, curriculum, lesson, weights, seed))
    }

    fn with_state(
        state: LessonState,
        curriculum: Vec<char>,
        lesson: &LessonSettings,
        weights: &WeightSettings,
        seed: Option<u64>,
    ) -> Self {
        Self {
            state,
            curriculum,
            weights: weights.clone(),
            min_attempts: lesson.min_attempts,
            accuracy_threshold: lesson.accuracy_threshold,
            latency_smoothing: lesson.latency_smoothing,
            rng: seeded_rng(seed),
        }
    }

    pub fn state(&self) -> &LessonState {
        &self.state
    }

    /// Copy of the lesson state for an external store
    pub fn snapshot(&self) -> LessonState {
        self.state.clone()
    }

    pub fn active_characters(&self) -> &[char] {
        &self.state.active_characters
    }

    pub fn curriculum(&self) -> &[char] {
        &self.curriculum
    }

    pub fn proficiency(&self, ch: char) -> Option<&CharacterProficiency> {
        self.state.proficiency.get(&normalize(ch))
    }

    /// Weight given to characters that were never attempted
    pub fn unseen_weight(&self) -> f64 {
        self.weights.base_weight * self.weights.staleness_cap * self.weights.latency_cap
    }

    fn weight_of(&self, p: &CharacterProficiency) -> f64 {
        if p.attempt_count == 0 {
            return self.unseen_weight();
        }

        let w = &self.weights;
        let age = self.state.attempt_counter.saturating_sub(p.last_seen_index) as f64;
        let staleness = 1.0 + (age / w.staleness_horizon).min(1.0) * (w.staleness_cap - 1.0);
        let slowness = 1.0
            + (p.ema_latency_ms / w.latency_reference_ms).clamp(0.0, 1.0) * (w.latency_cap - 1.0);

        w.base_weight / (1.0 + p.accuracy()) * staleness * slowness
    }

    /// Selection weight of a character
    pub fn weight(&self, ch: char) -> TrainerResult<f64> {
        self.proficiency(ch)
            .map(|p| self.weight_of(p))
            .ok_or(TrainerError::UnsupportedCharacter(ch))
    }

    /// Weights of the active characters, in active order
    pub fn weights(&self) -> Vec<(char, f64)> {
        self.state
            .active_characters
            .iter()
            .map(|&ch| {
                let weight = self
                    .state
                    .proficiency
                    .get(&ch)
                    .map(|p| self.weight_of(p))
                    .unwrap_or_else(|| self.unseen_weight());
                (ch, weight)
            })
            .collect()
    }

    /// Draw the next character to drill, weighted by need
    pub fn next_character(&mut self) -> TrainerResult<char> {
        let weights = self.weights();
        let dist = WeightedIndex::new(weights.iter().map(|(_, w)| *w))
            .map_err(|e| TrainerError::InvalidParameters(format!("selection weights: {}", e)))?;
        let (ch, weight) = weights[dist.sample(&mut self.rng)];
        debug!("Selected {:?} (weight {:.3})", ch, weight);
        Ok(ch)
    }

    /// Record an attempt. Fails without touching the state if the character is unknown.
    pub fn apply(&mut self, attempt: &Attempt) -> TrainerResult<()> {
        let key = normalize(attempt.expected);
        let index = self.state.attempt_counter + 1;
        let alpha = self.latency_smoothing;

        let p = self
            .state
            .proficiency
            .get_mut(&key)
            .ok_or(TrainerError::UnsupportedCharacter(attempt.expected))?;

        // Negative latencies count as instant; non-finite ones leave the average alone
        if attempt.latency_ms.is_finite() {
            let latency = attempt.latency_ms.max(0.0);
            p.ema_latency_ms = if p.attempt_count == 0 {
                latency
            } else {
                alpha * latency + (1.0 - alpha) * p.ema_latency_ms
            };
        }
        p.attempt_count += 1;
        if attempt.correct {
            p.correct_count += 1;
        }
        p.last_seen_index = index;

        self.state.attempt_counter = index;
        Ok(())
    }

    /// True when every active character has enough attempts at a high enough accuracy
    pub fn is_ready_to_advance(&self) -> bool {
        self.state.active_characters.iter().all(|ch| {
            self.state.proficiency.get(ch).is_some_and(|p| {
                p.attempt_count >= self.min_attempts && p.accuracy() >= self.accuracy_threshold
            })
        })
    }

    /// Activate the next curriculum character
    pub fn advance(&mut self) -> TrainerResult<char> {
        let next = self
            .curriculum
            .iter()
            .copied()
            .find(|ch| !self.state.active_characters.contains(ch))
            .ok_or(TrainerError::CurriculumExhausted)?;

        self.state.active_characters.push(next);
        info!(
            "Lesson advanced: added {:?} ({} active)",
            next,
            self.state.active_characters.len()
        );
        Ok(next)
    }

    /// Active characters with the highest error rates, worst first
    pub fn weak_characters(&self, limit: usize) -> Vec<char> {
        let mut weak: Vec<(usize, &CharacterProficiency)> = self
            .state
            .active_characters
            .iter()
            .enumerate()
            .filter_map(|(idx, ch)| self.state.proficiency.get(ch).map(|p| (idx, p)))
            .filter(|(_, p)| p.error_rate() > 0.0)
            .collect();

        // Sort by error rate descending, then by active order for stable ordering
        weak.sort_by(|a, b| {
            b.1.error_rate()
                .total_cmp(&a.1.error_rate())
                .then_with(|| a.0.cmp(&b.0))
        });
        weak.into_iter()
            .take(limit)
            .map(|(_, p)| p.character)
            .collect()
    }
}
