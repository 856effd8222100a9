//! Practice session orchestration.
//!
//! A [`DrillSession`] picks what to drill, turns it into timing events and
//! audio, and feeds the learner's answer back into the scheduler, the
//! challenge ladder and the session statistics. One session belongs to one
//! learner; nothing in it is shared.

pub mod challenge;
pub mod scheduler;
pub mod scorer;

pub use challenge::ChallengeLadder;
pub use scheduler::{CharacterProficiency, LessonState, Scheduler};
pub use scorer::{score, score_key, score_word, Attempt, KeyLayout, WordAttempt};

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, info};

use crate::audio::{Renderer, Waveform};
use crate::config::{DrillMode, TrainerSettings};
use crate::error::{TrainerError, TrainerResult};
use crate::morse::{
    expand_sequence, parse_text, total_duration_ms, unit_ms_from_wpm, CodeTable, SequenceItem,
    TimingEvent,
};
use crate::stats::SessionStats;

/// What the learner is asked to copy
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DrillTarget {
    Character(char),
    Word(String),
}

/// A ready-to-play drill: the target, its timing and its audio
#[derive(Clone, Debug)]
pub struct DrillItem {
    pub target: DrillTarget,
    pub wpm: f64,
    pub events: Vec<TimingEvent>,
    pub waveform: Waveform,
}

impl DrillItem {
    pub fn duration_ms(&self) -> f64 {
        total_duration_ms(&self.events)
    }
}

/// Result of answering a character drill
#[derive(Clone, Debug, PartialEq)]
pub struct Feedback {
    pub attempt: Attempt,
    /// Character added to the lesson by this answer
    pub advanced: Option<char>,
    /// Challenge level went up or was reset
    pub level_changed: bool,
}

pub struct DrillSession {
    settings: TrainerSettings,
    table: &'static CodeTable,
    renderer: Renderer,
    scheduler: Scheduler,
    ladder: ChallengeLadder,
    stats: SessionStats,
    words: Vec<String>,
    rng: SmallRng,
    pending: Option<DrillTarget>,
}

impl DrillSession {
    pub fn new(settings: TrainerSettings) -> TrainerResult<Self> {
        settings.validate()?;
        let table = CodeTable::for_alphabet(settings.lesson.alphabet);
        let scheduler = Scheduler::new(
            table,
            &settings.lesson,
            &settings.weights,
            settings.drill.seed,
        )?;
        Self::with_scheduler(settings, table, scheduler)
    }

    /// Continue a lesson from a persisted snapshot
    pub fn restore(settings: TrainerSettings, state: LessonState) -> TrainerResult<Self> {
        settings.validate()?;
        let table = CodeTable::for_alphabet(settings.lesson.alphabet);
        let scheduler = Scheduler::restore(
            table,
            state,
            &settings.lesson,
            &settings.weights,
            settings.drill.seed,
        )?;
        Self::with_scheduler(settings, table, scheduler)
    }

    fn with_scheduler(
        settings: TrainerSettings,
        table: &'static CodeTable,
        scheduler: Scheduler,
    ) -> TrainerResult<Self> {
        let renderer = Renderer::from_settings(&settings.audio)?;

        let words = settings.drill.word_list(settings.lesson.alphabet);
        for word in &words {
            if let Some(bad) = word.chars().find(|c| !c.is_whitespace() && !table.contains(*c)) {
                return Err(TrainerError::UnsupportedCharacter(bad));
            }
        }
        if settings.drill.mode == DrillMode::Words && words.is_empty() {
            return Err(TrainerError::InvalidParameters(
                "word drills need at least one word".to_string(),
            ));
        }

        // Separate stream from the scheduler's so both stay reproducible
        let rng = match settings.drill.seed {
            Some(seed) => SmallRng::seed_from_u64(seed.wrapping_add(1)),
            None => SmallRng::from_entropy(),
        };

        info!(
            "Drill session ready: {} alphabet, {:?} mode, {} WPM",
            settings.lesson.alphabet.display_name(),
            settings.drill.mode,
            settings.speed.wpm
        );

        Ok(Self {
            ladder: ChallengeLadder::new(settings.challenge.clone()),
            settings,
            table,
            renderer,
            scheduler,
            stats: SessionStats::new(),
            words,
            rng,
            pending: None,
        })
    }

    pub fn settings(&self) -> &TrainerSettings {
        &self.settings
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn ladder(&self) -> &ChallengeLadder {
        &self.ladder
    }

    pub fn pending(&self) -> Option<&DrillTarget> {
        self.pending.as_ref()
    }

    pub fn mode(&self) -> DrillMode {
        self.settings.drill.mode
    }

    /// Lesson state for an external store
    pub fn snapshot(&self) -> LessonState {
        self.scheduler.snapshot()
    }

    /// Switch modes. Drops any unanswered item.
    pub fn set_mode(&mut self, mode: DrillMode) -> TrainerResult<()> {
        if mode == DrillMode::Words && self.words.is_empty() {
            return Err(TrainerError::InvalidParameters(
                "word drills need at least one word".to_string(),
            ));
        }
        debug!("Mode {:?} -> {:?}", self.settings.drill.mode, mode);
        self.settings.drill.mode = mode;
        self.pending = None;
        self.ladder.reset();
        Ok(())
    }

    /// Sending speed for the next item
    pub fn current_wpm(&self) -> f64 {
        match self.settings.drill.mode {
            DrillMode::Challenge => self.settings.speed.wpm * self.ladder.speed_multiplier(),
            _ => self.settings.speed.wpm,
        }
    }

    /// Drop the session's statistics, e.g. to start a new speed test.
    /// The lesson state is kept.
    pub fn reset_stats(&mut self) {
        debug!("Session statistics cleared");
        self.stats.clear();
    }

    /// Enough correct characters for the configured speed test
    pub fn speed_test_complete(&self) -> bool {
        self.stats.correct_characters() >= self.settings.drill.speed_test_target
    }

    fn pick_uniform(&mut self, pool: &[char]) -> TrainerResult<char> {
        pool.choose(&mut self.rng)
            .copied()
            .ok_or_else(|| TrainerError::InvalidParameters("no active characters".to_string()))
    }

    fn pick_target(&mut self) -> TrainerResult<DrillTarget> {
        let target = match self.settings.drill.mode {
            DrillMode::Adaptive => DrillTarget::Character(self.scheduler.next_character()?),
            DrillMode::Random | DrillMode::Challenge => {
                let active = self.scheduler.active_characters().to_vec();
                DrillTarget::Character(self.pick_uniform(&active)?)
            }
            DrillMode::WeakSpots => {
                let mut pool = self.scheduler.weak_characters(self.settings.drill.weak_limit);
                if pool.is_empty() {
                    pool = self.scheduler.active_characters().to_vec();
                }
                DrillTarget::Character(self.pick_uniform(&pool)?)
            }
            DrillMode::Words => {
                let word = self
                    .words
                    .choose(&mut self.rng)
                    .cloned()
                    .ok_or_else(|| {
                        TrainerError::InvalidParameters("word list is empty".to_string())
                    })?;
                DrillTarget::Word(word)
            }
        };
        Ok(target)
    }

    /// Build events and audio for a target at the current speed
    pub fn prepare(&self, target: DrillTarget) -> TrainerResult<DrillItem> {
        let wpm = self.current_wpm();
        let unit_ms = unit_ms_from_wpm(wpm)?;
        let items = match &target {
            DrillTarget::Character(ch) => vec![SequenceItem::Char(*ch)],
            DrillTarget::Word(word) => parse_text(word),
        };
        let events = expand_sequence(self.table, &items, unit_ms)?;
        let waveform = self.renderer.render(&events)?;

        Ok(DrillItem {
            target,
            wpm,
            events,
            waveform,
        })
    }

    /// Choose and render the next item. It stays pending until answered.
    pub fn next_item(&mut self) -> TrainerResult<DrillItem> {
        let target = self.pick_target()?;
        let item = self.prepare(target)?;
        debug!("Next item {:?} at {:.1} WPM", item.target, item.wpm);
        self.pending = Some(item.target.clone());
        Ok(item)
    }

    /// Answer the pending character drill. `None` means no answer was given.
    pub fn submit(&mut self, submitted: Option<char>, latency_ms: f64) -> TrainerResult<Feedback> {
        let expected = match self.pending {
            Some(DrillTarget::Character(ch)) => ch,
            _ => return Err(TrainerError::NoPendingDrill),
        };
        let attempt = score(expected, submitted, latency_ms);
        self.record(attempt)
    }

    /// Answer with a physical key, using the configured keyboard layout
    pub fn submit_key(&mut self, key: char, latency_ms: f64) -> TrainerResult<Feedback> {
        let translated = self.settings.drill.key_layout.translate(key);
        self.submit(Some(translated), latency_ms)
    }

    /// Answer the pending word drill
    pub fn submit_word(&mut self, text: &str, latency_ms: f64) -> TrainerResult<WordAttempt> {
        let expected = match &self.pending {
            Some(DrillTarget::Word(word)) => word.clone(),
            _ => return Err(TrainerError::NoPendingDrill),
        };
        let attempt = score_word(&expected, text, latency_ms);
        self.pending = None;
        self.stats.log_word(attempt.clone());
        Ok(attempt)
    }

    fn record(&mut self, attempt: Attempt) -> TrainerResult<Feedback> {
        // Apply first so a rejected attempt leaves the session untouched
        self.scheduler.apply(&attempt)?;
        self.pending = None;

        let level_changed = if self.settings.drill.mode == DrillMode::Challenge {
            self.ladder.record(attempt.correct)
        } else {
            false
        };
        self.stats.log_attempt(attempt.clone());

        let mut advanced = None;
        if self.settings.lesson.auto_advance && self.scheduler.is_ready_to_advance() {
            match self.scheduler.advance() {
                Ok(ch) => advanced = Some(ch),
                Err(TrainerError::CurriculumExhausted) => {
                    debug!("Curriculum complete; nothing left to add")
                }
                Err(e) => return Err(e),
            }
        }

        Ok(Feedback {
            attempt,
            advanced,
            level_changed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::morse::{Alphabet, TimingKind};

    fn settings(mode: DrillMode) -> TrainerSettings {
        let mut settings = TrainerSettings::default();
        settings.audio.sample_rate = 8000;
        settings.audio.tone_frequency_hz = 600.0;
        settings.lesson.curriculum = Some("KMRS".to_string());
        settings.lesson.min_attempts = 3;
        settings.drill.mode = mode;
        settings.drill.seed = Some(99);
        settings
    }

    fn expected_char(item: &DrillItem) -> char {
        match item.target {
            DrillTarget::Character(ch) => ch,
            DrillTarget::Word(_) => panic!("expected a character drill"),
        }
    }

    #[test]
    fn test_item_has_audio() {
        let mut session = DrillSession::new(settings(DrillMode::Adaptive)).unwrap();
        let item = session.next_item().unwrap();
        let ch = expected_char(&item);
        assert!(ch == 'K' || ch == 'M');
        assert_eq!(item.wpm, 20.0);
        assert!(item.events.first().unwrap().kind.is_tone());
        assert!(!item.waveform.is_empty());
        assert_eq!(item.waveform.sample_rate(), 8000);
        assert_eq!(session.pending(), Some(&item.target));
    }

    #[test]
    fn test_submit_without_item() {
        let mut session = DrillSession::new(settings(DrillMode::Adaptive)).unwrap();
        assert!(matches!(
            session.submit(Some('K'), 100.0),
            Err(TrainerError::NoPendingDrill)
        ));
        assert!(matches!(
            session.submit_word("K", 100.0),
            Err(TrainerError::NoPendingDrill)
        ));
    }

    #[test]
    fn test_submit_feeds_scheduler_and_stats() {
        let mut session = DrillSession::new(settings(DrillMode::Adaptive)).unwrap();
        let item = session.next_item().unwrap();
        let ch = expected_char(&item);

        let feedback = session.submit(Some(ch.to_ascii_lowercase()), 700.0).unwrap();
        assert!(feedback.attempt.correct);
        assert_eq!(feedback.advanced, None);
        assert_eq!(session.pending(), None);
        assert_eq!(session.scheduler().proficiency(ch).unwrap().attempt_count, 1);
        assert_eq!(session.stats().attempts.len(), 1);

        // Already answered
        assert!(session.submit(Some(ch), 700.0).is_err());
    }

    #[test]
    fn test_auto_advance() {
        let mut session = DrillSession::new(settings(DrillMode::Adaptive)).unwrap();
        let mut added = Vec::new();
        for _ in 0..100 {
            let item = session.next_item().unwrap();
            let ch = expected_char(&item);
            if let Some(new_char) = session.submit(Some(ch), 400.0).unwrap().advanced {
                added.push(new_char);
            }
        }
        assert_eq!(added, vec!['R', 'S']);
        assert_eq!(session.scheduler().active_characters(), &['K', 'M', 'R', 'S']);
    }

    #[test]
    fn test_challenge_speeds_up_and_resets() {
        let mut session = DrillSession::new(settings(DrillMode::Challenge)).unwrap();
        for _ in 0..5 {
            let ch = expected_char(&session.next_item().unwrap());
            session.submit(Some(ch), 300.0).unwrap();
        }
        assert_eq!(session.ladder().level(), 2);
        let item = session.next_item().unwrap();
        assert!((item.wpm - 22.0).abs() < 1e-9);

        let feedback = session.submit(None, 300.0).unwrap();
        assert!(!feedback.attempt.correct);
        assert!(feedback.level_changed);
        assert_eq!(session.current_wpm(), 20.0);
    }

    #[test]
    fn test_weak_spots_drills_missed() {
        let mut s = settings(DrillMode::Adaptive);
        s.lesson.initial_characters = 4;
        let mut session = DrillSession::new(s).unwrap();

        // Miss only M, answer everything else
        for _ in 0..30 {
            let ch = expected_char(&session.next_item().unwrap());
            let answer = if ch == 'M' { 'X' } else { ch };
            session.submit(Some(answer), 300.0).unwrap();
        }
        session.set_mode(DrillMode::WeakSpots).unwrap();
        for _ in 0..20 {
            let ch = expected_char(&session.next_item().unwrap());
            assert_eq!(ch, 'M');
            session.submit(Some('X'), 300.0).unwrap();
        }
    }

    #[test]
    fn test_words_mode() {
        let mut s = settings(DrillMode::Words);
        s.drill.words = vec!["sos".to_string(), "cq dx".to_string()];
        let mut session = DrillSession::new(s).unwrap();

        let item = session.next_item().unwrap();
        let word = match &item.target {
            DrillTarget::Word(word) => word.clone(),
            DrillTarget::Character(_) => panic!("expected a word drill"),
        };
        assert!(word == "SOS" || word == "CQ DX");
        if word == "CQ DX" {
            assert!(item.events.iter().any(|e| e.kind == TimingKind::InterWordGap));
        }

        // Character answers do not apply to words
        assert!(session.submit(Some('S'), 100.0).is_err());
        let attempt = session.submit_word(&word.to_lowercase(), 2500.0).unwrap();
        assert!(attempt.correct);
        assert_eq!(session.stats().words.len(), 1);
    }

    #[test]
    fn test_words_must_be_encodable() {
        let mut s = settings(DrillMode::Words);
        s.drill.words = vec!["HI#".to_string()];
        assert!(matches!(
            DrillSession::new(s),
            Err(TrainerError::UnsupportedCharacter('#'))
        ));
    }

    #[test]
    fn test_cyrillic_keys() {
        let mut s = TrainerSettings::default();
        s.audio.sample_rate = 8000;
        s.lesson.alphabet = Alphabet::Cyrillic;
        s.lesson.curriculum = Some("АО".to_string());
        s.drill.key_layout = KeyLayout::Jcuken;
        s.drill.seed = Some(3);
        let mut session = DrillSession::new(s).unwrap();

        let ch = expected_char(&session.next_item().unwrap());
        // F types А and J types О on a ЙЦУКЕН keyboard
        let key = if ch == 'А' { 'f' } else { 'j' };
        assert!(session.submit_key(key, 500.0).unwrap().attempt.correct);
    }

    #[test]
    fn test_seeded_sessions_match() {
        let run = || {
            let mut session = DrillSession::new(settings(DrillMode::Random)).unwrap();
            (0..20)
                .map(|_| {
                    let ch = expected_char(&session.next_item().unwrap());
                    session.submit(Some(ch), 300.0).unwrap();
                    ch
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_restore_session() {
        let mut session = DrillSession::new(settings(DrillMode::Adaptive)).unwrap();
        for _ in 0..5 {
            let ch = expected_char(&session.next_item().unwrap());
            session.submit(Some(ch), 300.0).unwrap();
        }
        let snapshot = session.snapshot();
        let restored = DrillSession::restore(settings(DrillMode::Adaptive), snapshot.clone()).unwrap();
        assert_eq!(restored.snapshot(), snapshot);
        assert!(restored.stats().is_empty());
    }

    #[test]
    fn test_speed_test_complete() {
        let mut s = settings(DrillMode::Random);
        s.drill.speed_test_target = 3;
        let mut session = DrillSession::new(s).unwrap();
        for _ in 0..3 {
            assert!(!session.speed_test_complete());
            let ch = expected_char(&session.next_item().unwrap());
            session.submit(Some(ch), 300.0).unwrap();
        }
        assert!(session.speed_test_complete());

        session.reset_stats();
        assert!(!session.speed_test_complete());
        assert!(session.stats().is_empty());
        assert_eq!(session.scheduler().state().attempt_counter, 3);
    }

    #[test]
    fn test_blank_words_rejected() {
        let mut s = settings(DrillMode::Words);
        s.drill.words = vec!["CQ".to_string(), "   ".to_string()];
        assert!(matches!(
            DrillSession::new(s),
            Err(TrainerError::InvalidParameters(_))
        ));

        let mut s = settings(DrillMode::Adaptive);
        s.drill.words = vec![String::new()];
        assert!(matches!(
            DrillSession::new(s),
            Err(TrainerError::InvalidParameters(_))
        ));
    }
}
