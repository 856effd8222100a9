use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::drill::KeyLayout;
use crate::error::{TrainerError, TrainerResult};
use crate::morse::{normalize, Alphabet};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainerSettings {
    #[serde(default)]
    pub audio: AudioSettings,
    #[serde(default)]
    pub speed: SpeedSettings,
    #[serde(default)]
    pub lesson: LessonSettings,
    #[serde(default)]
    pub weights: WeightSettings,
    #[serde(default)]
    pub challenge: ChallengeSettings,
    #[serde(default)]
    pub drill: DrillSettings,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    pub sample_rate: u32,
    pub tone_frequency_hz: f32,
    /// Output volume applied when converting to PCM (0.0 - 1.0)
    pub volume: f32,
    /// Attack/release time of each tone
    pub ramp_ms: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedSettings {
    pub wpm: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LessonSettings {
    pub alphabet: Alphabet,
    /// Order in which characters are introduced; the alphabet's default when unset
    pub curriculum: Option<String>,
    /// How many curriculum characters are active at the start
    pub initial_characters: usize,
    /// Attempts every active character needs before the lesson can advance
    pub min_attempts: u32,
    /// Accuracy every active character needs before the lesson can advance
    pub accuracy_threshold: f64,
    /// Smoothing factor for the latency moving average
    pub latency_smoothing: f64,
    /// Add the next curriculum character as soon as the lesson is ready
    pub auto_advance: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightSettings {
    pub base_weight: f64,
    /// Attempts since a character was last seen at which its boost is full
    pub staleness_horizon: f64,
    /// Largest multiplier for a character not seen for a long time
    pub staleness_cap: f64,
    /// Latency at which the slowness boost is full
    pub latency_reference_ms: f64,
    /// Largest multiplier for a slowly answered character
    pub latency_cap: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChallengeSettings {
    /// Correct answers in a row needed for the next level
    pub streak_threshold: u32,
    /// Speed multiplier gained per level
    pub speed_step: f64,
    pub max_multiplier: f64,
}

/// How the next drill item is chosen
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrillMode {
    #[default]
    Adaptive,
    Random,
    WeakSpots,
    Challenge,
    Words,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrillSettings {
    pub mode: DrillMode,
    /// Fixed seed for reproducible selection; entropy when unset
    pub seed: Option<u64>,
    /// Maximum characters drilled in weak-spots mode
    pub weak_limit: usize,
    /// Characters in a speed test
    pub speed_test_target: usize,
    /// Keyboard the learner answers on
    pub key_layout: KeyLayout,
    /// Word list for word drills; the alphabet's default when empty
    pub words: Vec<String>,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            tone_frequency_hz: 800.0,
            volume: 0.5,
            ramp_ms: 5.0,
        }
    }
}

impl Default for SpeedSettings {
    fn default() -> Self {
        Self { wpm: 20.0 }
    }
}

impl Default for LessonSettings {
    fn default() -> Self {
        Self {
            alphabet: Alphabet::Latin,
            curriculum: None,
            initial_characters: 2,
            min_attempts: 10,
            accuracy_threshold: 0.9,
            latency_smoothing: 0.3,
            auto_advance: true,
        }
    }
}

impl Default for WeightSettings {
    fn default() -> Self {
        Self {
            base_weight: 1.0,
            staleness_horizon: 20.0,
            staleness_cap: 2.0,
            latency_reference_ms: 2000.0,
            latency_cap: 2.0,
        }
    }
}

impl Default for ChallengeSettings {
    fn default() -> Self {
        Self {
            streak_threshold: 5,
            speed_step: 0.1,
            max_multiplier: 2.0,
        }
    }
}

impl Default for DrillSettings {
    fn default() -> Self {
        Self {
            mode: DrillMode::Adaptive,
            seed: None,
            weak_limit: 10,
            speed_test_target: 20,
            key_layout: KeyLayout::Direct,
            words: Vec::new(),
        }
    }
}

impl LessonSettings {
    /// Curriculum characters, upper-cased
    pub fn curriculum_chars(&self) -> Vec<char> {
        self.curriculum
            .as_deref()
            .unwrap_or_else(|| self.alphabet.default_curriculum())
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(normalize)
            .collect()
    }

    pub fn validate(&self) -> TrainerResult<()> {
        if self.initial_characters == 0 {
            return Err(invalid("lesson.initial_characters must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.accuracy_threshold) {
            return Err(invalid("lesson.accuracy_threshold must be between 0 and 1"));
        }
        if !(self.latency_smoothing > 0.0 && self.latency_smoothing <= 1.0) {
            return Err(invalid("lesson.latency_smoothing must be in (0, 1]"));
        }
        Ok(())
    }
}

impl WeightSettings {
    /// Caps must be at least 1 so no attempted character outweighs an unseen one
    pub fn validate(&self) -> TrainerResult<()> {
        if !positive(self.base_weight) || !positive(self.staleness_horizon) {
            return Err(invalid(
                "weights.base_weight and weights.staleness_horizon must be positive",
            ));
        }
        if !positive(self.latency_reference_ms) {
            return Err(invalid("weights.latency_reference_ms must be positive"));
        }
        if !(self.staleness_cap >= 1.0 && self.staleness_cap.is_finite())
            || !(self.latency_cap >= 1.0 && self.latency_cap.is_finite())
        {
            return Err(invalid("weights caps must be at least 1"));
        }
        Ok(())
    }
}

impl DrillSettings {
    pub fn validate(&self) -> TrainerResult<()> {
        if self.weak_limit == 0 {
            return Err(invalid("drill.weak_limit must be at least 1"));
        }
        if self.words.iter().any(|w| w.trim().is_empty()) {
            return Err(invalid("drill.words must not contain blank entries"));
        }
        Ok(())
    }

    pub fn word_list(&self, alphabet: Alphabet) -> Vec<String> {
        if self.words.is_empty() {
            alphabet
                .default_words()
                .iter()
                .map(|w| w.to_string())
                .collect()
        } else {
            self.words.iter().map(|w| w.trim().to_uppercase()).collect()
        }
    }
}

fn invalid(message: impl Into<String>) -> TrainerError {
    TrainerError::InvalidParameters(message.into())
}

fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

pub struct SettingsLoadResult {
    pub settings: TrainerSettings,
    pub notice: Option<String>,
}

impl TrainerSettings {
    /// Get the default config file path
    pub fn config_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("cw_drill").join("settings.toml")
        } else {
            PathBuf::from("settings.toml")
        }
    }

    /// Check ranges that serde cannot express
    pub fn validate(&self) -> TrainerResult<()> {
        if self.audio.sample_rate == 0 {
            return Err(invalid("audio.sample_rate must be positive"));
        }
        if !positive(self.audio.tone_frequency_hz as f64) {
            return Err(invalid("audio.tone_frequency_hz must be positive"));
        }
        if !(0.0..=1.0).contains(&self.audio.volume) {
            return Err(invalid("audio.volume must be between 0 and 1"));
        }
        if !positive(self.audio.ramp_ms as f64) {
            return Err(invalid("audio.ramp_ms must be positive"));
        }
        if !positive(self.speed.wpm) {
            return Err(TrainerError::InvalidSpeed(self.speed.wpm));
        }
        self.lesson.validate()?;
        self.weights.validate()?;
        if self.challenge.streak_threshold == 0 {
            return Err(invalid("challenge.streak_threshold must be at least 1"));
        }
        if !(self.challenge.speed_step >= 0.0 && self.challenge.speed_step.is_finite())
            || !(self.challenge.max_multiplier >= 1.0 && self.challenge.max_multiplier.is_finite())
        {
            return Err(invalid(
                "challenge.speed_step must be non-negative and max_multiplier at least 1",
            ));
        }
        self.drill.validate()?;
        Ok(())
    }

    /// Load settings from the default config path, or return defaults if not found
    pub fn load_with_notice() -> SettingsLoadResult {
        Self::load_with_notice_from(&Self::config_path())
    }

    pub fn load_with_notice_from(path: &Path) -> SettingsLoadResult {
        match Self::load(path) {
            Ok(settings) => {
                debug!("Loaded settings from {}", path.display());
                SettingsLoadResult {
                    settings,
                    notice: None,
                }
            }
            Err(err) => {
                let mut notice = None;
                if path.exists() {
                    warn!("Unable to use settings at {}: {}", path.display(), err);
                    let reason = match &err {
                        TrainerError::InvalidSpeed(_) | TrainerError::InvalidParameters(_) => {
                            format!("an out-of-range value ({})", err)
                        }
                        _ => "an incompatible format".to_string(),
                    };
                    let backup_path = backup_settings_file(path);
                    if let Some(backup_path) = backup_path {
                        notice = Some(format!(
                            "Settings file was reset due to {}. Backup saved to {}",
                            reason,
                            backup_path.display()
                        ));
                    } else {
                        notice = Some(format!("Settings file was reset due to {}.", reason));
                    }
                }

                debug!(
                    "Using default settings (unable to load config at {})",
                    path.display()
                );
                SettingsLoadResult {
                    settings: Self::default(),
                    notice,
                }
            }
        }
    }

    pub fn load(path: &Path) -> TrainerResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: Self = toml::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn save(&self) -> TrainerResult<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> TrainerResult<()> {
        // Create parent directory if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Saved settings to {}", path.display());
        Ok(())
    }
}

fn backup_settings_file(path: &Path) -> Option<PathBuf> {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .ok()
        .map(|d| d.as_secs())?;
    let file_name = path.file_name()?.to_string_lossy();
    let backup_name = format!("{}.bak.{}", file_name, timestamp);
    let backup_path = path.with_file_name(backup_name);
    if std::fs::rename(path, &backup_path).is_ok() {
        Some(backup_path)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(TrainerSettings::default().validate().is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.toml");

        let mut settings = TrainerSettings::default();
        settings.speed.wpm = 25.0;
        settings.lesson.alphabet = Alphabet::Cyrillic;
        settings.drill.mode = DrillMode::WeakSpots;
        settings.drill.seed = Some(7);
        settings.save_to(&path).unwrap();

        let loaded = TrainerSettings::load(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "[speed]\nwpm = 15.0\n").unwrap();

        let loaded = TrainerSettings::load(&path).unwrap();
        assert_eq!(loaded.speed.wpm, 15.0);
        assert_eq!(loaded.audio, AudioSettings::default());
        assert_eq!(loaded.lesson.min_attempts, 10);
    }

    #[test]
    fn test_invalid_file_is_backed_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "[speed]\nwpm = \"fast\"\n").unwrap();

        let result = TrainerSettings::load_with_notice_from(&path);
        assert_eq!(result.settings, TrainerSettings::default());
        assert!(result.notice.unwrap().contains("incompatible format"));
        assert!(!path.exists());
    }

    #[test]
    fn test_missing_file_has_no_notice() {
        let dir = tempfile::tempdir().unwrap();
        let result = TrainerSettings::load_with_notice_from(&dir.path().join("none.toml"));
        assert!(result.notice.is_none());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut settings = TrainerSettings::default();
        settings.speed.wpm = 0.0;
        assert!(matches!(
            settings.validate(),
            Err(TrainerError::InvalidSpeed(_))
        ));

        let mut settings = TrainerSettings::default();
        settings.audio.sample_rate = 0;
        assert!(settings.validate().is_err());

        let mut settings = TrainerSettings::default();
        settings.lesson.accuracy_threshold = 1.5;
        assert!(settings.validate().is_err());

        let mut settings = TrainerSettings::default();
        settings.weights.staleness_cap = 0.5;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_curriculum_chars() {
        let mut lesson = LessonSettings::default();
        assert_eq!(&lesson.curriculum_chars()[..3], &['K', 'M', 'U']);
        lesson.curriculum = Some("e t a".to_string());
        assert_eq!(lesson.curriculum_chars(), vec!['E', 'T', 'A']);
    }

    #[test]
    fn test_word_list() {
        let mut drill = DrillSettings::default();
        assert!(drill.word_list(Alphabet::Latin).contains(&"PARIS".to_string()));
        drill.words = vec![" cq ".to_string()];
        assert_eq!(drill.word_list(Alphabet::Latin), vec!["CQ".to_string()]);
    }

    #[test]
    fn test_section_validation() {
        let weights = WeightSettings {
            staleness_cap: 0.5,
            ..Default::default()
        };
        assert!(weights.validate().is_err());

        let lesson = LessonSettings {
            latency_smoothing: 1.5,
            ..Default::default()
        };
        assert!(lesson.validate().is_err());

        let drill = DrillSettings {
            words: vec!["CQ".to_string(), " \t".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            drill.validate(),
            Err(TrainerError::InvalidParameters(_))
        ));

        let mut settings = TrainerSettings::default();
        settings.drill.words = vec![String::new()];
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_out_of_range_file_notice() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "[speed]\nwpm = 0.0\n").unwrap();

        let result = TrainerSettings::load_with_notice_from(&path);
        assert_eq!(result.settings, TrainerSettings::default());
        let notice = result.notice.unwrap();
        assert!(notice.contains("out-of-range value"));
        assert!(!notice.contains("incompatible format"));
        assert!(!path.exists());
    }
}
