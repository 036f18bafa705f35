//! Run settings and gameplay tuning
//!
//! Persisted as JSON next to the binary; every field has a default so partial
//! files load.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Settings load/save failures
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed settings: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Difficulty presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DifficultyPreset {
    Easy,
    #[default]
    Normal,
    Hard,
}

impl DifficultyPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            DifficultyPreset::Easy => "Easy",
            DifficultyPreset::Normal => "Normal",
            DifficultyPreset::Hard => "Hard",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "easy" => Some(DifficultyPreset::Easy),
            "normal" | "med" => Some(DifficultyPreset::Normal),
            "hard" => Some(DifficultyPreset::Hard),
            _ => None,
        }
    }

    /// Multiplier applied to enemy reload times
    pub fn cooldown_scale(&self) -> f32 {
        match self {
            DifficultyPreset::Easy => 1.5,
            DifficultyPreset::Normal => 1.0,
            DifficultyPreset::Hard => 0.6,
        }
    }
}

/// Balance knobs for entity behaviour. Durations are in ticks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === Enemy fire ===
    pub drone_fire_cooldown: u32,
    pub warrior_fire_cooldown: u32,
    pub warrior_burst_cooldown: u32,
    pub warrior_burst_length: u32,
    pub queen_fire_cooldown: u32,
    /// Initial cooldown is `initial_fire_delay + rand(initial_fire_jitter)`
    pub initial_fire_delay: u32,
    pub initial_fire_jitter: u32,
    /// Player x-distance under which a grid enemy fires aimed shots
    pub aim_lane_width: f32,
    /// Facing tolerance in degrees for aimed shots while on a path
    pub aim_tolerance: f32,

    // === Scores ===
    pub drone_score: i64,
    pub warrior_score: i64,
    pub guardian_score: i64,
    pub queen_score: i64,
    pub hit_penalty: i64,
    pub perfection_bonus: i64,
    pub refill_threshold: i64,

    // === Player ===
    pub bolt_cooldown: u32,
    pub bomb_cooldown: u32,
    pub shield_charges: u32,
    pub bomb_charges: u32,
    pub shield_lifespan: u32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            drone_fire_cooldown: 640,
            warrior_fire_cooldown: 480,
            warrior_burst_cooldown: 10,
            warrior_burst_length: 3,
            queen_fire_cooldown: 640,
            initial_fire_delay: 120,
            initial_fire_jitter: 120,
            aim_lane_width: 2.0,
            aim_tolerance: 2.0,

            drone_score: 20,
            warrior_score: 50,
            guardian_score: 75,
            queen_score: 100,
            hit_penalty: 500,
            perfection_bonus: 1000,
            refill_threshold: 500,

            bolt_cooldown: 30,
            bomb_cooldown: 60,
            shield_charges: 3,
            bomb_charges: 3,
            shield_lifespan: 60,
        }
    }
}

impl Tuning {
    /// Tuning with enemy reload times scaled for a preset
    pub fn for_preset(preset: DifficultyPreset) -> Self {
        let mut tuning = Self::default();
        tuning.apply_preset(preset);
        tuning
    }

    pub fn apply_preset(&mut self, preset: DifficultyPreset) {
        let scale = preset.cooldown_scale();
        let scaled = |ticks: u32| ((ticks as f32) * scale).round().max(1.0) as u32;
        self.drone_fire_cooldown = scaled(self.drone_fire_cooldown);
        self.warrior_fire_cooldown = scaled(self.warrior_fire_cooldown);
        self.queen_fire_cooldown = scaled(self.queen_fire_cooldown);
    }
}

/// Run settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Fixed RNG seed; random per run when absent
    pub seed: Option<u64>,
    pub difficulty: DifficultyPreset,
    pub tuning: Tuning,
    /// Update-only ticks allowed per frame when falling behind
    pub max_frame_skips: u32,
    /// Simulated seconds the headless driver runs for
    pub run_seconds: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            seed: None,
            difficulty: DifficultyPreset::Normal,
            tuning: Tuning::default(),
            max_frame_skips: crate::consts::MAX_FRAME_SKIPS,
            run_seconds: 30,
        }
    }
}

impl Settings {
    /// Create settings for a difficulty preset; the preset applies through `effective_tuning`
    pub fn from_preset(preset: DifficultyPreset) -> Self {
        Self {
            difficulty: preset,
            ..Self::default()
        }
    }

    /// Tuning with the difficulty preset applied
    pub fn effective_tuning(&self) -> Tuning {
        let mut tuning = self.tuning.clone();
        tuning.apply_preset(self.difficulty);
        tuning
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path.as_ref())?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded settings from {}", path.as_ref().display());
        Ok(settings)
    }

    /// Load settings, falling back to defaults on any failure
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path.as_ref()) {
            Ok(settings) => settings,
            Err(e) => {
                log::info!("Using default settings ({e})");
                Self::default()
            }
        }
    }

    /// Save settings to a JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        fs::write(path.as_ref(), self.to_json()?)?;
        log::info!("Saved settings to {}", path.as_ref().display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings = Settings::from_json(r#"{"seed": 42, "difficulty": "Hard"}"#).unwrap();
        assert_eq!(settings.seed, Some(42));
        assert_eq!(settings.difficulty, DifficultyPreset::Hard);
        assert_eq!(settings.tuning, Tuning::default());
        assert_eq!(settings.max_frame_skips, 5);
    }

    #[test]
    fn test_preset_scales_enemy_cooldowns() {
        let tuning = Tuning::for_preset(DifficultyPreset::Hard);
        assert_eq!(tuning.drone_fire_cooldown, 384);
        assert_eq!(tuning.bolt_cooldown, 30);
        assert_eq!(Settings::default().effective_tuning(), Tuning::default());
        assert_eq!(
            Settings::from_preset(DifficultyPreset::Easy).effective_tuning().queen_fire_cooldown,
            960
        );
    }

    #[test]
    fn test_preset_from_str() {
        assert_eq!(DifficultyPreset::from_str("EASY"), Some(DifficultyPreset::Easy));
        assert_eq!(DifficultyPreset::from_str("nope"), None);
    }

    #[test]
    fn test_save_and_load_file() {
        let path = std::env::temp_dir().join(format!("galactora-settings-{}.json", std::process::id()));
        let settings = Settings {
            seed: Some(7),
            ..Settings::default()
        };
        settings.save(&path).unwrap();
        assert_eq!(Settings::load(&path).unwrap(), settings);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = Settings::load("/nonexistent/galactora.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
        assert_eq!(Settings::load_or_default("/nonexistent/galactora.json"), Settings::default());
    }
}
