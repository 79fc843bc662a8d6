use std::{fs, path::Path};

use anyhow::Context;
use serde::Deserialize;
use thiserror::Error;

const DEFAULT_THUMB_THRESHOLD: f32 = 140.0;
const DEFAULT_FINGER_THRESHOLD: f32 = 150.0;
const STRICT_THRESHOLD: f32 = 160.0;
const LOOSE_THRESHOLD: f32 = 130.0;
const DEFAULT_SMOOTH_WINDOW: usize = 7;
pub const MAX_SMOOTH_WINDOW: usize = 300;
const DEFAULT_OK_ANGLE_THUMB_MAX: f32 = 120.0;
const DEFAULT_OK_ANGLE_INDEX_MAX: f32 = 140.0;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("smoothing window must hold at least one sample")]
    EmptyWindow,
    #[error("smoothing window of {0} samples exceeds the limit of {max}", max = MAX_SMOOTH_WINDOW)]
    WindowTooLarge(usize),
    #[error("{name} must be within [0, 180] degrees, got {value}")]
    AngleOutOfRange { name: &'static str, value: f32 },
    #[error("minimum confidence must be within [0, 1], got {0}")]
    ConfidenceOutOfRange(f32),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdProfile {
    #[default]
    Standard,
    Strict,
    Loose,
}

impl ThresholdProfile {
    /// (thumb, other fingers) extension thresholds in degrees.
    pub fn thresholds(&self) -> (f32, f32) {
        match self {
            ThresholdProfile::Standard => (DEFAULT_THUMB_THRESHOLD, DEFAULT_FINGER_THRESHOLD),
            ThresholdProfile::Strict => (STRICT_THRESHOLD, STRICT_THRESHOLD),
            ThresholdProfile::Loose => (LOOSE_THRESHOLD, LOOSE_THRESHOLD),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ThumbStrategy {
    /// Thumb joint angle against the thumb threshold.
    #[default]
    Angle,
    /// Thumb tip x against the IP joint x, mirrored by handedness.
    Lateral,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AbsentHandPolicy {
    /// Frames without a hand add nothing to the smoothing history.
    #[default]
    Skip,
    /// Frames without a hand push a zero count.
    Decay,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub thumb_threshold: f32,
    pub finger_threshold: f32,
    pub smooth_window: usize,
    pub ok_angle_thumb_max: f32,
    pub ok_angle_index_max: f32,
    pub thumb_strategy: ThumbStrategy,
    pub absent_hand_policy: AbsentHandPolicy,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self::with_profile(ThresholdProfile::Standard)
    }
}

impl DetectorConfig {
    pub fn with_profile(profile: ThresholdProfile) -> Self {
        let (thumb_threshold, finger_threshold) = profile.thresholds();
        Self {
            thumb_threshold,
            finger_threshold,
            smooth_window: DEFAULT_SMOOTH_WINDOW,
            ok_angle_thumb_max: DEFAULT_OK_ANGLE_THUMB_MAX,
            ok_angle_index_max: DEFAULT_OK_ANGLE_INDEX_MAX,
            thumb_strategy: ThumbStrategy::default(),
            absent_hand_policy: AbsentHandPolicy::default(),
        }
    }

    pub fn apply_profile(&mut self, profile: ThresholdProfile) {
        let (thumb, finger) = profile.thresholds();
        self.thumb_threshold = thumb;
        self.finger_threshold = finger;
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.smooth_window == 0 {
            return Err(ConfigError::EmptyWindow);
        }
        if self.smooth_window > MAX_SMOOTH_WINDOW {
            return Err(ConfigError::WindowTooLarge(self.smooth_window));
        }

        let angles = [
            ("thumb threshold", self.thumb_threshold),
            ("finger threshold", self.finger_threshold),
            ("OK thumb angle limit", self.ok_angle_thumb_max),
            ("OK index angle limit", self.ok_angle_index_max),
        ];
        for (name, value) in angles {
            if !(0.0..=180.0).contains(&value) {
                return Err(ConfigError::AngleOutOfRange { name, value });
            }
        }

        if !self.ok_gesture_reachable() {
            log::warn!(
                "OK gesture cannot be detected: extension thresholds (thumb {}, fingers {}) \
                 are not below the OK limits (thumb {}, index {})",
                self.thumb_threshold,
                self.finger_threshold,
                self.ok_angle_thumb_max,
                self.ok_angle_index_max
            );
        }

        Ok(())
    }

    /// The OK rule needs thumb and index extended yet bent below the OK
    /// limits, which is impossible once a threshold reaches its limit.
    pub fn ok_gesture_reachable(&self) -> bool {
        let thumb_ok = match self.thumb_strategy {
            ThumbStrategy::Angle => self.thumb_threshold < self.ok_angle_thumb_max,
            ThumbStrategy::Lateral => true,
        };
        thumb_ok && self.finger_threshold < self.ok_angle_index_max
    }

    pub fn from_toml_str(raw: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(raw).context("invalid TOML detector config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read detector config {}", path.display()))?;
        Self::from_toml_str(&raw)
            .with_context(|| format!("failed to load detector config {}", path.display()))
    }
}

pub fn validate_confidence(value: f32) -> Result<f32, ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::ConfidenceOutOfRange(value))
    }
}
