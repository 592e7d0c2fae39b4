// Settings - persisted capture and generation parameters
//
// Stored as RON in `<config dir>/rythmiq/settings.ron`. Every field has a
// default so partial files keep working across versions.

use crate::generate::CandidateSelection;
use crate::sequencer::{OptimizeOptions, StepGrid, Tempo, TimeSignature};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse settings: {0}")]
    Parse(String),

    #[error("Failed to serialize settings: {0}")]
    Serialize(String),

    #[error("Invalid tempo: {0} BPM (expected 20-999)")]
    InvalidTempo(f64),

    #[error("Invalid setting: {0}")]
    Invalid(String),
}

/// Parameters of a capture session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Initial tempo in BPM
    pub tempo_bpm: f64,
    pub steps_per_quarter: u32,
    pub time_signature: TimeSignature,
    /// Steps of count-in before notes are accepted
    pub pre_count_steps: u32,
    /// Steps recorded before the capture stops by itself
    pub recording_steps: u32,
    /// Closed notes shorter than this (seconds) are discarded
    pub min_note_duration: f64,
    /// Same-pitch notes starting within this window (seconds) are merged
    pub duplicate_window: f64,
    /// Output notes are lengthened to at least this (seconds)
    pub min_output_duration: f64,
    /// Note-on velocities are raised to at least this value
    pub velocity_floor: u8,
    /// Program assigned to captured notes
    pub program: u8,
    pub click_enabled: bool,
    pub click_pitch: u8,
    pub click_velocity: f32,
    pub click_volume: f32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            tempo_bpm: 120.0,
            steps_per_quarter: 4,
            time_signature: TimeSignature::four_four(),
            pre_count_steps: 32,
            recording_steps: 64,
            min_note_duration: 0.05,
            duplicate_window: 0.05,
            min_output_duration: 0.1,
            velocity_floor: 20,
            program: 0,
            click_enabled: true,
            click_pitch: 72,
            click_velocity: 1.0,
            click_volume: 0.5,
        }
    }
}

impl CaptureConfig {
    pub fn grid(&self) -> StepGrid {
        StepGrid::new(self.steps_per_quarter.max(1))
    }

    pub fn tempo(&self) -> Result<Tempo, ConfigError> {
        Tempo::try_new(self.tempo_bpm).ok_or(ConfigError::InvalidTempo(self.tempo_bpm))
    }

    pub fn optimize_options(&self) -> OptimizeOptions {
        OptimizeOptions {
            duplicate_window: self.duplicate_window,
            min_output_duration: self.min_output_duration,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tempo()?;
        if self.steps_per_quarter == 0 {
            return Err(ConfigError::Invalid("steps_per_quarter must be > 0".into()));
        }
        if self.recording_steps == 0 {
            return Err(ConfigError::Invalid("recording_steps must be > 0".into()));
        }
        if !(self.min_note_duration >= 0.0) || !(self.duplicate_window >= 0.0) {
            return Err(ConfigError::Invalid(
                "note durations and windows must be >= 0".into(),
            ));
        }
        if !(self.min_output_duration >= 0.0) {
            return Err(ConfigError::Invalid("min_output_duration must be >= 0".into()));
        }
        if self.velocity_floor > 127 || self.program > 127 || self.click_pitch > 127 {
            return Err(ConfigError::Invalid(
                "velocity_floor, program and click_pitch must be 0-127".into(),
            ));
        }
        Ok(())
    }
}

/// Tuning of the accompaniment stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Sampling temperature passed to the decoder
    pub temperature: f32,
    /// Number of candidate sequences decoded per request
    pub candidates: usize,
    pub selection: CandidateSelection,
    /// Drum hits quieter than this are removed
    pub drum_velocity_floor: u8,
    /// Length of generated sequences in steps
    pub output_steps: u32,
    /// Inclusive program ranges kept from the performance when mixing down
    pub kept_programs: Vec<(u8, u8)>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.6,
            candidates: 2,
            selection: CandidateSelection::MostNotes,
            drum_velocity_floor: 0,
            output_steps: 64,
            kept_programs: vec![(25, 31), (40, 48)],
        }
    }
}

/// Everything persisted between runs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub capture: CaptureConfig,
    pub generation: GenerationConfig,
    /// Only connect MIDI inputs whose name contains this text
    pub midi_input: Option<String>,
    /// Preferred MIDI output for playback
    pub midi_output: Option<String>,
}

impl Settings {
    /// `<config dir>/rythmiq/settings.ron`
    pub fn default_path() -> Option<PathBuf> {
        let mut path = dirs::config_dir()?;
        path.push("rythmiq");
        path.push("settings.ron");
        Some(path)
    }

    /// Load settings; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };

        let settings: Settings =
            ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
        settings.capture.validate()?;
        Ok(settings)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let text = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;
        fs::write(path, text)?;
        Ok(())
    }
}

/// Settings for one run of the program
///
/// Keeps what was read from disk apart from per-run overrides such as
/// command-line flags, so only deliberate changes are written back. A file
/// that exists but fails to load is never overwritten.
#[derive(Debug)]
pub struct SettingsStore {
    path: Option<PathBuf>,
    // None when the file could not be loaded
    stored: Option<Settings>,
    current: Settings,
}

impl SettingsStore {
    /// Open the store at the default location
    pub fn open() -> Self {
        Self::open_at(Settings::default_path())
    }

    pub fn open_at(path: Option<PathBuf>) -> Self {
        let stored = match &path {
            None => Some(Settings::default()),
            Some(path) => match Settings::load_from(path) {
                Ok(settings) => Some(settings),
                Err(e) => {
                    log::warn!(
                        "Ignoring settings at {}: {e}; the file will be left untouched",
                        path.display()
                    );
                    None
                }
            },
        };
        let current = stored.clone().unwrap_or_default();

        Self {
            path,
            stored,
            current,
        }
    }

    /// Settings in effect for this run
    pub fn current(&self) -> &Settings {
        &self.current
    }

    /// Change this run only
    pub fn override_for_run(&mut self, change: impl FnOnce(&mut Settings)) {
        change(&mut self.current);
    }

    /// Change this run and what gets saved
    pub fn update(&mut self, change: impl Fn(&mut Settings)) {
        change(&mut self.current);
        if let Some(stored) = &mut self.stored {
            change(stored);
        }
    }

    /// False when the file on disk failed to load
    pub fn is_writable(&self) -> bool {
        self.stored.is_some()
    }

    /// Write the stored settings back; returns whether anything was written
    pub fn save(&self) -> Result<bool, ConfigError> {
        let Some(stored) = &self.stored else {
            return Ok(false);
        };
        let path = self
            .path
            .as_deref()
            .ok_or_else(|| ConfigError::Invalid("no configuration directory".into()))?;
        stored.save_to(path)?;
        Ok(true)
    }
}
