// Rythmiq - MIDI capture against a metronome, with hooks for generated accompaniment

pub mod audio;
pub mod capture;
pub mod config;
pub mod generate;
pub mod messaging;
pub mod midi;
pub mod sequencer;
pub mod ui;

// Re-export commonly used types for convenience
pub use audio::{ClickEngine, ClickSynth, NullClick};
pub use capture::{CaptureError, CaptureSession, MidiCapture};
pub use config::{CaptureConfig, GenerationConfig, Settings, SettingsStore};
pub use generate::{AccompanimentGenerator, AccompanimentStage, GenerationError, SequencePlayer};
pub use messaging::channels::{create_click_channel, create_notification_channel};
pub use midi::{MidiAccess, MidiEvent, MidirAccess};
pub use sequencer::{NoteSequence, StepGrid, Tempo, TimedNote};

/// File name for a take recorded now, e.g. `rythmiq-take-20240501-193012.json`
pub fn default_take_file_name() -> String {
    format!(
        "rythmiq-take-{}.json",
        chrono::Local::now().format("%Y%m%d-%H%M%S")
    )
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_default_take_file_name() {
        let name = super::default_take_file_name();
        assert!(name.starts_with("rythmiq-take-"));
        assert!(name.ends_with(".json"));
        assert_eq!(name.len(), "rythmiq-take-20240501-193012.json".len());
    }
}
