// Note representation for captured and generated sequences
// Times are in seconds from the recording origin (step 0)

use serde::{Deserialize, Serialize};

/// A timed note of a note sequence
///
/// Field names follow the camelCase JSON shape consumed by the generation
/// and playback stages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimedNote {
    /// MIDI note number (0-127, where 60 = C4)
    pub pitch: u8,

    /// Start time in seconds
    #[serde(default)]
    pub start_time: f64,

    /// End time in seconds, never before `start_time`
    #[serde(default)]
    pub end_time: f64,

    /// MIDI velocity (0-127)
    pub velocity: u8,

    /// General MIDI program (0 = acoustic grand piano)
    #[serde(default)]
    pub program: u8,

    #[serde(default)]
    pub is_drum: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantized_start_step: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantized_end_step: Option<i64>,
}

impl TimedNote {
    /// Creates a new melodic note on program 0
    pub fn new(pitch: u8, start_time: f64, end_time: f64, velocity: u8) -> Self {
        assert!(pitch <= 127, "MIDI pitch must be 0-127");
        assert!(velocity <= 127, "MIDI velocity must be 0-127");
        assert!(end_time >= start_time, "Note must not end before it starts");

        Self {
            pitch,
            start_time,
            end_time,
            velocity,
            program: 0,
            is_drum: false,
            quantized_start_step: None,
            quantized_end_step: None,
        }
    }

    pub fn with_program(mut self, program: u8) -> Self {
        self.program = program & 0x7F;
        self
    }

    pub fn as_drum(mut self) -> Self {
        self.is_drum = true;
        self
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Get the note name (e.g., "C4", "A#5")
    pub fn note_name(&self) -> String {
        const NOTE_NAMES: [&str; 12] = [
            "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
        ];

        let octave = (self.pitch / 12) as i32 - 1;
        let note_index = (self.pitch % 12) as usize;

        format!("{}{}", NOTE_NAMES[note_index], octave)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_creation() {
        let note = TimedNote::new(60, 0.0, 0.5, 100);

        assert_eq!(note.pitch, 60);
        assert_eq!(note.velocity, 100);
        assert_eq!(note.program, 0);
        assert!(!note.is_drum);
        assert_eq!(note.duration(), 0.5);
    }

    #[test]
    fn test_note_name() {
        assert_eq!(TimedNote::new(60, 0.0, 1.0, 100).note_name(), "C4");
        assert_eq!(TimedNote::new(69, 0.0, 1.0, 100).note_name(), "A4");
        assert_eq!(TimedNote::new(73, 0.0, 1.0, 100).note_name(), "C#5");
    }

    #[test]
    fn test_builders() {
        let kick = TimedNote::new(36, 0.0, 0.1, 110).as_drum();
        assert!(kick.is_drum);

        let bass = TimedNote::new(40, 0.0, 0.25, 90).with_program(33);
        assert_eq!(bass.program, 33);
    }

    #[test]
    #[should_panic(expected = "MIDI pitch must be 0-127")]
    fn test_invalid_pitch() {
        TimedNote::new(128, 0.0, 1.0, 100);
    }

    #[test]
    #[should_panic(expected = "Note must not end before it starts")]
    fn test_end_before_start() {
        TimedNote::new(60, 1.0, 0.5, 100);
    }

    #[test]
    fn test_json_field_names() {
        let json = serde_json::to_value(TimedNote::new(60, 0.0, 0.5, 100)).unwrap();

        assert_eq!(json["startTime"], 0.0);
        assert_eq!(json["endTime"], 0.5);
        assert_eq!(json["isDrum"], false);
        assert!(json.get("quantizedStartStep").is_none());
    }
}
