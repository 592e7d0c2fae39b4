// Capture module
// Turns live MIDI input into a note sequence on a tempo-driven step clock

pub mod clock;
pub mod recorder;
pub mod session;

pub use clock::{ClockControl, SharedTempo, StepClock};
pub use recorder::MidiCapture;
pub use session::{CaptureSession, CaptureSnapshot, NoteActivity, TickOutcome};

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("MIDI access unavailable: {0}")]
    MidiUnavailable(String),

    #[error("No MIDI input ports found")]
    NoInputPorts,

    #[error("Invalid tempo: {0} BPM (expected 20-999)")]
    InvalidTempo(f64),

    #[error("Capture clock could not be started: {0}")]
    Clock(#[from] std::io::Error),

    #[error("Invalid capture configuration: {0}")]
    Config(#[from] crate::config::ConfigError),
}
