// Generate module - accompaniment generation and playback boundaries
//
// The model and the synthesizer are external. A generator turns a captured
// performance into candidate accompaniments; a player renders a sequence.
// Everything between (clean-up, candidate choice, drum muting, mixing) is
// done here with configurable heuristics.

pub mod player;
pub mod postprocess;
pub mod stage;

pub use player::{MidiOutputPlayer, ScheduledMessage, schedule_messages};
pub use postprocess::{mute_quiet_drums, sanitize_input, select_candidate};
pub use stage::AccompanimentStage;

use crate::midi::output::MidiOutputError;
use crate::sequencer::sequence::NoteSequence;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Input sequence has no usable notes")]
    EmptyInput,

    #[error("Generator returned no candidates")]
    NoCandidates,

    #[error("Model error: {0}")]
    Model(String),

    #[error("Playback error: {0}")]
    Playback(String),

    #[error("MIDI output error: {0}")]
    Output(#[from] MidiOutputError),
}

/// How one accompaniment is chosen among the decoded candidates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CandidateSelection {
    /// Densest candidate
    #[default]
    MostNotes,
    FewestNotes,
    /// First candidate as returned by the model
    First,
}

/// Encode a performance to a latent and decode accompaniments from it
pub trait AccompanimentGenerator {
    type Latent;

    fn encode(&mut self, performance: &NoteSequence) -> Result<Self::Latent, GenerationError>;

    /// Decode `candidates` sequences of `steps` steps at `temperature`
    fn decode(
        &mut self,
        latent: &Self::Latent,
        temperature: f32,
        candidates: usize,
        steps: u32,
    ) -> Result<Vec<NoteSequence>, GenerationError>;
}

/// Render a timed note list as audible or MIDI output
pub trait SequencePlayer {
    fn play(&mut self, sequence: &NoteSequence) -> Result<(), GenerationError>;

    /// Stop playback and silence every held note
    fn stop(&mut self);

    fn is_playing(&self) -> bool;
}
