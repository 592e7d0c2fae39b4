// Sequencer module
// Musical time, notes, note sequences and the metronome click

pub mod metronome;
pub mod note;
pub mod optimize;
pub mod sequence;
pub mod timeline;

pub use metronome::{ClickNote, ClickType, Metronome};
pub use note::TimedNote;
pub use optimize::{OptimizeOptions, optimize_notes};
pub use sequence::{NoteSequence, QuantizationInfo, SequenceError, TempoChange};
pub use timeline::{StepGrid, Tempo, TimeSignature};
