// Audio module - metronome click output

pub mod click;
pub mod engine;
pub mod format_conversion;
pub mod parameters;

pub use click::{ClickSynth, NullClick};
pub use engine::{AudioError, ClickEngine, ClickTrigger};
