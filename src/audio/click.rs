// Click synthesis boundary
//
// The capture asks for clicks through `ClickSynth`; the cpal engine is one
// implementation, `NullClick` another for silent or headless runs.

use crate::sequencer::metronome::ClickNote;

/// Something that can sound a metronome click
pub trait ClickSynth: Send + Sync {
    fn trigger(&self, click: ClickNote);
}

/// Discards every click
#[derive(Debug, Clone, Copy, Default)]
pub struct NullClick;

impl ClickSynth for NullClick {
    fn trigger(&self, _click: ClickNote) {}
}
