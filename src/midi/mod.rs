// MIDI module - parsing, device enumeration, live input and output ports

pub mod device;
pub mod event;
pub mod input;
pub mod output;

pub use device::{MidiDeviceInfo, MidiDeviceManager};
pub use event::MidiEvent;
pub use input::{MidiAccess, MidiHandler, MidirAccess, MidirConnections};
pub use output::{MidiOutputError, MidiOutputHandle};
