// MIDI device enumeration

use midir::{MidiInput as MidirInput, MidiOutput as MidirOutput};

/// Client name announced to the platform MIDI service
pub const CLIENT_NAME: &str = "Rythmiq";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MidiDeviceInfo {
    pub index: usize,
    pub name: String,
}

impl MidiDeviceInfo {
    /// Case-insensitive substring match used for `--input` style filters
    pub fn matches(&self, filter: &str) -> bool {
        self.name.to_lowercase().contains(&filter.to_lowercase())
    }
}

pub struct MidiDeviceManager;

impl MidiDeviceManager {
    pub fn new() -> Self {
        Self
    }

    /// List every available MIDI input port
    pub fn list_input_ports(&self) -> Vec<MidiDeviceInfo> {
        let mut devices = Vec::new();

        match MidirInput::new(&format!("{CLIENT_NAME} Scanner")) {
            Ok(midi_in) => {
                for (index, port) in midi_in.ports().iter().enumerate() {
                    let name = midi_in
                        .port_name(port)
                        .unwrap_or_else(|_| format!("Input {index}"));
                    devices.push(MidiDeviceInfo { index, name });
                }
            }
            Err(e) => log::warn!("MIDI input enumeration failed: {e}"),
        }

        devices
    }

    /// List every available MIDI output port
    pub fn list_output_ports(&self) -> Vec<MidiDeviceInfo> {
        let mut devices = Vec::new();

        match MidirOutput::new(&format!("{CLIENT_NAME} Scanner")) {
            Ok(midi_out) => {
                for (index, port) in midi_out.ports().iter().enumerate() {
                    let name = midi_out
                        .port_name(port)
                        .unwrap_or_else(|_| format!("Output {index}"));
                    devices.push(MidiDeviceInfo { index, name });
                }
            }
            Err(e) => log::warn!("MIDI output enumeration failed: {e}"),
        }

        devices
    }
}

impl Default for MidiDeviceManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_matching() {
        let device = MidiDeviceInfo {
            index: 0,
            name: "Arturia KeyStep 37".to_string(),
        };

        assert!(device.matches("keystep"));
        assert!(device.matches("KeyStep 37"));
        assert!(!device.matches("launchpad"));
    }
}
