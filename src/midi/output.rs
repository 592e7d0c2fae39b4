// MIDI Output - connection used to render note sequences on external gear

use crate::midi::device::CLIENT_NAME;
use crate::midi::event::MidiEvent;
use midir::{MidiOutput as MidirOutput, MidiOutputConnection};

#[derive(Debug, thiserror::Error)]
pub enum MidiOutputError {
    #[error("MIDI output unavailable: {0}")]
    Unavailable(String),

    #[error("No MIDI output port found")]
    NoPort,

    #[error("MIDI send failed: {0}")]
    Send(String),
}

/// Open MIDI output connection
pub struct MidiOutputHandle {
    name: String,
    connection: MidiOutputConnection,
}

impl MidiOutputHandle {
    /// Open the first output port whose name contains `filter`,
    /// or the first port at all when no filter is given
    pub fn open(filter: Option<&str>) -> Result<Self, MidiOutputError> {
        let midi_out = MidirOutput::new(CLIENT_NAME)
            .map_err(|e| MidiOutputError::Unavailable(e.to_string()))?;

        let ports = midi_out.ports();
        let found = ports.iter().enumerate().find_map(|(index, port)| {
            let name = midi_out
                .port_name(port)
                .unwrap_or_else(|_| format!("Output {index}"));
            let wanted = filter
                .map(|f| name.to_lowercase().contains(&f.to_lowercase()))
                .unwrap_or(true);
            wanted.then(|| (port.clone(), name))
        });

        let Some((port, name)) = found else {
            return Err(MidiOutputError::NoPort);
        };

        let connection = midi_out
            .connect(&port, "rythmiq-playback")
            .map_err(|e| MidiOutputError::Unavailable(e.to_string()))?;

        log::info!("MIDI output connected: {name}");
        Ok(Self { name, connection })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn send_raw(&mut self, bytes: &[u8]) -> Result<(), MidiOutputError> {
        self.connection
            .send(bytes)
            .map_err(|e| MidiOutputError::Send(e.to_string()))
    }

    pub fn send(&mut self, event: MidiEvent) -> Result<(), MidiOutputError> {
        match event.to_bytes() {
            Some(bytes) => self.send_raw(&bytes),
            None => Ok(()),
        }
    }

    /// Program change on `channel`
    pub fn program_change(&mut self, channel: u8, program: u8) -> Result<(), MidiOutputError> {
        self.send_raw(&[0xC0 | (channel & 0x0F), program & 0x7F])
    }

    /// All Notes Off (CC 123) on every channel
    pub fn all_notes_off(&mut self) -> Result<(), MidiOutputError> {
        for channel in 0..16u8 {
            self.send_raw(&[0xB0 | channel, 123, 0])?;
        }
        Ok(())
    }
}
