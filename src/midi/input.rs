// MIDI Input - access to live MIDI input ports
//
// The capture does not talk to midir directly: it asks a `MidiAccess` for a
// connection that forwards raw messages to a handler until it is dropped.
// This keeps the session testable without hardware.

use crate::capture::CaptureError;
use crate::midi::device::CLIENT_NAME;
use midir::{Ignore, MidiInput as MidirInput, MidiInputConnection};
use std::sync::Arc;

/// Callback receiving (timestamp in microseconds, raw message bytes)
pub type MidiHandler = Arc<dyn Fn(u64, &[u8]) + Send + Sync>;

/// Source of live MIDI input
pub trait MidiAccess {
    /// Live subscription; dropping it detaches the handler
    type Connection: Send + 'static;

    /// Subscribe `handler` to incoming messages
    ///
    /// Fails when MIDI is unavailable or no usable input port exists.
    fn connect(&mut self, handler: MidiHandler) -> Result<Self::Connection, CaptureError>;
}

/// `MidiAccess` backed by the platform MIDI service through midir
///
/// Connects to every input port, or only to ports whose name contains
/// `port_filter` when one is set.
#[derive(Debug, Clone, Default)]
pub struct MidirAccess {
    port_filter: Option<String>,
}

impl MidirAccess {
    pub fn new(port_filter: Option<String>) -> Self {
        Self { port_filter }
    }

    pub fn port_filter(&self) -> Option<&str> {
        self.port_filter.as_deref()
    }
}

/// Open midir connections, closed on drop
pub struct MidirConnections {
    connections: Vec<MidiInputConnection<()>>,
    port_names: Vec<String>,
}

impl MidirConnections {
    pub fn port_names(&self) -> &[String] {
        &self.port_names
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

impl Drop for MidirConnections {
    fn drop(&mut self) {
        for connection in self.connections.drain(..) {
            connection.close();
        }
        log::debug!("MIDI inputs detached: {:?}", self.port_names);
    }
}

impl MidiAccess for MidirAccess {
    type Connection = MidirConnections;

    fn connect(&mut self, handler: MidiHandler) -> Result<MidirConnections, CaptureError> {
        let lister = MidirInput::new(CLIENT_NAME)
            .map_err(|e| CaptureError::MidiUnavailable(e.to_string()))?;

        let selected: Vec<(usize, String)> = lister
            .ports()
            .iter()
            .enumerate()
            .map(|(index, port)| {
                let name = lister
                    .port_name(port)
                    .unwrap_or_else(|_| format!("Input {index}"));
                (index, name)
            })
            .filter(|(_, name)| match &self.port_filter {
                Some(filter) => name.to_lowercase().contains(&filter.to_lowercase()),
                None => true,
            })
            .collect();

        if selected.is_empty() {
            return Err(CaptureError::NoInputPorts);
        }

        let mut connections = Vec::with_capacity(selected.len());
        let mut port_names = Vec::with_capacity(selected.len());

        for (index, name) in selected {
            // midir consumes the client on connect, one client per port
            let mut midi_in = MidirInput::new(CLIENT_NAME)
                .map_err(|e| CaptureError::MidiUnavailable(e.to_string()))?;
            midi_in.ignore(Ignore::All);

            let ports = midi_in.ports();
            let Some(port) = ports.get(index) else {
                log::warn!("MIDI port '{name}' disappeared before connecting");
                continue;
            };

            let handler = Arc::clone(&handler);
            match midi_in.connect(
                port,
                "rythmiq-capture",
                move |timestamp, message, _| handler(timestamp, message),
                (),
            ) {
                Ok(connection) => {
                    log::info!("MIDI input connected: {name}");
                    connections.push(connection);
                    port_names.push(name);
                }
                Err(e) => log::warn!("MIDI input '{name}' could not be opened: {e}"),
            }
        }

        if connections.is_empty() {
            return Err(CaptureError::MidiUnavailable(
                "no input port could be opened".to_string(),
            ));
        }

        Ok(MidirConnections {
            connections,
            port_names,
        })
    }
}
