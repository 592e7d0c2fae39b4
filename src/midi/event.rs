// MIDI event types
// Raw channel-voice messages decoded into the note events the capture consumes

/// A decoded MIDI message
///
/// Only note messages are relevant to capture; everything else is reported as
/// `Other` so callers can log or ignore it without re-parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiEvent {
    NoteOn { channel: u8, note: u8, velocity: u8 },
    NoteOff { channel: u8, note: u8 },
    Other { status: u8 },
}

impl MidiEvent {
    /// Parse a raw MIDI message
    ///
    /// A note-on with velocity 0 is reported as a note-off, as running-status
    /// keyboards commonly send it that way.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let (&status, data) = bytes.split_first()?;

        // Data bytes have the high bit clear; a status byte must have it set
        if status & 0x80 == 0 {
            return None;
        }

        let message_type = status & 0xF0;
        let channel = status & 0x0F;

        match message_type {
            0x90 | 0x80 => {
                if data.len() < 2 {
                    return None;
                }
                let note = data[0] & 0x7F;
                let velocity = data[1] & 0x7F;

                if message_type == 0x90 && velocity > 0 {
                    Some(MidiEvent::NoteOn {
                        channel,
                        note,
                        velocity,
                    })
                } else {
                    Some(MidiEvent::NoteOff { channel, note })
                }
            }
            _ => Some(MidiEvent::Other { status }),
        }
    }

    /// Encode back to raw bytes (used by the output player)
    pub fn to_bytes(&self) -> Option<[u8; 3]> {
        match *self {
            MidiEvent::NoteOn {
                channel,
                note,
                velocity,
            } => Some([0x90 | (channel & 0x0F), note & 0x7F, velocity & 0x7F]),
            MidiEvent::NoteOff { channel, note } => {
                Some([0x80 | (channel & 0x0F), note & 0x7F, 0])
            }
            MidiEvent::Other { .. } => None,
        }
    }

    /// Note number carried by the event, if any
    pub fn note(&self) -> Option<u8> {
        match *self {
            MidiEvent::NoteOn { note, .. } | MidiEvent::NoteOff { note, .. } => Some(note),
            MidiEvent::Other { .. } => None,
        }
    }
}
