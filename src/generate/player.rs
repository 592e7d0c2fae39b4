// MIDI Output Player - plays a note sequence on a MIDI output port
//
// Messages are scheduled up front and sent from a player thread. Drums go to
// channel 10; each melodic program gets its own channel.

use crate::generate::{GenerationError, SequencePlayer};
use crate::midi::output::MidiOutputHandle;
use crate::sequencer::sequence::NoteSequence;
use crossbeam_channel::{RecvTimeoutError, Sender, bounded};
use std::collections::BTreeMap;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Channel 10 in 1-based numbering
pub const DRUM_CHANNEL: u8 = 9;

/// A raw message due at `time` seconds after playback starts
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledMessage {
    pub time: f64,
    pub bytes: Vec<u8>,
}

/// Channel per melodic program, skipping the drum channel
fn assign_channels(sequence: &NoteSequence) -> BTreeMap<u8, u8> {
    let mut channels = BTreeMap::new();
    let free = (0..16u8).filter(|&c| c != DRUM_CHANNEL).collect::<Vec<_>>();

    for note in sequence.notes.iter().filter(|n| !n.is_drum) {
        if !channels.contains_key(&note.program) {
            let channel = free[channels.len() % free.len()];
            channels.insert(note.program, channel);
        }
    }
    channels
}

/// Program changes at time 0, then note-on/off pairs in time order
///
/// At equal times note-offs come first so a repeated pitch is retriggered.
pub fn schedule_messages(sequence: &NoteSequence) -> Vec<ScheduledMessage> {
    let channels = assign_channels(sequence);

    let mut messages: Vec<ScheduledMessage> = channels
        .iter()
        .map(|(&program, &channel)| ScheduledMessage {
            time: 0.0,
            bytes: vec![0xC0 | channel, program & 0x7F],
        })
        .collect();

    let mut notes: Vec<(f64, u8, Vec<u8>)> = Vec::with_capacity(sequence.len() * 2);
    for note in &sequence.notes {
        let channel = if note.is_drum {
            DRUM_CHANNEL
        } else {
            channels.get(&note.program).copied().unwrap_or(0)
        };
        let start = note.start_time.max(0.0);
        let end = note.end_time.max(start);

        notes.push((start, 1, vec![0x90 | channel, note.pitch & 0x7F, note.velocity.max(1) & 0x7F]));
        notes.push((end, 0, vec![0x80 | channel, note.pitch & 0x7F, 0]));
    }
    notes.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

    messages.extend(
        notes
            .into_iter()
            .map(|(time, _, bytes)| ScheduledMessage { time, bytes }),
    );
    messages
}

/// Instant a message `time` seconds into playback is due
///
/// None when the offset is not a finite, representable duration.
fn due_at(started: Instant, time: f64) -> Option<Instant> {
    let offset = Duration::try_from_secs_f64(time).ok()?;
    started.checked_add(offset)
}

/// `SequencePlayer` over a MIDI output port
pub struct MidiOutputPlayer {
    port_filter: Option<String>,
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl MidiOutputPlayer {
    /// Play on the first output whose name contains `port_filter`
    pub fn new(port_filter: Option<String>) -> Self {
        Self {
            port_filter,
            stop_tx: None,
            handle: None,
        }
    }
}

impl SequencePlayer for MidiOutputPlayer {
    fn play(&mut self, sequence: &NoteSequence) -> Result<(), GenerationError> {
        self.stop();

        let mut output = MidiOutputHandle::open(self.port_filter.as_deref())?;
        let messages = schedule_messages(sequence);
        let (stop_tx, stop_rx) = bounded::<()>(1);

        log::info!(
            "Playing {} notes on {}",
            sequence.len(),
            output.name()
        );

        let handle = std::thread::Builder::new()
            .name("rythmiq-player".to_string())
            .spawn(move || {
                let started = Instant::now();
                for message in messages {
                    let Some(due) = due_at(started, message.time) else {
                        log::warn!("Playback stopped at unreachable time {}s", message.time);
                        break;
                    };
                    match stop_rx.recv_deadline(due) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                    if let Err(e) = output.send_raw(&message.bytes) {
                        log::warn!("Playback message dropped: {e}");
                    }
                }
                if let Err(e) = output.all_notes_off() {
                    log::warn!("Could not silence MIDI output: {e}");
                }
            })
            .map_err(|e| GenerationError::Playback(e.to_string()))?;

        self.stop_tx = Some(stop_tx);
        self.handle = Some(handle);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.try_send(());
        }
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            log::error!("Player thread panicked");
        }
    }

    fn is_playing(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for MidiOutputPlayer {
    fn drop(&mut self) {
        self.stop();
    }
}
