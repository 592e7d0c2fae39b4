// Capture Session - step counter, open notes and finished notes of one take
//
// Pure state: no clock, no MIDI port. The step clock calls `tick`, the MIDI
// callback calls `handle_midi`, and both read the same step counter.

use crate::config::CaptureConfig;
use crate::midi::event::MidiEvent;
use crate::sequencer::metronome::ClickType;
use crate::sequencer::note::TimedNote;
use crate::sequencer::optimize::optimize_notes;
use crate::sequencer::sequence::{NoteSequence, QuantizationInfo, TempoChange};
use crate::sequencer::timeline::{StepGrid, Tempo};
use std::collections::HashMap;

/// Result of advancing the step counter by one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickOutcome {
    /// Step counter after the tick
    pub step: i64,
    /// Click to sound on this step, if it falls on a beat
    pub click: Option<ClickType>,
    /// The recording bound was reached; the take should stop
    pub reached_end: bool,
}

/// A note shown by the activity view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteActivity {
    pub pitch: u8,
    pub velocity: u8,
}

/// Copy of the session state needed to draw it
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureSnapshot {
    pub step: i64,
    pub steps_per_quarter: u32,
    pub pre_count_steps: u32,
    pub recording_steps: u32,
    pub recording: bool,
    pub tempo_bpm: f64,
    pub active: Vec<NoteActivity>,
    pub recorded: Vec<NoteActivity>,
}

impl CaptureSnapshot {
    /// Snapshot of an idle session
    pub fn idle(config: &CaptureConfig) -> Self {
        Self {
            step: -(config.pre_count_steps as i64),
            steps_per_quarter: config.steps_per_quarter.max(1),
            pre_count_steps: config.pre_count_steps,
            recording_steps: config.recording_steps,
            recording: false,
            tempo_bpm: config.tempo_bpm,
            active: Vec::new(),
            recorded: Vec::new(),
        }
    }

    /// True while the count-in is running
    pub fn in_pre_count(&self) -> bool {
        self.step < 0
    }
}

#[derive(Debug, Clone, Copy)]
struct OpenNote {
    start_time: f64,
    velocity: u8,
}

/// State of one capture take
///
/// Time of a step is measured from an anchor that moves whenever the tempo
/// changes during recording:
/// `time = anchor_time + (step - anchor_step) / steps_per_quarter * 60 / bpm`.
/// Times never decrease as the step counter grows, so a note's end is never
/// before its start.
#[derive(Debug)]
pub struct CaptureSession {
    config: CaptureConfig,
    grid: StepGrid,
    tempo: Tempo,
    current_step: i64,
    recording: bool,
    anchor_step: i64,
    anchor_time: f64,
    tempos: Vec<TempoChange>,
    active_notes: HashMap<u8, OpenNote>,
    finished_notes: Vec<TimedNote>,
}

impl CaptureSession {
    pub fn new(config: CaptureConfig) -> Self {
        let grid = config.grid();
        let tempo = Tempo::try_new(config.tempo_bpm).unwrap_or_default();

        Self {
            current_step: -(config.pre_count_steps as i64),
            config,
            grid,
            tempo,
            recording: false,
            anchor_step: 0,
            anchor_time: 0.0,
            tempos: vec![TempoChange {
                time: 0.0,
                qpm: tempo.bpm(),
            }],
            active_notes: HashMap::new(),
            finished_notes: Vec::new(),
        }
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    pub fn tempo(&self) -> Tempo {
        self.tempo
    }

    pub fn grid(&self) -> StepGrid {
        self.grid
    }

    pub fn current_step(&self) -> i64 {
        self.current_step
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Number of notes currently held
    pub fn open_note_count(&self) -> usize {
        self.active_notes.len()
    }

    /// Notes closed so far, before optimisation
    pub fn finished_notes(&self) -> &[TimedNote] {
        &self.finished_notes
    }

    /// Reset everything and begin the count-in at `tempo`
    pub fn start(&mut self, tempo: Tempo) {
        self.cleanup();
        self.tempo = tempo;
        self.tempos = vec![TempoChange {
            time: 0.0,
            qpm: tempo.bpm(),
        }];
        self.recording = true;
        log::info!(
            "Capture started at {} ({} pre-count steps, {} recording steps)",
            tempo,
            self.config.pre_count_steps,
            self.config.recording_steps
        );
    }

    /// Seconds from the recording origin at the current step
    pub fn current_time(&self) -> f64 {
        self.time_at(self.current_step)
    }

    fn time_at(&self, step: i64) -> f64 {
        self.anchor_time + self.grid.step_to_seconds(step - self.anchor_step, &self.tempo)
    }

    /// Advance the step counter by one
    ///
    /// Returns `None` when the session is not recording.
    pub fn tick(&mut self) -> Option<TickOutcome> {
        if !self.recording {
            return None;
        }

        self.current_step += 1;
        let step = self.current_step;

        let click = if self.grid.is_beat(step) {
            if self.grid.is_bar_start(step, &self.config.time_signature) {
                Some(ClickType::Accent)
            } else {
                Some(ClickType::Regular)
            }
        } else {
            None
        };

        Some(TickOutcome {
            step,
            click,
            reached_end: step >= self.config.recording_steps as i64,
        })
    }

    /// Apply one MIDI message
    ///
    /// Ignored while not recording and during the count-in.
    pub fn handle_midi(&mut self, event: MidiEvent) {
        if !self.recording || self.current_step < 0 {
            return;
        }

        let now = self.current_time();
        match event {
            MidiEvent::NoteOn { note, velocity, .. } => {
                // Re-triggering a held pitch closes the previous note first
                if let Some(open) = self.active_notes.remove(&note) {
                    self.close_note(note, open, now);
                }
                let velocity = velocity.clamp(self.config.velocity_floor.min(127), 127);
                self.active_notes.insert(
                    note,
                    OpenNote {
                        start_time: now,
                        velocity,
                    },
                );
                log::debug!("Note on {note} vel {velocity} at {now:.3}s");
            }
            MidiEvent::NoteOff { note, .. } => {
                if let Some(open) = self.active_notes.remove(&note) {
                    self.close_note(note, open, now);
                }
            }
            MidiEvent::Other { .. } => {}
        }
    }

    fn close_note(&mut self, pitch: u8, open: OpenNote, end_time: f64) {
        let end_time = end_time.max(open.start_time);
        if end_time - open.start_time < self.config.min_note_duration {
            log::debug!(
                "Discarding note {pitch} shorter than {}s",
                self.config.min_note_duration
            );
            return;
        }

        self.finished_notes.push(
            TimedNote::new(pitch, open.start_time, end_time, open.velocity)
                .with_program(self.config.program),
        );
    }

    /// Change the tempo without resetting the step counter
    ///
    /// Times of notes already started keep their values.
    pub fn set_tempo(&mut self, tempo: Tempo) {
        if tempo == self.tempo {
            return;
        }

        if self.recording && self.current_step > 0 {
            self.anchor_time = self.current_time();
            self.anchor_step = self.current_step;
            self.tempo = tempo;

            let change = TempoChange {
                time: self.anchor_time,
                qpm: tempo.bpm(),
            };
            match self.tempos.last_mut() {
                Some(last) if last.time == change.time => *last = change,
                _ => self.tempos.push(change),
            }
        } else {
            // Count-in: step 0 is still ahead, the origin stays at zero
            self.tempo = tempo;
            if let Some(first) = self.tempos.first_mut() {
                first.qpm = tempo.bpm();
            }
            self.tempos.truncate(1);
        }
        log::debug!("Capture tempo set to {tempo} at step {}", self.current_step);
    }

    /// Finish the take and return the optimized sequence
    ///
    /// Open notes are closed at the current time. Stopping a session that is
    /// not recording returns an empty sequence.
    pub fn stop(&mut self) -> NoteSequence {
        if !self.recording {
            return NoteSequence::empty(self.tempo, self.grid);
        }
        self.recording = false;

        let now = self.current_time();
        let mut open: Vec<(u8, OpenNote)> = self.active_notes.drain().collect();
        open.sort_by_key(|(pitch, _)| *pitch);
        for (pitch, note) in open {
            self.close_note(pitch, note, now);
        }

        let recorded = std::mem::take(&mut self.finished_notes);
        let notes = optimize_notes(recorded, &self.config.optimize_options());

        let recording_steps = self.config.recording_steps;
        let total_time = self.time_at(recording_steps as i64).max(now);

        log::info!(
            "Capture stopped at step {} with {} notes",
            self.current_step,
            notes.len()
        );

        NoteSequence {
            notes,
            tempos: self.tempos.clone(),
            quantization_info: QuantizationInfo {
                steps_per_quarter: self.grid.steps_per_quarter(),
            },
            total_quantized_steps: recording_steps,
            total_time,
        }
    }

    /// Drop all notes and return to the idle count-in position
    pub fn cleanup(&mut self) {
        self.recording = false;
        self.active_notes.clear();
        self.finished_notes.clear();
        self.current_step = -(self.config.pre_count_steps as i64);
        self.anchor_step = 0;
        self.anchor_time = 0.0;
        self.tempos.truncate(1);
    }

    pub fn snapshot(&self) -> CaptureSnapshot {
        let mut active: Vec<NoteActivity> = self
            .active_notes
            .iter()
            .map(|(&pitch, open)| NoteActivity {
                pitch,
                velocity: open.velocity,
            })
            .collect();
        active.sort_by_key(|n| n.pitch);

        CaptureSnapshot {
            step: self.current_step,
            steps_per_quarter: self.grid.steps_per_quarter(),
            pre_count_steps: self.config.pre_count_steps,
            recording_steps: self.config.recording_steps,
            recording: self.recording,
            tempo_bpm: self.tempo.bpm(),
            active,
            recorded: self
                .finished_notes
                .iter()
                .map(|n| NoteActivity {
                    pitch: n.pitch,
                    velocity: n.velocity,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note_on(note: u8, velocity: u8) -> MidiEvent {
        MidiEvent::NoteOn {
            channel: 0,
            note,
            velocity,
        }
    }

    fn note_off(note: u8) -> MidiEvent {
        MidiEvent::NoteOff { channel: 0, note }
    }

    fn started() -> CaptureSession {
        let mut session = CaptureSession::new(CaptureConfig::default());
        session.start(Tempo::new(120.0));
        session
    }

    fn advance_to(session: &mut CaptureSession, step: i64) {
        while session.current_step() < step {
            session.tick();
        }
    }

    #[test]
    fn test_start_enters_pre_count() {
        let session = started();

        assert!(session.is_recording());
        assert_eq!(session.current_step(), -32);
    }

    #[test]
    fn test_clicks_on_beats() {
        let mut session = started();

        let clicks: Vec<(i64, ClickType)> = (0..16)
            .filter_map(|_| session.tick())
            .filter_map(|t| t.click.map(|c| (t.step, c)))
            .collect();

        assert_eq!(
            clicks,
            vec![
                (-28, ClickType::Regular),
                (-24, ClickType::Regular),
                (-20, ClickType::Regular),
                (-16, ClickType::Accent)
            ]
        );
    }

    #[test]
    fn test_pre_count_ignores_midi() {
        let mut session = started();
        advance_to(&mut session, -1);

        session.handle_midi(note_on(60, 100));
        assert_eq!(session.open_note_count(), 0);
    }

    #[test]
    fn test_velocity_clamped_to_floor() {
        let mut session = started();
        advance_to(&mut session, 0);

        session.handle_midi(note_on(60, 5));
        advance_to(&mut session, 4);
        session.handle_midi(note_off(60));

        assert_eq!(session.finished_notes()[0].velocity, 20);
    }

    #[test]
    fn test_short_note_discarded() {
        let mut session = started();
        advance_to(&mut session, 0);

        session.handle_midi(note_on(60, 100));
        session.handle_midi(note_off(60));

        assert!(session.finished_notes().is_empty());
    }

    #[test]
    fn test_retrigger_closes_previous_note() {
        let mut session = started();
        advance_to(&mut session, 0);

        session.handle_midi(note_on(60, 100));
        advance_to(&mut session, 2);
        session.handle_midi(note_on(60, 90));
        advance_to(&mut session, 4);
        session.handle_midi(note_off(60));

        let notes = session.finished_notes();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].end_time, 0.25);
        assert_eq!(notes[1].start_time, 0.25);
        assert_eq!(notes[1].velocity, 90);
    }

    #[test]
    fn test_tempo_change_keeps_time_monotonic() {
        let mut session = started();
        advance_to(&mut session, 8);
        assert_eq!(session.current_time(), 1.0);

        session.set_tempo(Tempo::new(60.0));
        assert_eq!(session.current_time(), 1.0);

        session.tick();
        assert!((session.current_time() - 1.25).abs() < 1e-9);
    }

    #[test]
    fn test_tempo_change_in_pre_count_replaces_initial_tempo() {
        let mut session = started();
        session.tick();
        session.set_tempo(Tempo::new(90.0));

        let sequence = session.stop();
        assert_eq!(sequence.tempos.len(), 1);
        assert_eq!(sequence.qpm(), 90.0);
    }

    #[test]
    fn test_cleanup_resets() {
        let mut session = started();
        advance_to(&mut session, 3);
        session.handle_midi(note_on(64, 100));

        session.cleanup();
        session.cleanup();

        assert!(!session.is_recording());
        assert_eq!(session.open_note_count(), 0);
        assert_eq!(session.current_step(), -32);
        assert!(session.tick().is_none());
    }

    #[test]
    fn test_snapshot_lists_notes() {
        let mut session = started();
        advance_to(&mut session, 0);
        session.handle_midi(note_on(67, 80));
        session.handle_midi(note_on(60, 100));

        let snapshot = session.snapshot();
        assert_eq!(snapshot.step, 0);
        assert!(!snapshot.in_pre_count());
        assert_eq!(
            snapshot.active,
            vec![
                NoteActivity {
                    pitch: 60,
                    velocity: 100
                },
                NoteActivity {
                    pitch: 67,
                    velocity: 80
                }
            ]
        );
    }
}
