// MIDI Capture - one take from MIDI input to note sequence
//
// Wires a `CaptureSession` to a MIDI input subscription, a step clock and a
// click synth. The MIDI callback and the clock thread share the session
// behind a mutex, so both always see the same step counter.

use crate::audio::click::ClickSynth;
use crate::capture::CaptureError;
use crate::capture::clock::{ClockControl, SharedTempo, StepClock};
use crate::capture::session::{CaptureSession, CaptureSnapshot};
use crate::config::CaptureConfig;
use crate::messaging::channels::NotificationProducer;
use crate::messaging::notification::{Notification, NotificationCategory};
use crate::midi::event::MidiEvent;
use crate::midi::input::{MidiAccess, MidiHandler};
use crate::sequencer::metronome::ClickNote;
use crate::sequencer::sequence::NoteSequence;
use crate::sequencer::timeline::Tempo;
use crossbeam_channel::{Receiver, Sender, unbounded};
use ringbuf::traits::Producer;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

fn lock(session: &Mutex<CaptureSession>) -> MutexGuard<'_, CaptureSession> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

fn notify(notifications: &Option<Arc<Mutex<NotificationProducer>>>, notification: Notification) {
    if let Some(tx) = notifications
        && let Ok(mut tx) = tx.try_lock()
    {
        let _ = tx.try_push(notification);
    }
}

/// Live capture of one take at a time
pub struct MidiCapture<A: MidiAccess> {
    access: A,
    session: Arc<Mutex<CaptureSession>>,
    tempo: SharedTempo,
    clock: Option<StepClock>,
    connection: Option<A::Connection>,
    clicks: Arc<dyn ClickSynth>,
    notifications: Option<Arc<Mutex<NotificationProducer>>>,
    finished_tx: Sender<NoteSequence>,
    finished_rx: Receiver<NoteSequence>,
}

impl<A: MidiAccess> MidiCapture<A> {
    pub fn new(access: A, config: CaptureConfig, clicks: Arc<dyn ClickSynth>) -> Self {
        let session = CaptureSession::new(config);
        let tempo = SharedTempo::new(session.tempo());
        let (finished_tx, finished_rx) = unbounded();

        Self {
            access,
            session: Arc::new(Mutex::new(session)),
            tempo,
            clock: None,
            connection: None,
            clicks,
            notifications: None,
            finished_tx,
            finished_rx,
        }
    }

    /// Send progress notifications to the UI
    pub fn with_notifications(mut self, notifications: NotificationProducer) -> Self {
        self.notifications = Some(Arc::new(Mutex::new(notifications)));
        self
    }

    pub fn access(&self) -> &A {
        &self.access
    }

    /// Begin a take: count-in, then recording until the step bound
    ///
    /// On failure nothing is left running.
    pub fn start_capture(&mut self, tempo: Tempo) -> Result<(), CaptureError> {
        self.cleanup();

        match self.try_start(tempo) {
            Ok(()) => Ok(()),
            Err(e) => {
                log::error!("MIDI capture error: {e}");
                self.cleanup();
                Err(e)
            }
        }
    }

    fn try_start(&mut self, tempo: Tempo) -> Result<(), CaptureError> {
        let config = {
            let mut session = lock(&self.session);
            session.config().validate()?;
            session.start(tempo);
            session.config().clone()
        };
        self.tempo.set(tempo);

        let handler: MidiHandler = {
            let session = Arc::clone(&self.session);
            Arc::new(move |_timestamp, bytes| {
                if let Some(event) = MidiEvent::from_bytes(bytes) {
                    lock(&session).handle_midi(event);
                }
            })
        };
        self.connection = Some(self.access.connect(handler)?);

        let grid = config.grid();
        let session = Arc::clone(&self.session);
        let clicks = Arc::clone(&self.clicks);
        let notifications = self.notifications.clone();
        let finished_tx = self.finished_tx.clone();
        let shared_tempo = self.tempo.clone();

        let on_tick = move || {
            let mut session = lock(&session);
            let Some(outcome) = session.tick() else {
                return ClockControl::Stop;
            };

            if config.click_enabled
                && let Some(click_type) = outcome.click
            {
                // 32nd note
                let duration = shared_tempo.get().beat_duration_seconds() / 8.0;
                clicks.trigger(ClickNote {
                    pitch: config.click_pitch,
                    duration,
                    scheduled_at: Instant::now(),
                    velocity: config.click_velocity,
                    click_type,
                });
            }

            if outcome.step == 0 {
                notify(
                    &notifications,
                    Notification::info(NotificationCategory::Capture, "Recording"),
                );
            }

            if outcome.reached_end {
                let sequence = session.stop();
                drop(session);
                notify(
                    &notifications,
                    Notification::info(
                        NotificationCategory::Capture,
                        format!("Take finished with {} notes", sequence.len()),
                    ),
                );
                let _ = finished_tx.send(sequence);
                return ClockControl::Stop;
            }

            ClockControl::Continue
        };

        self.clock = Some(StepClock::start(grid, self.tempo.clone(), on_tick)?);
        Ok(())
    }

    /// Stop the clock and MIDI subscription
    fn halt(&mut self) {
        if let Some(mut clock) = self.clock.take() {
            clock.stop();
        }
        self.connection = None;
    }

    /// End the take and return its notes
    ///
    /// A take that already stopped at the step bound is returned here if it
    /// was not collected yet. Otherwise stopping an idle capture returns an
    /// empty sequence.
    pub fn stop_capture(&mut self) -> NoteSequence {
        self.halt();

        if let Ok(sequence) = self.finished_rx.try_recv() {
            return sequence;
        }
        lock(&self.session).stop()
    }

    /// Take that stopped at the step bound, if any
    pub fn try_finished(&self) -> Option<NoteSequence> {
        self.finished_rx.try_recv().ok()
    }

    /// Wait until the take stops at the step bound
    pub fn wait_finished(&self, timeout: Duration) -> Option<NoteSequence> {
        self.finished_rx.recv_timeout(timeout).ok()
    }

    /// Change the tempo; a running clock keeps its step count
    pub fn set_tempo(&mut self, tempo: Tempo) {
        lock(&self.session).set_tempo(tempo);
        self.tempo.set(tempo);
    }

    pub fn tempo(&self) -> Tempo {
        self.tempo.get()
    }

    /// Stop everything and drop all notes; safe to call repeatedly
    pub fn cleanup(&mut self) {
        self.halt();
        lock(&self.session).cleanup();
        while self.finished_rx.try_recv().is_ok() {}
    }

    pub fn is_active(&self) -> bool {
        lock(&self.session).is_recording()
    }

    /// True while the step clock thread is alive
    pub fn clock_running(&self) -> bool {
        self.clock.as_ref().is_some_and(StepClock::is_running)
    }

    /// True while MIDI input is subscribed
    pub fn is_listening(&self) -> bool {
        self.connection.is_some()
    }

    pub fn snapshot(&self) -> CaptureSnapshot {
        lock(&self.session).snapshot()
    }
}

impl<A: MidiAccess> Drop for MidiCapture<A> {
    fn drop(&mut self) {
        self.cleanup();
    }
}
