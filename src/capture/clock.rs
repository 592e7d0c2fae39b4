// Step Clock - periodic tick at step resolution on a dedicated thread
//
// The interval is re-read from the shared tempo before every tick, so a
// tempo change takes effect on the next step without restarting the clock.

use crate::sequencer::timeline::{StepGrid, Tempo};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Tempo shared between the UI and the clock thread
/// Stores the BPM as f64 bits for lock-free access
#[derive(Clone, Debug)]
pub struct SharedTempo {
    bits: Arc<AtomicU64>,
}

impl SharedTempo {
    pub fn new(tempo: Tempo) -> Self {
        Self {
            bits: Arc::new(AtomicU64::new(tempo.bpm().to_bits())),
        }
    }

    pub fn set(&self, tempo: Tempo) {
        self.bits.store(tempo.bpm().to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self) -> Tempo {
        Tempo::try_new(f64::from_bits(self.bits.load(Ordering::Relaxed))).unwrap_or_default()
    }
}

impl Default for SharedTempo {
    fn default() -> Self {
        Self::new(Tempo::default())
    }
}

/// Returned by the tick callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockControl {
    Continue,
    Stop,
}

/// Running tick source; stopped on `stop` or drop
pub struct StepClock {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl StepClock {
    /// Start ticking every step of `grid` at the current `tempo`
    ///
    /// The first tick fires one interval after the call. The clock ends by
    /// itself when `on_tick` returns `ClockControl::Stop`.
    pub fn start<F>(grid: StepGrid, tempo: SharedTempo, mut on_tick: F) -> std::io::Result<Self>
    where
        F: FnMut() -> ClockControl + Send + 'static,
    {
        let (stop_tx, stop_rx): (Sender<()>, Receiver<()>) = bounded(1);

        let handle = std::thread::Builder::new()
            .name("rythmiq-clock".to_string())
            .spawn(move || {
                let mut deadline = Instant::now();
                loop {
                    let interval =
                        Duration::from_secs_f64(grid.step_duration_seconds(&tempo.get()));
                    deadline += interval;

                    // Fell far behind (suspended process): resync instead of bursting
                    let now = Instant::now();
                    if now > deadline + interval * 4 {
                        log::warn!("Capture clock late by {:?}, resyncing", now - deadline);
                        deadline = now;
                    }

                    match stop_rx.recv_deadline(deadline) {
                        Err(RecvTimeoutError::Timeout) => {
                            if on_tick() == ClockControl::Stop {
                                log::debug!("Capture clock finished");
                                break;
                            }
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            })?;

        Ok(Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }

    /// True until the clock thread has exited
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Halt the clock; no tick runs after this returns
    ///
    /// Must not be called from inside the tick callback.
    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.try_send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.thread().id() == std::thread::current().id() {
                return;
            }
            if handle.join().is_err() {
                log::error!("Capture clock thread panicked");
            }
        }
    }
}

impl Drop for StepClock {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_shared_tempo() {
        let tempo = SharedTempo::new(Tempo::new(100.0));
        let other = tempo.clone();

        other.set(Tempo::new(140.0));
        assert_eq!(tempo.get().bpm(), 140.0);
    }

    #[test]
    fn test_clock_stops_itself() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);

        // 999 BPM: 15ms per step
        let mut clock = StepClock::start(
            StepGrid::sixteenths(),
            SharedTempo::new(Tempo::new(999.0)),
            move || {
                if counter.fetch_add(1, Ordering::SeqCst) + 1 >= 3 {
                    ClockControl::Stop
                } else {
                    ClockControl::Continue
                }
            },
        )
        .unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while clock.is_running() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        clock.stop();

        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_stop_halts_ticks() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);

        let mut clock = StepClock::start(
            StepGrid::sixteenths(),
            SharedTempo::new(Tempo::new(999.0)),
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                ClockControl::Continue
            },
        )
        .unwrap();

        std::thread::sleep(Duration::from_millis(50));
        clock.stop();
        let after_stop = count.load(Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(50));

        assert_eq!(count.load(Ordering::SeqCst), after_stop);
        assert!(!clock.is_running());
        clock.stop();
    }
}
