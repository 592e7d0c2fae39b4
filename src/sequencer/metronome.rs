// Metronome - click sound for the capture count-in and recording
// Each click is synthesized from its request: pitch, length and velocity

use std::f32::consts::PI;
use std::time::Instant;

/// Metronome click type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickType {
    /// Click on first beat of bar (accent/downbeat)
    Accent,
    /// Click on other beats
    Regular,
}

/// A click request handed to the synthesis collaborator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClickNote {
    /// MIDI pitch of the click (72 = C5)
    pub pitch: u8,
    /// Length in seconds
    pub duration: f64,
    /// When the click should sound
    pub scheduled_at: Instant,
    /// Gain multiplier (0.0 to 1.0)
    pub velocity: f32,
    pub click_type: ClickType,
}

/// Frequency in Hz of a MIDI pitch (A4 = 440 Hz)
pub fn pitch_to_frequency(pitch: u8) -> f32 {
    440.0 * 2f32.powf((pitch as f32 - 69.0) / 12.0)
}

const ACCENT_AMPLITUDE: f32 = 0.6;
const REGULAR_AMPLITUDE: f32 = 0.4;
// Envelope falls to e^-8 by the end of the click
const DECAY: f32 = 8.0;

#[derive(Debug, Clone)]
struct ClickPlayback {
    phase_increment: f32,
    amplitude: f32,
    length: usize,
    position: usize,
}

/// Click voice rendered inside the audio callback
///
/// A click is a decaying sine at the requested pitch, an octave higher and
/// louder for accents, lasting the requested duration. Nothing is allocated
/// per click.
#[derive(Debug, Clone)]
pub struct Metronome {
    sample_rate: f32,
    volume: f32,
    current_click: Option<ClickPlayback>,
}

impl Metronome {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            volume: 0.5,
            current_click: None,
        }
    }

    /// Set metronome volume (0.0 to 1.0)
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    /// Start `click`, replacing any click still ringing
    pub fn trigger_click(&mut self, click: &ClickNote) {
        let (frequency, amplitude) = match click.click_type {
            ClickType::Accent => (pitch_to_frequency(click.pitch) * 2.0, ACCENT_AMPLITUDE),
            ClickType::Regular => (pitch_to_frequency(click.pitch), REGULAR_AMPLITUDE),
        };
        let length = (click.duration.max(0.0) * self.sample_rate as f64) as usize;

        self.current_click = Some(ClickPlayback {
            phase_increment: 2.0 * PI * frequency / self.sample_rate,
            amplitude: amplitude * click.velocity.clamp(0.0, 1.0),
            length,
            position: 0,
        });
    }

    /// Process one sample of metronome output
    /// Returns the click sample (0.0 if no click active)
    pub fn process_sample(&mut self) -> f32 {
        let Some(playback) = &mut self.current_click else {
            return 0.0;
        };

        if playback.position >= playback.length {
            self.current_click = None;
            return 0.0;
        }

        let t = playback.position as f32 / playback.length as f32;
        let envelope = (-t * DECAY).exp();
        let sample = (playback.position as f32 * playback.phase_increment).sin()
            * envelope
            * playback.amplitude
            * self.volume;
        playback.position += 1;
        sample
    }
}
