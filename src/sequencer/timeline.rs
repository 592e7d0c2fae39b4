// Timeline - Musical time representation
// Tempo, time signature and the sixteenth-note step grid used by capture

use std::fmt;

/// Time signature (numerator/denominator)
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TimeSignature {
    pub numerator: u8,   // Beats per bar
    pub denominator: u8, // Note value (4 = quarter note, 8 = eighth note)
}

impl TimeSignature {
    /// Creates a new time signature
    pub fn new(numerator: u8, denominator: u8) -> Self {
        assert!(numerator > 0, "Time signature numerator must be > 0");
        assert!(
            denominator.is_power_of_two(),
            "Time signature denominator must be power of 2"
        );
        Self {
            numerator,
            denominator,
        }
    }

    /// Common 4/4 time signature
    pub fn four_four() -> Self {
        Self::new(4, 4)
    }

    /// Number of quarter notes in one bar
    /// Example: 4/4 = 4.0, 6/8 = 3.0
    pub fn quarters_per_bar(&self) -> f64 {
        self.numerator as f64 * 4.0 / self.denominator as f64
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::four_four()
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// Tempo in BPM (quarter notes per minute)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tempo {
    bpm: f64,
}

impl Tempo {
    pub const MIN_BPM: f64 = 20.0;
    pub const MAX_BPM: f64 = 999.0;

    /// Creates a new tempo
    /// BPM must be in range [20.0, 999.0]
    pub fn new(bpm: f64) -> Self {
        assert!(
            (Self::MIN_BPM..=Self::MAX_BPM).contains(&bpm),
            "BPM must be between 20 and 999"
        );
        Self { bpm }
    }

    /// Fallible constructor for user-provided values
    pub fn try_new(bpm: f64) -> Option<Self> {
        (Self::MIN_BPM..=Self::MAX_BPM)
            .contains(&bpm)
            .then_some(Self { bpm })
    }

    /// Get BPM value
    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Duration of one beat (quarter note) in seconds
    pub fn beat_duration_seconds(&self) -> f64 {
        60.0 / self.bpm
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self::new(120.0)
    }
}

impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} BPM", self.bpm)
    }
}

/// Quantization grid: a fixed number of steps per quarter note
///
/// Steps are signed so that the pre-count can be expressed as negative steps
/// before the recording origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepGrid {
    steps_per_quarter: u32,
}

impl StepGrid {
    pub fn new(steps_per_quarter: u32) -> Self {
        assert!(steps_per_quarter > 0, "Steps per quarter must be > 0");
        Self { steps_per_quarter }
    }

    /// Sixteenth-note grid (4 steps per quarter)
    pub fn sixteenths() -> Self {
        Self::new(4)
    }

    pub fn steps_per_quarter(&self) -> u32 {
        self.steps_per_quarter
    }

    /// Number of steps in one bar
    pub fn steps_per_bar(&self, time_signature: &TimeSignature) -> u32 {
        (time_signature.quarters_per_bar() * self.steps_per_quarter as f64).round() as u32
    }

    /// Duration of one step in seconds (tick interval of the capture clock)
    pub fn step_duration_seconds(&self, tempo: &Tempo) -> f64 {
        tempo.beat_duration_seconds() / self.steps_per_quarter as f64
    }

    /// `time = (step / steps_per_quarter) * (60 / bpm)`
    pub fn step_to_seconds(&self, step: i64, tempo: &Tempo) -> f64 {
        (step as f64 / self.steps_per_quarter as f64) * tempo.beat_duration_seconds()
    }

    /// Nearest step for a time in seconds
    pub fn seconds_to_step(&self, seconds: f64, tempo: &Tempo) -> i64 {
        (seconds / self.step_duration_seconds(tempo)).round() as i64
    }

    /// True on quarter-note boundaries
    pub fn is_beat(&self, step: i64) -> bool {
        step.rem_euclid(self.steps_per_quarter as i64) == 0
    }

    /// True on the first step of a bar
    pub fn is_bar_start(&self, step: i64, time_signature: &TimeSignature) -> bool {
        let steps_per_bar = self.steps_per_bar(time_signature).max(1) as i64;
        step.rem_euclid(steps_per_bar) == 0
    }
}

impl Default for StepGrid {
    fn default() -> Self {
        Self::sixteenths()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_signature() {
        let ts = TimeSignature::four_four();
        assert_eq!(ts.numerator, 4);
        assert_eq!(ts.quarters_per_bar(), 4.0);
        assert_eq!(ts.to_string(), "4/4");
        assert_eq!(TimeSignature::new(6, 8).quarters_per_bar(), 3.0);
    }

    #[test]
    fn test_tempo() {
        let tempo = Tempo::new(120.0);
        assert_eq!(tempo.bpm(), 120.0);
        assert_eq!(tempo.beat_duration_seconds(), 0.5);
    }

    #[test]
    fn test_tempo_try_new() {
        assert!(Tempo::try_new(19.9).is_none());
        assert!(Tempo::try_new(1000.0).is_none());
        assert!(Tempo::try_new(f64::NAN).is_none());
        assert_eq!(Tempo::try_new(90.0).map(|t| t.bpm()), Some(90.0));
    }

    #[test]
    #[should_panic(expected = "BPM must be between 20 and 999")]
    fn test_invalid_tempo() {
        Tempo::new(5.0);
    }

    #[test]
    fn test_step_conversion() {
        let grid = StepGrid::sixteenths();
        let tempo = Tempo::new(120.0);

        assert_eq!(grid.step_duration_seconds(&tempo), 0.125);
        assert_eq!(grid.step_to_seconds(0, &tempo), 0.0);
        assert_eq!(grid.step_to_seconds(4, &tempo), 0.5);
        assert_eq!(grid.step_to_seconds(64, &tempo), 8.0);
        assert_eq!(grid.step_to_seconds(-32, &tempo), -4.0);
        assert_eq!(grid.seconds_to_step(0.51, &tempo), 4);
    }

    #[test]
    fn test_beats_and_bars() {
        let grid = StepGrid::sixteenths();
        let ts = TimeSignature::four_four();

        assert_eq!(grid.steps_per_bar(&ts), 16);
        assert!(grid.is_beat(0));
        assert!(grid.is_beat(-4));
        assert!(!grid.is_beat(-3));
        assert!(grid.is_bar_start(-32, &ts));
        assert!(grid.is_bar_start(16, &ts));
        assert!(!grid.is_bar_start(4, &ts));
        assert_eq!(grid.steps_per_bar(&TimeSignature::new(3, 4)), 12);
    }
}
