// Note sequence - the artifact handed from capture to generation and playback
//
// JSON shape (camelCase):
// { notes: [...], tempos: [{ time, qpm }], quantizationInfo: { stepsPerQuarter },
//   totalQuantizedSteps, totalTime }

use crate::sequencer::note::TimedNote;
use crate::sequencer::timeline::{StepGrid, Tempo};
use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use serde::{Deserialize, Serialize};

const DATA_URL_PREFIX: &str = "data:application/json;base64,";

#[derive(Debug, thiserror::Error)]
pub enum SequenceError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Base64 error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Invalid UTF-8 in payload: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Not a JSON data URL: {0}")]
    InvalidDataUrl(String),
}

/// Tempo change at a given time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempoChange {
    pub time: f64,
    pub qpm: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuantizationInfo {
    pub steps_per_quarter: u32,
}

impl Default for QuantizationInfo {
    fn default() -> Self {
        Self {
            steps_per_quarter: StepGrid::sixteenths().steps_per_quarter(),
        }
    }
}

/// Ordered collection of timed notes plus tempo and quantization metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteSequence {
    pub notes: Vec<TimedNote>,
    #[serde(default)]
    pub tempos: Vec<TempoChange>,
    #[serde(default)]
    pub quantization_info: QuantizationInfo,
    #[serde(default)]
    pub total_quantized_steps: u32,
    #[serde(default)]
    pub total_time: f64,
}

impl NoteSequence {
    /// Sequence without notes at the given tempo
    pub fn empty(tempo: Tempo, grid: StepGrid) -> Self {
        Self {
            notes: Vec::new(),
            tempos: vec![TempoChange {
                time: 0.0,
                qpm: tempo.bpm(),
            }],
            quantization_info: QuantizationInfo {
                steps_per_quarter: grid.steps_per_quarter(),
            },
            total_quantized_steps: 0,
            total_time: 0.0,
        }
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Initial tempo in quarter notes per minute (120 when absent)
    pub fn qpm(&self) -> f64 {
        self.tempos.first().map(|t| t.qpm).unwrap_or(120.0)
    }

    /// Initial tempo, falling back to the default for out-of-range values
    pub fn tempo(&self) -> Tempo {
        Tempo::try_new(self.qpm()).unwrap_or_default()
    }

    pub fn grid(&self) -> StepGrid {
        StepGrid::new(self.quantization_info.steps_per_quarter.max(1))
    }

    /// Latest end time across all notes
    pub fn max_end_time(&self) -> f64 {
        self.notes
            .iter()
            .map(|n| n.end_time)
            .fold(0.0, f64::max)
    }

    /// Sort notes by start time (stable, so simultaneous notes keep their order)
    pub fn sort_by_start(&mut self) {
        self.notes
            .sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
    }

    /// Fill the quantized step fields from note times
    ///
    /// Uses the initial tempo. A quantized note always spans at least one step.
    pub fn quantize(&mut self) {
        let tempo = self.tempo();
        let grid = self.grid();

        for note in &mut self.notes {
            let start = grid.seconds_to_step(note.start_time, &tempo);
            let end = grid.seconds_to_step(note.end_time, &tempo).max(start + 1);
            note.quantized_start_step = Some(start);
            note.quantized_end_step = Some(end);
        }

        let last_step = self
            .notes
            .iter()
            .filter_map(|n| n.quantized_end_step)
            .max()
            .unwrap_or(0)
            .max(0) as u32;
        self.total_quantized_steps = self.total_quantized_steps.max(last_step);
    }

    /// Keep only melodic notes whose program lies in one of the inclusive ranges
    pub fn retain_programs(&mut self, ranges: &[(u8, u8)]) {
        self.notes.retain(|note| {
            !note.is_drum
                && ranges
                    .iter()
                    .any(|&(low, high)| (low..=high).contains(&note.program))
        });
    }

    /// Merge several sequences into one
    ///
    /// Tempo and quantization come from the first sequence; totals are the
    /// maximum over all inputs; notes are ordered by start time.
    /// Returns `None` when no sequence is given.
    pub fn combine<'a, I>(sequences: I) -> Option<NoteSequence>
    where
        I: IntoIterator<Item = &'a NoteSequence>,
    {
        let mut iter = sequences.into_iter();
        let first = iter.next()?;

        let mut combined = NoteSequence {
            notes: first.notes.clone(),
            tempos: if first.tempos.is_empty() {
                vec![TempoChange {
                    time: 0.0,
                    qpm: 120.0,
                }]
            } else {
                first.tempos.clone()
            },
            quantization_info: first.quantization_info,
            total_quantized_steps: first.total_quantized_steps,
            total_time: first.total_time,
        };

        for sequence in iter {
            combined.notes.extend_from_slice(&sequence.notes);
            combined.total_quantized_steps = combined
                .total_quantized_steps
                .max(sequence.total_quantized_steps);
            combined.total_time = combined.total_time.max(sequence.total_time);
        }

        combined.sort_by_start();
        Some(combined)
    }

    pub fn to_json(&self) -> Result<String, SequenceError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, SequenceError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, SequenceError> {
        Ok(serde_json::from_str(json)?)
    }

    /// `data:application/json;base64,...` form of the JSON document
    pub fn to_data_url(&self) -> Result<String, SequenceError> {
        let json = self.to_json()?;
        Ok(format!("{DATA_URL_PREFIX}{}", BASE64_STANDARD.encode(json)))
    }

    pub fn from_data_url(url: &str) -> Result<Self, SequenceError> {
        let Some(payload) = url.strip_prefix(DATA_URL_PREFIX) else {
            let head: String = url.chars().take(32).collect();
            return Err(SequenceError::InvalidDataUrl(head));
        };
        let bytes = BASE64_STANDARD.decode(payload.trim())?;
        Self::from_json(&String::from_utf8(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sequence_with(notes: Vec<TimedNote>) -> NoteSequence {
        let mut seq = NoteSequence::empty(Tempo::new(120.0), StepGrid::sixteenths());
        seq.notes = notes;
        seq
    }

    #[test]
    fn test_empty_sequence() {
        let seq = NoteSequence::empty(Tempo::new(90.0), StepGrid::sixteenths());

        assert!(seq.is_empty());
        assert_eq!(seq.qpm(), 90.0);
        assert_eq!(seq.quantization_info.steps_per_quarter, 4);
        assert_eq!(seq.max_end_time(), 0.0);
    }

    #[test]
    fn test_quantize() {
        let mut seq = sequence_with(vec![
            TimedNote::new(60, 0.0, 0.5, 100),
            TimedNote::new(62, 0.51, 0.52, 100),
        ]);
        seq.quantize();

        assert_eq!(seq.notes[0].quantized_start_step, Some(0));
        assert_eq!(seq.notes[0].quantized_end_step, Some(4));
        // Shorter than a step still spans one step
        assert_eq!(seq.notes[1].quantized_start_step, Some(4));
        assert_eq!(seq.notes[1].quantized_end_step, Some(5));
        assert_eq!(seq.total_quantized_steps, 5);
    }

    #[test]
    fn test_combine() {
        let mut drums = sequence_with(vec![
            TimedNote::new(36, 0.5, 0.6, 100).as_drum(),
            TimedNote::new(38, 0.0, 0.1, 100).as_drum(),
        ]);
        drums.total_time = 8.0;
        drums.total_quantized_steps = 64;

        let mut input = sequence_with(vec![TimedNote::new(60, 0.25, 0.5, 90)]);
        input.tempos[0].qpm = 100.0;
        input.total_time = 4.0;

        let combined = NoteSequence::combine([&drums, &input]).unwrap();

        assert_eq!(combined.len(), 3);
        assert_eq!(combined.qpm(), 120.0);
        assert_eq!(combined.total_time, 8.0);
        assert_eq!(combined.total_quantized_steps, 64);
        let starts: Vec<f64> = combined.notes.iter().map(|n| n.start_time).collect();
        assert_eq!(starts, vec![0.0, 0.25, 0.5]);

        assert!(NoteSequence::combine(std::iter::empty()).is_none());
    }

    #[test]
    fn test_retain_programs() {
        let mut seq = sequence_with(vec![
            TimedNote::new(60, 0.0, 0.5, 90).with_program(0),
            TimedNote::new(50, 0.0, 0.5, 90).with_program(26),
            TimedNote::new(55, 0.0, 0.5, 90).with_program(42),
            TimedNote::new(36, 0.0, 0.5, 90).with_program(26).as_drum(),
        ]);
        seq.retain_programs(&[(25, 31), (40, 48)]);

        let programs: Vec<u8> = seq.notes.iter().map(|n| n.program).collect();
        assert_eq!(programs, vec![26, 42]);
    }

    #[test]
    fn test_data_url() {
        let seq = sequence_with(vec![TimedNote::new(60, 0.0, 0.5, 100)]);
        let url = seq.to_data_url().unwrap();

        assert!(url.starts_with("data:application/json;base64,"));
        assert_eq!(NoteSequence::from_data_url(&url).unwrap(), seq);
        assert!(matches!(
            NoteSequence::from_data_url("data:text/plain,hello"),
            Err(SequenceError::InvalidDataUrl(_))
        ));
    }

    #[test]
    fn test_json_accepts_minimal_document() {
        let json = r#"{"notes":[{"pitch":36,"velocity":80,"startTime":0.5,"endTime":0.75,"isDrum":true}]}"#;
        let seq = NoteSequence::from_json(json).unwrap();

        assert_eq!(seq.len(), 1);
        assert!(seq.notes[0].is_drum);
        assert_eq!(seq.qpm(), 120.0);
        assert_eq!(seq.quantization_info.steps_per_quarter, 4);
    }
}
