// Note clean-up applied when a capture is finalized

use crate::sequencer::note::TimedNote;

/// Parameters of the final note clean-up
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptimizeOptions {
    /// Same-pitch notes starting within this window (seconds) collapse into the first
    pub duplicate_window: f64,
    /// Notes shorter than this (seconds) are lengthened to it
    pub min_output_duration: f64,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self {
            duplicate_window: 0.05,
            min_output_duration: 0.1,
        }
    }
}

/// Order notes by start time, drop near-duplicate repeats and normalize times
pub fn optimize_notes(mut notes: Vec<TimedNote>, options: &OptimizeOptions) -> Vec<TimedNote> {
    notes.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

    let mut kept: Vec<TimedNote> = Vec::with_capacity(notes.len());
    for note in notes {
        let duplicate = kept
            .iter()
            .rev()
            .take_while(|k| note.start_time - k.start_time <= options.duplicate_window)
            .any(|k| k.pitch == note.pitch);

        if duplicate {
            log::debug!(
                "Dropping duplicate note {} at {:.3}s",
                note.note_name(),
                note.start_time
            );
            continue;
        }
        kept.push(note);
    }

    for note in &mut kept {
        note.start_time = note.start_time.max(0.0);
        note.end_time = note
            .end_time
            .max(note.start_time + options.min_output_duration);
    }

    kept
}
