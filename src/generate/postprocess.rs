// Post-processing around the generator: input clean-up, candidate choice,
// drum muting

use crate::generate::CandidateSelection;
use crate::sequencer::sequence::NoteSequence;

/// Prepare a performance for encoding
///
/// Drops notes that end before they start or start after the step budget,
/// clips the rest to the budget and quantizes.
pub fn sanitize_input(performance: &NoteSequence, max_steps: u32) -> NoteSequence {
    let tempo = performance.tempo();
    let grid = performance.grid();
    let budget = grid.step_to_seconds(max_steps as i64, &tempo);

    let mut sequence = performance.clone();
    sequence.notes.retain(|n| {
        n.end_time.is_finite()
            && n.start_time.is_finite()
            && n.end_time > n.start_time
            && n.start_time >= 0.0
            && n.start_time < budget
            && n.pitch <= 127
    });
    for note in &mut sequence.notes {
        note.end_time = note.end_time.min(budget);
        note.quantized_start_step = None;
        note.quantized_end_step = None;
    }

    sequence.sort_by_start();
    sequence.total_quantized_steps = 0;
    sequence.quantize();
    sequence.total_quantized_steps = max_steps;
    sequence.total_time = budget;

    let dropped = performance.len() - sequence.len();
    if dropped > 0 {
        log::debug!("Dropped {dropped} unusable notes before encoding");
    }
    sequence
}

/// Remove drum hits quieter than `floor`
pub fn mute_quiet_drums(sequence: &mut NoteSequence, floor: u8) {
    sequence
        .notes
        .retain(|n| !(n.is_drum && n.velocity < floor));
}

/// Pick one candidate; ties keep the earliest
pub fn select_candidate(
    candidates: Vec<NoteSequence>,
    selection: CandidateSelection,
) -> Option<NoteSequence> {
    let mut best: Option<NoteSequence> = None;

    for candidate in candidates {
        let better = match (&best, selection) {
            (None, _) => true,
            (Some(_), CandidateSelection::First) => false,
            (Some(current), CandidateSelection::MostNotes) => candidate.len() > current.len(),
            (Some(current), CandidateSelection::FewestNotes) => candidate.len() < current.len(),
        };
        if better {
            best = Some(candidate);
        }
    }

    best
}
