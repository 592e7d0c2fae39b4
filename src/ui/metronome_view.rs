// Metronome and note activity views
//
// The metronome band is 20px high across the full width: pre-count steps on
// the left, recording steps on the right, one tick per step and a playhead
// at the current step. Below it, held and recorded notes are drawn as
// squares placed by pitch (88 keys from A0) and velocity.

use crate::capture::session::{CaptureSnapshot, NoteActivity};
use crate::ui::canvas::{Canvas, Color, Font};

pub const BAND_HEIGHT: f32 = 20.0;

const PRE_COUNT_REGION: Color = Color::rgba(139, 0, 0, 0.2);
const RECORDING_REGION: Color = Color::rgba(43, 175, 144, 0.2);
const PRE_COUNT_BEAT: Color = Color::rgb(0xFF, 0x44, 0x44);
const PRE_COUNT_STEP: Color = Color::rgba(255, 68, 68, 0.3);
const RECORDING_BEAT: Color = Color::rgb(0xF1, 0xA5, 0x12);
const RECORDING_STEP: Color = Color::rgba(241, 165, 18, 0.3);

const ACTIVE_NOTE: Color = Color::rgb(0x2B, 0xAF, 0x90);
const RECORDED_NOTE: Color = Color::rgb(0xA1, 0xD4, 0xB1);
const ACTIVE_NOTE_SIZE: f32 = 15.0;
const RECORDED_NOTE_SIZE: f32 = 10.0;

const LOWEST_KEY: f32 = 21.0; // A0
const KEY_COUNT: f32 = 88.0;

/// Number shown during the count-in: beats left before recording, from the
/// highest down to 1
pub fn count_in_number(step: i64, steps_per_quarter: u32) -> Option<i64> {
    if step >= 0 {
        return None;
    }
    let spq = steps_per_quarter.max(1) as i64;
    Some((-step - 1).div_euclid(spq) + 1)
}

/// Draw the metronome band for `snapshot`
pub fn draw_metronome(canvas: &mut impl Canvas, snapshot: &CaptureSnapshot) {
    let width = canvas.width();
    canvas.clear_rect(0.0, 0.0, width, BAND_HEIGHT);

    let pre_count = snapshot.pre_count_steps as i64;
    let total_steps = (snapshot.pre_count_steps + snapshot.recording_steps).max(1);
    let step_width = width / total_steps as f32;
    let pre_count_width = pre_count as f32 * step_width;
    let spq = snapshot.steps_per_quarter.max(1) as i64;

    canvas.fill_rect(0.0, 0.0, pre_count_width, BAND_HEIGHT, PRE_COUNT_REGION);
    canvas.fill_rect(
        pre_count_width,
        0.0,
        width - pre_count_width,
        BAND_HEIGHT,
        RECORDING_REGION,
    );

    for step in -pre_count..snapshot.recording_steps as i64 {
        let x = (step + pre_count) as f32 * step_width;
        let is_beat = step.rem_euclid(spq) == 0;
        let color = match (step < 0, is_beat) {
            (true, true) => PRE_COUNT_BEAT,
            (true, false) => PRE_COUNT_STEP,
            (false, true) => RECORDING_BEAT,
            (false, false) => RECORDING_STEP,
        };
        let height = if is_beat { BAND_HEIGHT } else { BAND_HEIGHT / 2.0 };
        canvas.fill_rect(x, 0.0, 2.0, height, color);
    }

    let playhead_x = (snapshot.step + pre_count) as f32 * step_width;
    if (0.0..=width).contains(&playhead_x) {
        canvas.fill_rect(playhead_x - 1.0, 0.0, 4.0, BAND_HEIGHT, Color::WHITE);

        if let Some(count) = count_in_number(snapshot.step, snapshot.steps_per_quarter) {
            canvas.fill_text(
                &count.to_string(),
                width / 2.0,
                16.0,
                Font::bold(20.0),
                Color::WHITE,
            );
        }
    }

    if snapshot.in_pre_count() {
        canvas.fill_text("Count In", 10.0, 14.0, Font::regular(12.0), Color::WHITE);
    } else {
        canvas.fill_text(
            "Recording",
            pre_count_width + 10.0,
            14.0,
            Font::regular(12.0),
            Color::WHITE,
        );
    }
}

/// Top-left corner of a note square
pub fn note_position(note: &NoteActivity, width: f32, height: f32) -> (f32, f32) {
    let area = height - BAND_HEIGHT;
    let x = (note.pitch as f32 - LOWEST_KEY) * (width / KEY_COUNT);
    let y = BAND_HEIGHT + (area - (note.velocity as f32 / 127.0) * area);
    (x, y)
}

/// Draw held notes and recorded notes below the metronome band
pub fn draw_note_activity(canvas: &mut impl Canvas, snapshot: &CaptureSnapshot) {
    let (width, height) = (canvas.width(), canvas.height());
    canvas.fill_rect(0.0, BAND_HEIGHT, width, height - BAND_HEIGHT, Color::BLACK);

    for note in &snapshot.active {
        let (x, y) = note_position(note, width, height);
        canvas.fill_rect(x, y, ACTIVE_NOTE_SIZE, ACTIVE_NOTE_SIZE, ACTIVE_NOTE);
    }
    for note in &snapshot.recorded {
        let (x, y) = note_position(note, width, height);
        canvas.fill_rect(x, y, RECORDED_NOTE_SIZE, RECORDED_NOTE_SIZE, RECORDED_NOTE);
    }
}
