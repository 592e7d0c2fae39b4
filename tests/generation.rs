//! Accompaniment stage tests
//!
//! A scripted generator stands in for the model: it records what it was
//! asked for and returns canned candidates.

use rythmiq::config::GenerationConfig;
use rythmiq::generate::player::DRUM_CHANNEL;
use rythmiq::generate::{
    AccompanimentGenerator, AccompanimentStage, CandidateSelection, GenerationError,
    schedule_messages,
};
use rythmiq::sequencer::{NoteSequence, StepGrid, Tempo, TimedNote};

#[derive(Debug, Clone, PartialEq)]
struct DecodeRequest {
    latent: usize,
    temperature: f32,
    candidates: usize,
    steps: u32,
}

#[derive(Default)]
struct ScriptedGenerator {
    candidates: Vec<NoteSequence>,
    requests: Vec<DecodeRequest>,
    encoded: Vec<NoteSequence>,
}

impl AccompanimentGenerator for ScriptedGenerator {
    type Latent = usize;

    fn encode(&mut self, performance: &NoteSequence) -> Result<usize, GenerationError> {
        self.encoded.push(performance.clone());
        Ok(performance.len())
    }

    fn decode(
        &mut self,
        latent: &usize,
        temperature: f32,
        candidates: usize,
        steps: u32,
    ) -> Result<Vec<NoteSequence>, GenerationError> {
        self.requests.push(DecodeRequest {
            latent: *latent,
            temperature,
            candidates,
            steps,
        });
        Ok(self.candidates.iter().take(candidates).cloned().collect())
    }
}

struct BrokenModel;

impl AccompanimentGenerator for BrokenModel {
    type Latent = ();

    fn encode(&mut self, _performance: &NoteSequence) -> Result<(), GenerationError> {
        Err(GenerationError::Model("checkpoint not loaded".to_string()))
    }

    fn decode(
        &mut self,
        _latent: &(),
        _temperature: f32,
        _candidates: usize,
        _steps: u32,
    ) -> Result<Vec<NoteSequence>, GenerationError> {
        Ok(Vec::new())
    }
}

fn sequence(notes: Vec<TimedNote>) -> NoteSequence {
    let mut seq = NoteSequence::empty(Tempo::new(120.0), StepGrid::sixteenths());
    seq.notes = notes;
    seq.total_quantized_steps = 64;
    seq.total_time = 8.0;
    seq
}

fn performance() -> NoteSequence {
    let mut seq = sequence(vec![
        TimedNote::new(60, 0.0, 0.5, 100),
        TimedNote::new(64, 0.5, 1.0, 90),
        TimedNote::new(67, 1.0, 1.5, 80),
    ]);
    seq.tempos[0].qpm = 100.0;
    seq
}

fn drums(hits: &[(f64, u8)]) -> NoteSequence {
    let mut seq = sequence(
        hits.iter()
            .map(|&(t, vel)| TimedNote::new(36, t, t + 0.1, vel).as_drum())
            .collect(),
    );
    // Model output comes back at its own default tempo
    seq.tempos[0].qpm = 120.0;
    seq
}

fn stage_with(candidates: Vec<NoteSequence>) -> AccompanimentStage<ScriptedGenerator> {
    let generator = ScriptedGenerator {
        candidates,
        ..ScriptedGenerator::default()
    };
    AccompanimentStage::new(generator, GenerationConfig::default())
}

#[test]
fn test_default_request_parameters() {
    let mut stage = stage_with(vec![drums(&[(0.0, 100)])]);
    stage.generate(&performance()).unwrap();

    assert_eq!(
        stage.generator().requests,
        vec![DecodeRequest {
            latent: 3,
            temperature: 0.6,
            candidates: 2,
            steps: 64,
        }]
    );
    // Encoded input is quantized on the performance grid
    let encoded = &stage.generator().encoded[0];
    assert_eq!(encoded.notes[1].quantized_start_step, Some(3));
}

#[test]
fn test_densest_candidate_wins() {
    let sparse = drums(&[(0.0, 100)]);
    let dense = drums(&[(0.0, 100), (0.5, 100), (1.0, 100)]);
    let mut stage = stage_with(vec![sparse, dense]);

    let chosen = stage.generate(&performance()).unwrap();
    assert_eq!(chosen.len(), 3);

    // Accompaniment follows the performance tempo
    assert_eq!(chosen.qpm(), 100.0);
}

#[test]
fn test_selection_modes() {
    let sparse = drums(&[(0.0, 100)]);
    let dense = drums(&[(0.0, 100), (0.5, 100)]);

    let mut stage = stage_with(vec![dense.clone(), sparse.clone()]);
    stage.set_config(GenerationConfig {
        selection: CandidateSelection::FewestNotes,
        ..GenerationConfig::default()
    });
    assert_eq!(stage.generate(&performance()).unwrap().len(), 1);

    stage.set_config(GenerationConfig {
        selection: CandidateSelection::First,
        ..GenerationConfig::default()
    });
    assert_eq!(stage.generate(&performance()).unwrap().len(), 2);
}

#[test]
fn test_quiet_drums_muted() {
    let mut stage = stage_with(vec![drums(&[(0.0, 100), (0.5, 10), (1.0, 40)])]);
    stage.set_config(GenerationConfig {
        drum_velocity_floor: 30,
        ..GenerationConfig::default()
    });

    let chosen = stage.generate(&performance()).unwrap();
    let velocities: Vec<u8> = chosen.notes.iter().map(|n| n.velocity).collect();
    assert_eq!(velocities, vec![100, 40]);
}

#[test]
fn test_accompany_layers_performance() {
    let mut stage = stage_with(vec![drums(&[(0.25, 100), (0.75, 100)])]);

    let combined = stage.accompany(&performance()).unwrap();

    assert_eq!(combined.len(), 5);
    assert_eq!(combined.notes.iter().filter(|n| n.is_drum).count(), 2);
    let starts: Vec<f64> = combined.notes.iter().map(|n| n.start_time).collect();
    assert_eq!(starts, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
    assert_eq!(combined.total_time, 8.0);
}

#[test]
fn test_empty_performance_rejected() {
    let mut stage = stage_with(vec![drums(&[(0.0, 100)])]);

    let result = stage.generate(&sequence(Vec::new()));
    assert!(matches!(result, Err(GenerationError::EmptyInput)));

    // Notes entirely past the step budget count as empty
    let late = sequence(vec![TimedNote::new(60, 9.0, 9.5, 100)]);
    assert!(matches!(
        stage.generate(&late),
        Err(GenerationError::EmptyInput)
    ));
    assert!(stage.generator().requests.is_empty());
}

#[test]
fn test_no_candidates() {
    let mut stage = stage_with(Vec::new());
    assert!(matches!(
        stage.generate(&performance()),
        Err(GenerationError::NoCandidates)
    ));
}

#[test]
fn test_model_errors_propagate() {
    let mut stage = AccompanimentStage::new(BrokenModel, GenerationConfig::default());
    assert!(matches!(
        stage.accompany(&performance()),
        Err(GenerationError::Model(_))
    ));
}

#[test]
fn test_merge_keeps_bass_and_guitar_parts() {
    let stage = stage_with(Vec::new());
    let generated = drums(&[(0.0, 100)]);
    let performance = sequence(vec![
        TimedNote::new(60, 0.0, 0.5, 90),
        TimedNote::new(40, 0.0, 0.5, 90).with_program(33),
        TimedNote::new(52, 0.5, 1.0, 90).with_program(27),
        TimedNote::new(72, 0.5, 1.0, 90).with_program(41),
        TimedNote::new(74, 0.5, 1.0, 90).with_program(49),
    ]);

    let merged = stage.merge_generated(&generated, &performance);

    let programs: Vec<(u8, bool)> = merged
        .notes
        .iter()
        .map(|n| (n.program, n.is_drum))
        .collect();
    assert_eq!(programs, vec![(0, true), (27, false), (41, false)]);
}

#[test]
fn test_accompaniment_schedules_drums_on_channel_ten() {
    let mut stage = stage_with(vec![drums(&[(0.25, 100)])]);
    let combined = stage.accompany(&performance()).unwrap();

    let messages = schedule_messages(&combined);
    let drum_on = messages
        .iter()
        .find(|m| m.bytes[0] & 0xF0 == 0x90 && m.bytes[1] == 36)
        .expect("drum note-on");

    assert_eq!(drum_on.bytes[0] & 0x0F, DRUM_CHANNEL);
    assert_eq!(drum_on.time, 0.25);
    // One program change for the piano part
    assert_eq!(
        messages.iter().filter(|m| m.bytes[0] & 0xF0 == 0xC0).count(),
        1
    );
}
