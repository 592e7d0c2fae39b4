// Accompaniment stage - performance in, performance plus accompaniment out

use crate::config::GenerationConfig;
use crate::generate::postprocess::{mute_quiet_drums, sanitize_input, select_candidate};
use crate::generate::{AccompanimentGenerator, GenerationError};
use crate::sequencer::sequence::NoteSequence;

pub struct AccompanimentStage<G: AccompanimentGenerator> {
    generator: G,
    config: GenerationConfig,
}

impl<G: AccompanimentGenerator> AccompanimentStage<G> {
    pub fn new(generator: G, config: GenerationConfig) -> Self {
        Self { generator, config }
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: GenerationConfig) {
        self.config = config;
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Decode candidates and keep the one chosen by the configured selection
    pub fn generate(&mut self, performance: &NoteSequence) -> Result<NoteSequence, GenerationError> {
        let input = sanitize_input(performance, self.config.output_steps);
        if input.is_empty() {
            return Err(GenerationError::EmptyInput);
        }

        let latent = self.generator.encode(&input)?;
        let candidates = self.generator.decode(
            &latent,
            self.config.temperature,
            self.config.candidates.max(1),
            self.config.output_steps,
        )?;
        log::info!(
            "Decoded {} candidates at temperature {}",
            candidates.len(),
            self.config.temperature
        );

        let mut chosen =
            select_candidate(candidates, self.config.selection).ok_or(GenerationError::NoCandidates)?;
        mute_quiet_drums(&mut chosen, self.config.drum_velocity_floor);

        // Generated notes follow the performance's tempo and grid
        chosen.tempos = input.tempos.clone();
        chosen.quantization_info = input.quantization_info;
        Ok(chosen)
    }

    /// Generate and layer the accompaniment over the whole performance
    pub fn accompany(&mut self, performance: &NoteSequence) -> Result<NoteSequence, GenerationError> {
        let accompaniment = self.generate(performance)?;
        NoteSequence::combine([&accompaniment, performance]).ok_or(GenerationError::NoCandidates)
    }

    /// Layer a generated sequence with only the performance parts whose
    /// program is in `kept_programs`
    pub fn merge_generated(
        &self,
        generated: &NoteSequence,
        performance: &NoteSequence,
    ) -> NoteSequence {
        let mut kept = performance.clone();
        kept.retain_programs(&self.config.kept_programs);
        let mut merged = generated.clone();
        merged.notes.extend(kept.notes);
        merged.total_time = merged.total_time.max(kept.total_time);
        merged.total_quantized_steps = merged
            .total_quantized_steps
            .max(kept.total_quantized_steps);
        merged.sort_by_start();
        merged
    }
}
