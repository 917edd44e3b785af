//! Audio engine for keysynth
//!
//! Owns the render graph and the voice registry, and turns note events
//! into sound one frame at a time.

mod player;
mod recorder;
mod score;

pub use player::{default_device_name, list_output_devices, Player};
pub use recorder::{render_score, Recorder, RenderSummary};
pub use score::{load_score, Score, ScoreEvent};

use log::warn;

use crate::config::SynthConfig;
use crate::graph::{AudioHost, Graph};
use crate::synth::{mtof_with_tuning, NoteId, VoiceError, VoiceRegistry};

/// The main audio engine
pub struct Engine {
    graph: Graph,
    voices: VoiceRegistry,
    tuning: f64,
    sample_rate: f64,
}

impl Engine {
    /// Create a new engine with the given configuration
    pub fn new(config: &SynthConfig) -> Self {
        let sample_rate = config.audio.sample_rate as f64;
        let mut graph = Graph::new(sample_rate);
        graph.set_master_volume(config.master.volume);
        let voices = VoiceRegistry::new(graph.destination(), config.voice.clone());

        Self {
            graph,
            voices,
            tuning: config.keyboard.tuning,
            sample_rate,
        }
    }

    /// Get the sample rate
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Seconds rendered so far
    pub fn current_time(&self) -> f64 {
        self.graph.current_time()
    }

    /// Start a note at the configured tuning
    pub fn note_on(&mut self, note: NoteId, amplitude: f64) -> Result<(), VoiceError> {
        let frequency = mtof_with_tuning(note, self.tuning);
        self.voices.note_on(&mut self.graph, note, frequency, amplitude)
    }

    /// Release a note; its tail keeps sounding
    pub fn note_off(&mut self, note: NoteId) -> Result<(), VoiceError> {
        self.voices.note_off(&mut self.graph, note)
    }

    /// Release every held note
    pub fn all_notes_off(&mut self) -> Result<(), VoiceError> {
        self.voices.all_notes_off(&mut self.graph)
    }

    /// Silence everything at once, skipping release tails
    pub fn panic(&mut self) -> Result<(), VoiceError> {
        self.voices.shutdown(&mut self.graph)
    }

    /// Generate the next sample
    pub fn process(&mut self) -> f64 {
        let sample = self.graph.render_frame();
        if let Err(err) = self.voices.collect_finished(&mut self.graph) {
            warn!("failed to dispose finished voice: {}", err);
        }
        sample
    }

    /// Fill a buffer with samples
    pub fn fill_buffer(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.process() as f32;
        }
    }

    /// Held notes in ascending order
    pub fn held_notes(&self) -> Vec<NoteId> {
        self.voices.held_notes().collect()
    }

    /// Voices that still own graph nodes, held or releasing
    pub fn voice_count(&self) -> usize {
        self.voices.voice_count()
    }

    pub fn releasing_count(&self) -> usize {
        self.voices.releasing_count()
    }

    /// Graph nodes currently alive
    pub fn live_nodes(&self) -> u64 {
        self.graph.stats().live()
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if let Err(err) = self.voices.shutdown(&mut self.graph) {
            warn!("engine shutdown left errors: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> SynthConfig {
        let mut config = SynthConfig::default();
        config.audio.sample_rate = 8000;
        config
    }

    fn run(engine: &mut Engine, seconds: f64) -> f64 {
        let frames = (seconds * engine.sample_rate()) as usize;
        let mut peak = 0.0f64;
        for _ in 0..frames {
            peak = peak.max(engine.process().abs());
        }
        peak
    }

    #[test]
    fn test_engine_creation() {
        let engine = Engine::new(&test_config());

        assert_eq!(engine.sample_rate(), 8000.0);
        assert_eq!(engine.current_time(), 0.0);
        assert_eq!(engine.voice_count(), 0);
    }

    #[test]
    fn test_engine_silent_without_notes() {
        let mut engine = Engine::new(&test_config());
        assert_eq!(run(&mut engine, 0.1), 0.0);
    }

    #[test]
    fn test_engine_note_produces_audio() {
        let mut engine = Engine::new(&test_config());
        engine.note_on(69, 0.8).unwrap();

        let peak = run(&mut engine, 0.1);
        assert!(peak > 0.0, "Expected non-zero audio output");
        assert!(peak <= 0.8 * 2.0 * 0.7 + 1e-9);
        assert_eq!(engine.held_notes(), vec![69]);
    }

    #[test]
    fn test_engine_note_off_tail_then_cleanup() {
        let mut engine = Engine::new(&test_config());
        engine.note_on(60, 0.8).unwrap();
        run(&mut engine, 0.1);

        engine.note_off(60).unwrap();
        assert!(engine.held_notes().is_empty());
        assert_eq!(engine.releasing_count(), 1);

        // Release tail is still audible
        assert!(run(&mut engine, 0.1) > 0.0);

        run(&mut engine, 0.5);
        assert_eq!(engine.voice_count(), 0);
        assert_eq!(engine.live_nodes(), 0);
    }

    #[test]
    fn test_engine_panic_is_immediate() {
        let mut engine = Engine::new(&test_config());
        engine.note_on(60, 0.8).unwrap();
        engine.note_on(64, 0.8).unwrap();
        run(&mut engine, 0.05);

        engine.panic().unwrap();
        assert_eq!(engine.voice_count(), 0);
        assert_eq!(engine.live_nodes(), 0);
        assert_eq!(engine.process(), 0.0);
    }

    #[test]
    fn test_engine_all_notes_off() {
        let mut engine = Engine::new(&test_config());
        for note in [60, 64, 67] {
            engine.note_on(note, 0.5).unwrap();
        }
        engine.all_notes_off().unwrap();
        assert!(engine.held_notes().is_empty());
        assert_eq!(engine.releasing_count(), 3);
    }

    #[test]
    fn test_engine_rejects_bad_amplitude() {
        let mut engine = Engine::new(&test_config());
        assert!(engine.note_on(60, 1.5).is_err());
        assert_eq!(engine.voice_count(), 0);
    }

    #[test]
    fn test_engine_fill_buffer() {
        let mut engine = Engine::new(&test_config());
        engine.note_on(69, 0.8).unwrap();

        let mut buffer = vec![0.0f32; 512];
        engine.fill_buffer(&mut buffer);

        // Buffer should have non-zero samples
        let has_audio = buffer.iter().any(|&s| s.abs() > 0.0);
        assert!(has_audio);
        assert!((engine.current_time() - 512.0 / 8000.0).abs() < 1e-9);
    }
}
