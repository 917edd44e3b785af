//! WAV file recorder
//!
//! Writes engine output to disk, either sample by sample or by rendering
//! a whole score offline.

use anyhow::{Context, Result};
use hound::{SampleFormat, WavSpec, WavWriter};
use log::{debug, info};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{Engine, Score};
use crate::synth::NoteId;

/// WAV file recorder
pub struct Recorder {
    writer: WavWriter<BufWriter<File>>,
    sample_rate: u32,
    samples_written: u64,
}

impl Recorder {
    /// Create a mono 32-bit float WAV file at `path`
    pub fn new(path: &Path, sample_rate: u32) -> Result<Self> {
        let spec = WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };

        let writer = WavWriter::create(path, spec)
            .with_context(|| format!("failed to create WAV file: {:?}", path))?;

        Ok(Self {
            writer,
            sample_rate,
            samples_written: 0,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn samples_written(&self) -> u64 {
        self.samples_written
    }

    /// Get the duration recorded in seconds
    pub fn duration_secs(&self) -> f64 {
        self.samples_written as f64 / self.sample_rate as f64
    }

    /// Write a single sample
    pub fn write_sample(&mut self, sample: f32) -> Result<()> {
        self.writer
            .write_sample(sample)
            .context("failed to write sample")?;
        self.samples_written += 1;
        Ok(())
    }

    /// Write a buffer of samples
    pub fn write_buffer(&mut self, buffer: &[f32]) -> Result<()> {
        for &sample in buffer {
            self.write_sample(sample)?;
        }
        Ok(())
    }

    /// Finalize the WAV file
    ///
    /// This must be called to properly close the file and write the header.
    pub fn finalize(self) -> Result<()> {
        self.writer.finalize().context("failed to finalize WAV file")
    }
}

/// What an offline render produced
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSummary {
    pub frames: u64,
    pub duration_secs: f64,
    pub notes: usize,
    /// Stopped early by the cancel flag
    pub cancelled: bool,
}

#[derive(Debug, Clone, Copy)]
enum Action {
    Off(NoteId),
    On(NoteId, f64),
}

/// Render `score` through `engine` into `recorder`
///
/// Rendering continues past the last note-off until every voice has been
/// disposed, so release tails are complete. Setting `cancel` stops at the
/// next buffer boundary; the file is finalized either way.
pub fn render_score(
    engine: &mut Engine,
    score: &Score,
    mut recorder: Recorder,
    cancel: &AtomicBool,
) -> Result<RenderSummary> {
    let sample_rate = engine.sample_rate();
    let to_frame = |seconds: f64| (seconds * sample_rate).round() as u64;

    // Offs sort before ons on the same frame so a restruck note retriggers
    let mut actions: Vec<(u64, Action)> = Vec::with_capacity(score.events.len() * 2);
    for event in &score.events {
        // At least one frame after the onset, or the off would sort first
        let on_frame = to_frame(event.at);
        actions.push((on_frame, Action::On(event.note, event.amplitude)));
        actions.push((to_frame(event.end()).max(on_frame + 1), Action::Off(event.note)));
    }
    actions.sort_by_key(|(frame, action)| (*frame, matches!(action, Action::On(..))));

    info!(
        "rendering {} notes ({:.2}s before tails) at {} Hz",
        score.events.len(),
        score.end(),
        sample_rate
    );

    let mut buffer = vec![0.0f32; 512];
    let mut next = 0;
    let mut frame: u64 = 0;
    let mut cancelled = false;

    while next < actions.len() || engine.voice_count() > 0 {
        if cancel.load(Ordering::SeqCst) {
            cancelled = true;
            break;
        }

        for sample in buffer.iter_mut() {
            while let Some(&(at, action)) = actions.get(next) {
                if at > frame {
                    break;
                }
                match action {
                    Action::On(note, amplitude) => engine
                        .note_on(note, amplitude)
                        .with_context(|| format!("note {} failed to start", note))?,
                    Action::Off(note) => engine
                        .note_off(note)
                        .with_context(|| format!("note {} failed to stop", note))?,
                }
                next += 1;
            }
            *sample = engine.process() as f32;
            frame += 1;
        }
        recorder.write_buffer(&buffer)?;
    }

    if cancelled {
        debug!("render cancelled at frame {}", frame);
        engine.panic().context("failed to silence voices")?;
    }

    let summary = RenderSummary {
        frames: recorder.samples_written(),
        duration_secs: recorder.duration_secs(),
        notes: score.events.len(),
        cancelled,
    };
    recorder.finalize()?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SynthConfig;
    use crate::engine::ScoreEvent;
    use tempfile::NamedTempFile;

    fn test_engine() -> Engine {
        let mut config = SynthConfig::default();
        config.audio.sample_rate = 8000;
        Engine::new(&config)
    }

    #[test]
    fn test_recorder_creation() {
        let file = NamedTempFile::new().unwrap();
        let recorder = Recorder::new(file.path(), 44100).unwrap();

        assert_eq!(recorder.sample_rate(), 44100);
        assert_eq!(recorder.samples_written(), 0);
        assert_eq!(recorder.duration_secs(), 0.0);
    }

    #[test]
    fn test_recorder_write_buffer() {
        let file = NamedTempFile::new().unwrap();
        let mut recorder = Recorder::new(file.path(), 8000).unwrap();

        recorder.write_sample(0.5).unwrap();
        recorder.write_buffer(&[0.1, 0.2, 0.3, 0.4]).unwrap();

        assert_eq!(recorder.samples_written(), 5);
    }

    #[test]
    fn test_render_score_includes_tail() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_path_buf();
        let mut engine = test_engine();
        let score = Score::new(vec![ScoreEvent::new(69, 0.0, 0.25)]);

        let recorder = Recorder::new(&path, 8000).unwrap();
        let summary = render_score(&mut engine, &score, recorder, &AtomicBool::new(false)).unwrap();

        assert!(!summary.cancelled);
        assert_eq!(summary.notes, 1);
        // note (0.25) + release (0.5) + guard (0.01), rounded up to a whole buffer
        assert!(summary.duration_secs >= 0.76);
        assert!(summary.duration_secs < 0.76 + 512.0 / 8000.0 + 1e-9);
        assert_eq!(engine.voice_count(), 0);
        assert_eq!(engine.live_nodes(), 0);

        let reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 8000);
        assert_eq!(spec.sample_format, SampleFormat::Float);

        let samples: Vec<f32> = reader.into_samples().map(|s| s.unwrap()).collect();
        assert_eq!(samples.len() as u64, summary.frames);
        assert!(samples.iter().any(|s| s.abs() > 0.0));
        // Everything after the halt is silence
        assert_eq!(*samples.last().unwrap(), 0.0);
    }

    #[test]
    fn test_render_demo_score_cleans_up() {
        let file = NamedTempFile::new().unwrap();
        let mut engine = test_engine();

        let recorder = Recorder::new(file.path(), 8000).unwrap();
        let summary = render_score(&mut engine, &Score::demo(), recorder, &AtomicBool::new(false)).unwrap();

        assert!(summary.duration_secs > Score::demo().end());
        assert_eq!(engine.voice_count(), 0);
        assert_eq!(engine.live_nodes(), 0);
    }

    #[test]
    fn test_render_cancelled_still_finalizes() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_path_buf();
        let mut engine = test_engine();

        let recorder = Recorder::new(&path, 8000).unwrap();
        let summary = render_score(&mut engine, &Score::demo(), recorder, &AtomicBool::new(true)).unwrap();

        assert!(summary.cancelled);
        assert_eq!(summary.frames, 0);
        assert_eq!(engine.voice_count(), 0);

        // Header was written, file reads back
        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.len(), 0);
    }

    #[test]
    fn test_render_sub_frame_note_terminates() {
        let file = NamedTempFile::new().unwrap();
        let mut engine = test_engine();
        // Shorter than half a sample at 8 kHz
        let score = Score::new(vec![ScoreEvent::new(60, 0.0, 0.00005)]);

        let recorder = Recorder::new(file.path(), 8000).unwrap();
        let summary = render_score(&mut engine, &score, recorder, &AtomicBool::new(false)).unwrap();

        assert!(!summary.cancelled);
        // One frame of note, then release + guard
        assert!(summary.duration_secs < 0.51 + 512.0 / 8000.0 + 1e-9);
        assert_eq!(engine.voice_count(), 0);
        assert_eq!(engine.live_nodes(), 0);
    }

    #[test]
    fn test_render_empty_score() {
        let file = NamedTempFile::new().unwrap();
        let mut engine = test_engine();

        let recorder = Recorder::new(file.path(), 8000).unwrap();
        let summary = render_score(&mut engine, &Score::default(), recorder, &AtomicBool::new(false)).unwrap();

        assert_eq!(summary.frames, 0);
        assert_eq!(summary.notes, 0);
    }
}
