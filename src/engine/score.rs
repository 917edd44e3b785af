//! Note scores for offline rendering
//!
//! A score is a flat list of timed notes, read from YAML or JSON.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::synth::NoteId;

/// A single timed note
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreEvent {
    /// Note number (69 = A4)
    pub note: NoteId,

    /// Onset in seconds from the start of the render
    pub at: f64,

    /// Seconds between note-on and note-off
    pub duration: f64,

    /// Peak amplitude 0.0-1.0 (default: 0.8)
    #[serde(default = "default_amplitude")]
    pub amplitude: f64,
}

fn default_amplitude() -> f64 { 0.8 }

impl ScoreEvent {
    pub fn new(note: NoteId, at: f64, duration: f64) -> Self {
        Self {
            note,
            at,
            duration,
            amplitude: default_amplitude(),
        }
    }

    /// When the note is released
    pub fn end(&self) -> f64 {
        self.at + self.duration
    }
}

/// A list of timed notes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Score {
    #[serde(default)]
    pub events: Vec<ScoreEvent>,
}

impl Score {
    pub fn new(events: Vec<ScoreEvent>) -> Self {
        Self { events }
    }

    /// Built-in score: a C major arpeggio, then the chord again with
    /// overlapping notes so release tails cross new onsets
    pub fn demo() -> Self {
        let mut events = Vec::new();
        for (i, note) in [60, 64, 67, 72].into_iter().enumerate() {
            events.push(ScoreEvent::new(note, i as f64 * 0.25, 0.2));
        }
        for (i, note) in [60, 64, 67].into_iter().enumerate() {
            events.push(ScoreEvent::new(note, 1.25 + i as f64 * 0.1, 0.8));
        }
        // Same note struck again while its first release is still sounding
        events.push(ScoreEvent::new(72, 1.5, 0.1));
        events.push(ScoreEvent::new(72, 1.7, 0.4));
        Self { events }
    }

    /// Validate the score
    pub fn validate(&self) -> Result<()> {
        for (idx, event) in self.events.iter().enumerate() {
            if !(0..=127).contains(&event.note) {
                bail!("Event {}: note must be between 0 and 127", idx + 1);
            }
            if !(event.at >= 0.0 && event.at.is_finite()) {
                bail!("Event {}: start time must not be negative", idx + 1);
            }
            if !(event.duration > 0.0 && event.duration.is_finite()) {
                bail!("Event {}: duration must be positive", idx + 1);
            }
            if !(0.0..=1.0).contains(&event.amplitude) {
                bail!("Event {}: amplitude must be between 0.0 and 1.0", idx + 1);
            }
        }
        Ok(())
    }

    /// Time of the last note-off
    pub fn end(&self) -> f64 {
        self.events.iter().map(ScoreEvent::end).fold(0.0, f64::max)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Load a score, picking the format from the file extension
///
/// `.json` is read as JSON; anything else as YAML.
pub fn load_score(path: &Path) -> Result<Score> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read score file {:?}", path))?;

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let score: Score = if is_json {
        serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse JSON score {:?}", path))?
    } else {
        serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse YAML score {:?}", path))?
    };

    score.validate()?;
    Ok(score)
}
