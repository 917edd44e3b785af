//! Voice patch: which partials a voice sums and how its envelope moves

use serde::{Deserialize, Serialize};

use super::{Adsr, Waveform};

/// One oscillator of a voice, relative to the note's frequency
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Partial {
    /// Frequency multiple of the note (1 = fundamental)
    pub ratio: f64,

    /// Waveform of this partial
    pub waveform: Waveform,

    /// Level before the envelope, 0.0-1.0 (default: 1.0)
    #[serde(default = "default_mix")]
    pub mix: f64,

    /// Detune in cents (default: 0)
    #[serde(default)]
    pub detune: f64,
}

fn default_mix() -> f64 { 1.0 }

impl Partial {
    /// Create an undetuned partial
    pub fn new(ratio: f64, waveform: Waveform, mix: f64) -> Self {
        Self {
            ratio,
            waveform,
            mix,
            detune: 0.0,
        }
    }

    /// Set the detune in cents (builder pattern)
    pub fn detuned(mut self, cents: f64) -> Self {
        self.detune = cents;
        self
    }

    /// Frequency of this partial for a note at `frequency`
    pub fn frequency_for(&self, frequency: f64) -> f64 {
        frequency * self.ratio * 2.0_f64.powf(self.detune / 1200.0)
    }

    /// Whether the partial feeds the envelope without an attenuation stage
    pub fn is_direct(&self) -> bool {
        self.mix == 1.0
    }
}

/// Everything a voice needs besides its note and level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    /// Envelope timing
    #[serde(default)]
    pub envelope: Adsr,

    /// Extra time after the release ramp before sources halt (default: 0.01)
    #[serde(default = "default_guard")]
    pub guard: f64,

    /// Partials; the first one is the fundamental
    #[serde(default = "default_partials")]
    pub partials: Vec<Partial>,
}

fn default_guard() -> f64 { 0.01 }

fn default_partials() -> Vec<Partial> {
    vec![
        Partial::new(1.0, Waveform::Sine, 1.0),
        Partial::new(2.0, Waveform::Saw, 0.5),
        Partial::new(3.0, Waveform::Saw, 0.5),
    ]
}

impl Default for Patch {
    fn default() -> Self {
        Self {
            envelope: Adsr::default(),
            guard: default_guard(),
            partials: default_partials(),
        }
    }
}

impl Patch {
    /// Number of graph nodes one voice of this patch owns
    pub fn node_count(&self) -> usize {
        let attenuators = self.partials.iter().filter(|p| !p.is_direct()).count();
        self.partials.len() + attenuators + 1
    }

    /// Seconds from note-off until the sources halt
    pub fn tail(&self) -> f64 {
        self.envelope.release + self.guard
    }
}
