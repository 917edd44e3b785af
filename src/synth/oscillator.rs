//! Phase-accumulating oscillators

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Waveform types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Waveform {
    Sine,
    Triangle,
    #[serde(alias = "sawtooth")]
    Saw,
    Square,
}

impl Waveform {
    /// Evaluate one cycle of the waveform at `phase` in [0, 1)
    pub fn at(self, phase: f64) -> f64 {
        match self {
            Waveform::Sine => (phase * 2.0 * PI).sin(),
            Waveform::Triangle => {
                if phase < 0.25 {
                    4.0 * phase
                } else if phase < 0.75 {
                    2.0 - 4.0 * phase
                } else {
                    4.0 * phase - 4.0
                }
            }
            Waveform::Saw => 2.0 * phase - 1.0,
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
        }
    }
}

/// A periodic oscillator
#[derive(Debug, Clone)]
pub struct Oscillator {
    waveform: Waveform,
    phase: f64,
    increment: f64,
    frequency: f64,
}

impl Oscillator {
    /// Create a new oscillator
    pub fn new(waveform: Waveform, frequency: f64, sample_rate: f64) -> Self {
        Self {
            waveform,
            phase: 0.0,
            increment: frequency / sample_rate,
            frequency,
        }
    }

    /// The waveform this oscillator generates
    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    /// The current frequency
    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    /// Generate the next sample
    pub fn generate(&mut self) -> f64 {
        let sample = self.waveform.at(self.phase);

        self.phase += self.increment;
        // fract keeps harmonics above Nyquist from walking out of range
        if self.phase >= 1.0 {
            self.phase = self.phase.fract();
        }

        sample
    }
}
