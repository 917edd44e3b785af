//! Configuration schema definitions

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::synth::Patch;

/// Main configuration for keysynth
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SynthConfig {
    /// Audio output settings
    #[serde(default)]
    pub audio: AudioConfig,

    /// Master settings
    #[serde(default)]
    pub master: MasterConfig,

    /// Voice patch: envelope and partials
    #[serde(default)]
    pub voice: Patch,

    /// Keyboard input settings
    #[serde(default)]
    pub keyboard: KeyboardConfig,
}

impl SynthConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        // Validate audio settings
        if self.audio.sample_rate < 8000 || self.audio.sample_rate > 192000 {
            bail!("Sample rate must be between 8000 and 192000");
        }
        if self.audio.buffer_size < 64 || self.audio.buffer_size > 8192 {
            bail!("Buffer size must be between 64 and 8192");
        }

        // Validate master settings
        if !(0.0..=1.0).contains(&self.master.volume) {
            bail!("Master volume must be between 0.0 and 1.0");
        }

        // Validate voice patch
        let env = &self.voice.envelope;
        for (name, seconds) in [("Attack", env.attack), ("Decay", env.decay), ("Release", env.release)] {
            if !(seconds > 0.0 && seconds.is_finite()) {
                bail!("{} time must be a positive number of seconds", name);
            }
        }
        if !(0.0..=1.0).contains(&env.sustain) {
            bail!("Sustain level must be between 0.0 and 1.0");
        }
        if !(self.voice.guard >= 0.0 && self.voice.guard.is_finite()) {
            bail!("Guard interval must not be negative");
        }
        if self.voice.partials.is_empty() {
            bail!("Voice needs at least one partial");
        }
        for (idx, partial) in self.voice.partials.iter().enumerate() {
            if !(partial.ratio > 0.0 && partial.ratio.is_finite()) {
                bail!("Partial {} ratio must be positive", idx + 1);
            }
            if !(0.0..=1.0).contains(&partial.mix) {
                bail!("Partial {} mix must be between 0.0 and 1.0", idx + 1);
            }
            if !partial.detune.is_finite() {
                bail!("Partial {} detune must be a number of cents", idx + 1);
            }
        }

        // Validate keyboard settings
        if !(0..=127).contains(&self.keyboard.base_note) {
            bail!("Base note must be between 0 and 127");
        }
        if !(0.0..=1.0).contains(&self.keyboard.amplitude) {
            bail!("Keyboard amplitude must be between 0.0 and 1.0");
        }
        if !(self.keyboard.hold_timeout > 0.0 && self.keyboard.hold_timeout.is_finite()) {
            bail!("Hold timeout must be a positive number of seconds");
        }
        if !(self.keyboard.tuning > 0.0 && self.keyboard.tuning.is_finite()) {
            bail!("Tuning must be a positive frequency");
        }

        Ok(())
    }
}

/// Audio output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Sample rate in Hz (default: 44100)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Buffer size in frames (default: 512)
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Output device name (None = default device)
    #[serde(default)]
    pub device: Option<String>,
}

fn default_sample_rate() -> u32 { 44100 }
fn default_buffer_size() -> usize { 512 }

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            buffer_size: default_buffer_size(),
            device: None,
        }
    }
}

/// Master settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterConfig {
    /// Master volume 0.0-1.0 (default: 0.7)
    #[serde(default = "default_volume")]
    pub volume: f64,
}

fn default_volume() -> f64 { 0.7 }

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            volume: default_volume(),
        }
    }
}

/// Keyboard input settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyboardConfig {
    /// Note played by the first key of the lower row (default: 60 = C4)
    #[serde(default = "default_base_note")]
    pub base_note: i32,

    /// Peak amplitude of every key press 0.0-1.0 (default: 0.8)
    #[serde(default = "default_amplitude")]
    pub amplitude: f64,

    /// Seconds without a repeat before a key counts as released,
    /// for terminals that never report releases (default: 0.6)
    #[serde(default = "default_hold_timeout")]
    pub hold_timeout: f64,

    /// Frequency of A4 in Hz (default: 440)
    #[serde(default = "default_tuning")]
    pub tuning: f64,
}

fn default_base_note() -> i32 { 60 }
fn default_amplitude() -> f64 { 0.8 }
fn default_hold_timeout() -> f64 { 0.6 }
fn default_tuning() -> f64 { 440.0 }

impl Default for KeyboardConfig {
    fn default() -> Self {
        Self {
            base_note: default_base_note(),
            amplitude: default_amplitude(),
            hold_timeout: default_hold_timeout(),
            tuning: default_tuning(),
        }
    }
}
