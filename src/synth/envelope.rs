//! ADSR envelope scheduling
//!
//! The envelope is not computed sample by sample. Note-on writes the
//! attack and decay ramps onto a gain stage's automation timeline and
//! note-off replaces whatever is still pending with a release ramp; the
//! host evaluates the timeline while rendering.

use serde::{Deserialize, Serialize};

use crate::graph::ParamTimeline;

/// Envelope stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeStage {
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

/// ADSR timing, fixed for the lifetime of a voice
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Adsr {
    /// Attack time in seconds (default: 0.02)
    #[serde(default = "default_attack")]
    pub attack: f64,

    /// Decay time in seconds (default: 0.01)
    #[serde(default = "default_decay")]
    pub decay: f64,

    /// Sustain level as a ratio of the peak (default: 0.5)
    #[serde(default = "default_sustain")]
    pub sustain: f64,

    /// Release time in seconds (default: 0.5)
    #[serde(default = "default_release")]
    pub release: f64,
}

fn default_attack() -> f64 { 0.02 }
fn default_decay() -> f64 { 0.01 }
fn default_sustain() -> f64 { 0.5 }
fn default_release() -> f64 { 0.5 }

impl Default for Adsr {
    fn default() -> Self {
        Self {
            attack: default_attack(),
            decay: default_decay(),
            sustain: default_sustain(),
            release: default_release(),
        }
    }
}

impl Adsr {
    /// Create an envelope with the given timings
    pub fn new(attack: f64, decay: f64, sustain: f64, release: f64) -> Self {
        Self {
            attack,
            decay,
            sustain,
            release,
        }
    }

    /// Schedule the onset: silence at `now`, attack to `peak`, decay to sustain
    ///
    /// Nothing is scheduled for sustain itself; the decay target is held
    /// until the release replaces it.
    pub fn schedule_onset(&self, param: &mut ParamTimeline, now: f64, peak: f64) {
        let peak_at = now + self.attack;
        param.set_value_at_time(0.0, now);
        param.linear_ramp_to_value_at_time(peak, peak_at);
        param.linear_ramp_to_value_at_time(self.sustain * peak, peak_at + self.decay);
    }

    /// Replace pending automation with a release ramp starting at `now`
    ///
    /// `current` must be the value the parameter actually holds at `now`,
    /// which may be mid-ramp. Returns the time the envelope reaches zero.
    pub fn schedule_release(&self, param: &mut ParamTimeline, now: f64, current: f64) -> f64 {
        let silent_at = now + self.release;
        param.cancel_scheduled_values(now);
        // A ramp, not a step: the cut segment is rebuilt up to `now`
        param.linear_ramp_to_value_at_time(current, now);
        param.linear_ramp_to_value_at_time(0.0, silent_at);
        silent_at
    }

    /// Which stage a voice started at `onset` is in at `time`
    ///
    /// `released` is the note-off time, if any.
    pub fn stage_at(&self, onset: f64, released: Option<f64>, time: f64) -> EnvelopeStage {
        if time < onset {
            return EnvelopeStage::Idle;
        }
        if let Some(off) = released {
            if time >= off {
                return if time < off + self.release {
                    EnvelopeStage::Release
                } else {
                    EnvelopeStage::Idle
                };
            }
        }

        let elapsed = time - onset;
        if elapsed < self.attack {
            EnvelopeStage::Attack
        } else if elapsed < self.attack + self.decay {
            EnvelopeStage::Decay
        } else {
            EnvelopeStage::Sustain
        }
    }
}
