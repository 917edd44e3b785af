//! keysynth - Polyphonic terminal synthesizer
//!
//! Each key press becomes a voice: a handful of oscillators summed into one
//! envelope stage. Releasing the key lets the envelope decay while the next
//! press of the same key starts a fresh voice, and each voice frees its graph
//! nodes once its tail has been rendered.

pub mod config;
pub mod engine;
pub mod graph;
pub mod input;
pub mod synth;
pub mod ui;

pub use config::SynthConfig;
pub use engine::Engine;
