//! Voices and everything they are made of
//!
//! Contains oscillators, envelope scheduling, the voice lifecycle and the
//! held-note registry.

mod envelope;
mod oscillator;
mod patch;
mod pitch;
mod registry;
mod voice;

pub use envelope::{Adsr, EnvelopeStage};
pub use oscillator::{Oscillator, Waveform};
pub use patch::{Partial, Patch};
pub use pitch::{is_black_key, mtof, mtof_with_tuning, note_name, NoteId, CONCERT_A};
pub use registry::VoiceRegistry;
pub use voice::{Voice, VoiceError, VoicePhase};
