//! Keyboard input
//!
//! Maps terminal keys to notes and decides when a key counts as released.

mod keymap;
mod tracker;

pub use keymap::Keymap;
pub use tracker::{KeyTracker, NoteEvent};
