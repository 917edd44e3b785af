//! Computer keyboard to note mapping
//!
//! Two rows laid out like a piano: the bottom letter row plays the octave
//! starting at the base note, the top row the octave above it. Keys on
//! the row in between are the black keys.

use crate::synth::NoteId;

/// Lower row, one octave from the base note
const LOWER_ROW: &[char] = &['z', 's', 'x', 'd', 'c', 'v', 'g', 'b', 'h', 'n', 'j', 'm', ','];

/// Upper row, starting one octave above the base note
const UPPER_ROW: &[char] = &[
    'q', '2', 'w', '3', 'e', 'r', '5', 't', '6', 'y', '7', 'u', 'i', '9', 'o', '0', 'p',
];

const LOWEST_NOTE: NoteId = 0;
const HIGHEST_NOTE: NoteId = 127;

/// Maps key characters to notes, with an octave shift
#[derive(Debug, Clone)]
pub struct Keymap {
    base_note: NoteId,
    octave: i32,
}

impl Keymap {
    pub fn new(base_note: NoteId) -> Self {
        Self {
            base_note: base_note.clamp(LOWEST_NOTE, HIGHEST_NOTE),
            octave: 0,
        }
    }

    /// Semitones above the base note for a key, if it is mapped
    pub fn offset(key: char) -> Option<i32> {
        let key = key.to_ascii_lowercase();
        if let Some(pos) = LOWER_ROW.iter().position(|&k| k == key) {
            return Some(pos as i32);
        }
        UPPER_ROW.iter().position(|&k| k == key).map(|pos| pos as i32 + 12)
    }

    /// Note for a key at the current octave
    ///
    /// Keys that would land outside 0..=127 play nothing.
    pub fn note_for(&self, key: char) -> Option<NoteId> {
        let note = self.root() + Self::offset(key)?;
        (LOWEST_NOTE..=HIGHEST_NOTE).contains(&note).then_some(note)
    }

    /// Note played by the first lower-row key
    pub fn root(&self) -> NoteId {
        self.base_note + self.octave * 12
    }

    pub fn octave(&self) -> i32 {
        self.octave
    }

    /// Shift up an octave, unless the root would leave the note range
    pub fn octave_up(&mut self) -> bool {
        if self.root() + 12 > HIGHEST_NOTE {
            return false;
        }
        self.octave += 1;
        true
    }

    /// Shift down an octave, unless the root would leave the note range
    pub fn octave_down(&mut self) -> bool {
        if self.root() - 12 < LOWEST_NOTE {
            return false;
        }
        self.octave -= 1;
        true
    }

    /// Lowest and highest note currently reachable
    pub fn range(&self) -> (NoteId, NoteId) {
        let top = self.root() + 12 + UPPER_ROW.len() as i32 - 1;
        (self.root(), top.min(HIGHEST_NOTE))
    }
}

impl Default for Keymap {
    fn default() -> Self {
        Self::new(60)
    }
}
