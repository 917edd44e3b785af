//! Note numbering and tuning

/// Integer note identifier, MIDI numbering (69 = A4)
pub type NoteId = i32;

/// Standard concert pitch for A4
pub const CONCERT_A: f64 = 440.0;

const NOTE_NAMES: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];

/// Convert a note to a frequency in Hz, 12-TET with A4 = 440 Hz
pub fn mtof(note: NoteId) -> f64 {
    mtof_with_tuning(note, CONCERT_A)
}

/// Convert a note to a frequency in Hz with a custom A4
pub fn mtof_with_tuning(note: NoteId, tuning: f64) -> f64 {
    tuning * 2.0_f64.powf((note as f64 - 69.0) / 12.0)
}

/// Scientific pitch name, e.g. `C4` for 60
pub fn note_name(note: NoteId) -> String {
    let octave = note.div_euclid(12) - 1;
    format!("{}{}", NOTE_NAMES[note.rem_euclid(12) as usize], octave)
}

/// Whether the note falls on a black key
pub fn is_black_key(note: NoteId) -> bool {
    matches!(note.rem_euclid(12), 1 | 3 | 6 | 8 | 10)
}
