//! Key hold tracking
//!
//! Most terminals only report presses, and report a held key as a stream
//! of auto-repeated presses. The tracker treats a key as held while those
//! repeats keep arriving and lets it go once they stop for longer than the
//! hold timeout. Terminals that do report releases end notes directly.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::synth::NoteId;

/// A note change produced by key activity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteEvent {
    On(NoteId),
    Off(NoteId),
}

#[derive(Debug, Clone, Copy)]
struct HeldKey {
    note: NoteId,
    deadline: Instant,
}

/// Turns key presses, repeats and releases into note events
#[derive(Debug)]
pub struct KeyTracker {
    hold_timeout: Duration,
    reports_release: bool,
    held: BTreeMap<char, HeldKey>,
}

impl KeyTracker {
    pub fn new(hold_timeout: Duration) -> Self {
        Self {
            hold_timeout,
            reports_release: false,
            held: BTreeMap::new(),
        }
    }

    /// Whether key releases arrive as events
    ///
    /// When they do, held keys never time out.
    pub fn set_reports_release(&mut self, reports: bool) {
        self.reports_release = reports;
    }

    pub fn reports_release(&self) -> bool {
        self.reports_release
    }

    /// A key went down or auto-repeated
    ///
    /// The note is fixed at first press; a repeat after an octave change
    /// keeps the original note.
    pub fn press(&mut self, key: char, note: NoteId, now: Instant) -> Option<NoteEvent> {
        let key = key.to_ascii_lowercase();
        let deadline = now + self.hold_timeout;
        if let Some(held) = self.held.get_mut(&key) {
            held.deadline = deadline;
            return None;
        }
        // Another key may already be playing this note
        let sounding = self.held.values().any(|h| h.note == note);
        self.held.insert(key, HeldKey { note, deadline });
        (!sounding).then_some(NoteEvent::On(note))
    }

    /// A key went up
    pub fn release(&mut self, key: char) -> Option<NoteEvent> {
        let held = self.held.remove(&key.to_ascii_lowercase())?;
        self.note_off_if_unheld(held.note)
    }

    /// Release keys whose repeats stopped arriving
    pub fn expire(&mut self, now: Instant) -> Vec<NoteEvent> {
        if self.reports_release {
            return Vec::new();
        }

        let expired: Vec<char> = self
            .held
            .iter()
            .filter(|(_, held)| held.deadline <= now)
            .map(|(&key, _)| key)
            .collect();

        expired.into_iter().filter_map(|key| self.release(key)).collect()
    }

    /// Forget every held key, returning note-offs for them
    pub fn release_all(&mut self) -> Vec<NoteEvent> {
        let mut notes: Vec<NoteId> = self.held.values().map(|h| h.note).collect();
        notes.sort_unstable();
        notes.dedup();
        self.held.clear();
        notes.into_iter().map(NoteEvent::Off).collect()
    }

    pub fn is_held(&self, key: char) -> bool {
        self.held.contains_key(&key.to_ascii_lowercase())
    }

    pub fn held_count(&self) -> usize {
        self.held.len()
    }

    fn note_off_if_unheld(&self, note: NoteId) -> Option<NoteEvent> {
        let still_held = self.held.values().any(|h| h.note == note);
        (!still_held).then_some(NoteEvent::Off(note))
    }
}
