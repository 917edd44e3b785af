//! Held-note bookkeeping
//!
//! The registry answers "is this note held down" and owns the voice for
//! each held note. On note-off the voice leaves the held map at once and
//! waits in the release pool until the host reports that its fundamental
//! has halted; only then is it disposed.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use log::{debug, warn};

use super::{NoteId, Patch, Voice, VoiceError};
use crate::graph::{AudioHost, NodeId};

/// At most one live voice per note
pub struct VoiceRegistry {
    patch: Arc<Patch>,
    output: NodeId,
    held: BTreeMap<NoteId, Voice>,
    /// Released voices keyed by their fundamental source
    releasing: HashMap<NodeId, Voice>,
}

impl VoiceRegistry {
    /// Create an empty registry whose voices play `patch` into `output`
    pub fn new(output: NodeId, patch: Patch) -> Self {
        Self {
            patch: Arc::new(patch),
            output,
            held: BTreeMap::new(),
            releasing: HashMap::new(),
        }
    }

    /// The patch new voices are built from
    pub fn patch(&self) -> &Patch {
        &self.patch
    }

    /// Start a voice for `note` unless one is already held
    ///
    /// A repeated note-on for a held note is ignored, so key repeat from
    /// the input layer cannot stack voices.
    pub fn note_on<H: AudioHost + ?Sized>(
        &mut self,
        host: &mut H,
        note: NoteId,
        frequency: f64,
        amplitude: f64,
    ) -> Result<(), VoiceError> {
        if self.held.contains_key(&note) {
            return Ok(());
        }

        let mut voice = Voice::new(frequency, amplitude, self.output, Arc::clone(&self.patch))?;
        voice.start(host)?;
        debug!("note {} on ({:.2} Hz)", note, frequency);
        self.held.insert(note, voice);
        Ok(())
    }

    /// Release the voice for `note`, if held
    ///
    /// The entry is removed before this returns; the voice's tail keeps
    /// sounding from the release pool.
    pub fn note_off<H: AudioHost + ?Sized>(&mut self, host: &mut H, note: NoteId) -> Result<(), VoiceError> {
        let Some(mut voice) = self.held.remove(&note) else {
            return Ok(());
        };

        // A failed stop disposes the voice itself
        voice.stop(host)?;
        debug!("note {} off", note);

        if let Some(fundamental) = voice.fundamental() {
            self.releasing.insert(fundamental, voice);
        }
        Ok(())
    }

    /// Release every held note
    pub fn all_notes_off<H: AudioHost + ?Sized>(&mut self, host: &mut H) -> Result<(), VoiceError> {
        let notes: Vec<NoteId> = self.held.keys().copied().collect();
        let mut first_error = None;
        for note in notes {
            if let Err(err) = self.note_off(host, note) {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Dispose voices whose fundamental the host reports as halted
    ///
    /// Returns how many voices were disposed. Halts that belong to no
    /// pooled voice are ignored.
    pub fn collect_finished<H: AudioHost + ?Sized>(&mut self, host: &mut H) -> Result<usize, VoiceError> {
        let mut disposed = 0;
        let mut first_error = None;

        for node in host.take_ended() {
            let Some(mut voice) = self.releasing.remove(&node) else {
                continue;
            };
            if let Err(err) = voice.dispose(host) {
                warn!("voice {:.2} Hz disposed with errors: {}", voice.frequency(), err);
                first_error.get_or_insert(err);
            }
            disposed += 1;
        }

        first_error.map_or(Ok(disposed), Err)
    }

    /// Dispose every voice immediately, held or releasing
    pub fn shutdown<H: AudioHost + ?Sized>(&mut self, host: &mut H) -> Result<(), VoiceError> {
        let mut first_error = None;
        let held = std::mem::take(&mut self.held).into_values();
        let releasing = std::mem::take(&mut self.releasing).into_values();

        for mut voice in held.chain(releasing) {
            if let Err(err) = voice.dispose(host) {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Whether `note` is currently held
    pub fn is_held(&self, note: NoteId) -> bool {
        self.held.contains_key(&note)
    }

    /// Held notes in ascending order
    pub fn held_notes(&self) -> impl Iterator<Item = NoteId> + '_ {
        self.held.keys().copied()
    }

    /// The voice for a held note
    pub fn voice(&self, note: NoteId) -> Option<&Voice> {
        self.held.get(&note)
    }

    pub fn held_count(&self) -> usize {
        self.held.len()
    }

    /// Voices released but not yet disposed
    pub fn releasing_count(&self) -> usize {
        self.releasing.len()
    }

    /// Voices still owning graph nodes
    pub fn voice_count(&self) -> usize {
        self.held.len() + self.releasing.len()
    }
}
