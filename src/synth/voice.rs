//! A single sounding note
//!
//! A voice builds its partials, attenuators and envelope stage on an
//! [`AudioHost`], schedules the envelope against the host clock and
//! tears everything down once the host reports that its fundamental has
//! halted. Nothing here blocks or counts samples.

use std::fmt;
use std::sync::Arc;

use log::{debug, warn};
use thiserror::Error;

use super::{EnvelopeStage, Patch};
use crate::graph::{AudioHost, GraphError, NodeId};

/// Lifecycle phase of a voice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoicePhase {
    /// Constructed, nothing in the graph yet
    Idle,
    /// Attack, decay or sustain
    Sounding,
    /// Release ramp scheduled, sources will halt
    Releasing,
    /// Every owned node released
    Disposed,
}

impl fmt::Display for VoicePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VoicePhase::Idle => "idle",
            VoicePhase::Sounding => "sounding",
            VoicePhase::Releasing => "releasing",
            VoicePhase::Disposed => "disposed",
        };
        f.write_str(name)
    }
}

/// Errors raised by a voice
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VoiceError {
    #[error("frequency must be a positive number of Hz, got {0}")]
    InvalidFrequency(f64),
    #[error("amplitude must be within [0, 1], got {0}")]
    InvalidAmplitude(f64),
    #[error("patch has no partials")]
    EmptyPatch,
    #[error("cannot {operation} a voice that is {phase}")]
    InvalidTransition {
        operation: &'static str,
        phase: VoicePhase,
    },
    #[error("audio graph error: {0}")]
    Graph(#[from] GraphError),
}

/// Nodes owned by a voice
#[derive(Debug, Default)]
struct Chain {
    sources: Vec<NodeId>,
    attenuators: Vec<NodeId>,
    envelope: Option<NodeId>,
}

impl Chain {
    fn len(&self) -> usize {
        self.sources.len() + self.attenuators.len() + usize::from(self.envelope.is_some())
    }

    /// Hand over every handle, sources first
    fn take_all(&mut self) -> Vec<NodeId> {
        let mut nodes = std::mem::take(&mut self.sources);
        nodes.append(&mut self.attenuators);
        nodes.extend(self.envelope.take());
        nodes
    }
}

/// One note: partials summed through an ADSR envelope
#[derive(Debug)]
pub struct Voice {
    frequency: f64,
    peak: f64,
    patch: Arc<Patch>,
    output: NodeId,
    phase: VoicePhase,
    chain: Chain,
    onset: Option<f64>,
    released_at: Option<f64>,
}

impl Voice {
    /// Create an idle voice
    ///
    /// `output` is shared with other voices and is never released by this one.
    pub fn new(frequency: f64, amplitude: f64, output: NodeId, patch: Arc<Patch>) -> Result<Self, VoiceError> {
        if !frequency.is_finite() || frequency <= 0.0 {
            return Err(VoiceError::InvalidFrequency(frequency));
        }
        if !(0.0..=1.0).contains(&amplitude) {
            return Err(VoiceError::InvalidAmplitude(amplitude));
        }
        if patch.partials.is_empty() {
            return Err(VoiceError::EmptyPatch);
        }

        Ok(Self {
            frequency,
            peak: amplitude,
            patch,
            output,
            phase: VoicePhase::Idle,
            chain: Chain::default(),
            onset: None,
            released_at: None,
        })
    }

    /// Note frequency in Hz
    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    /// Envelope peak
    pub fn peak_amplitude(&self) -> f64 {
        self.peak
    }

    pub fn phase(&self) -> VoicePhase {
        self.phase
    }

    /// The source whose halt triggers disposal
    pub fn fundamental(&self) -> Option<NodeId> {
        self.chain.sources.first().copied()
    }

    /// The envelope gain stage
    pub fn envelope(&self) -> Option<NodeId> {
        self.chain.envelope
    }

    /// Number of graph nodes this voice currently owns
    pub fn owned_nodes(&self) -> usize {
        self.chain.len()
    }

    /// Envelope stage at `time` on the host clock
    pub fn stage_at(&self, time: f64) -> EnvelopeStage {
        match (self.phase, self.onset) {
            (VoicePhase::Sounding | VoicePhase::Releasing, Some(onset)) => {
                self.patch.envelope.stage_at(onset, self.released_at, time)
            }
            _ => EnvelopeStage::Idle,
        }
    }

    /// Build the signal chain and schedule attack and decay
    ///
    /// Must be called exactly once, on an idle voice. If the host fails
    /// part way through, whatever was built is released and the voice is
    /// left disposed.
    pub fn start<H: AudioHost + ?Sized>(&mut self, host: &mut H) -> Result<(), VoiceError> {
        self.expect_phase(VoicePhase::Idle, "start")?;

        if let Err(err) = self.build(host) {
            if let Err(cleanup) = self.release_chain(host) {
                warn!("cleanup after failed start also failed: {}", cleanup);
            }
            self.phase = VoicePhase::Disposed;
            return Err(err);
        }

        self.phase = VoicePhase::Sounding;
        debug!(
            "voice {:.2} Hz started at {:.4}s with {} nodes",
            self.frequency,
            host.current_time(),
            self.chain.len()
        );
        Ok(())
    }

    fn build<H: AudioHost + ?Sized>(&mut self, host: &mut H) -> Result<(), VoiceError> {
        let now = host.current_time();
        let patch = Arc::clone(&self.patch);

        let envelope = host.create_gain(0.0)?;
        self.chain.envelope = Some(envelope);
        host.connect(envelope, self.output)?;

        for partial in &patch.partials {
            let source = host.create_source(partial.waveform, partial.frequency_for(self.frequency))?;
            self.chain.sources.push(source);

            if partial.is_direct() {
                host.connect(source, envelope)?;
            } else {
                let attenuator = host.create_gain(partial.mix)?;
                self.chain.attenuators.push(attenuator);
                host.connect(source, attenuator)?;
                host.connect(attenuator, envelope)?;
            }
        }

        patch.envelope.schedule_onset(host.gain_param(envelope)?, now, self.peak);

        for &source in &self.chain.sources {
            host.start_source(source, now)?;
        }
        self.onset = Some(now);
        Ok(())
    }

    /// Release the note from wherever the envelope currently is
    ///
    /// Returns the time at which the sources halt. If the halt cannot be
    /// scheduled the voice is disposed on the spot, since no completion
    /// would ever arrive for it.
    pub fn stop<H: AudioHost + ?Sized>(&mut self, host: &mut H) -> Result<f64, VoiceError> {
        self.expect_phase(VoicePhase::Sounding, "stop")?;
        let Some(envelope) = self.chain.envelope else {
            return Err(VoiceError::InvalidTransition {
                operation: "stop",
                phase: self.phase,
            });
        };

        match self.schedule_release(host, envelope) {
            Ok(halt_at) => {
                self.phase = VoicePhase::Releasing;
                debug!(
                    "voice {:.2} Hz releasing, halts at {:.4}s",
                    self.frequency, halt_at
                );
                Ok(halt_at)
            }
            Err(err) => {
                if let Err(cleanup) = self.dispose(host) {
                    warn!("disposal after failed release also failed: {}", cleanup);
                }
                Err(err)
            }
        }
    }

    fn schedule_release<H: AudioHost + ?Sized>(&mut self, host: &mut H, envelope: NodeId) -> Result<f64, VoiceError> {
        let now = host.current_time();
        // Read before cancelling so a mid-ramp value is what gets pinned
        let current = host.gain_value(envelope, now)?;
        let silent_at = self
            .patch
            .envelope
            .schedule_release(host.gain_param(envelope)?, now, current);

        let halt_at = silent_at + self.patch.guard;
        for &source in &self.chain.sources {
            host.stop_source(source, halt_at)?;
        }
        self.released_at = Some(now);
        Ok(halt_at)
    }

    /// Disconnect and release every owned node
    ///
    /// Every handle is released even when an earlier one fails; the first
    /// failure is returned afterwards. Calling this on a disposed voice
    /// does nothing.
    pub fn dispose<H: AudioHost + ?Sized>(&mut self, host: &mut H) -> Result<(), VoiceError> {
        if self.phase == VoicePhase::Disposed {
            return Ok(());
        }

        let result = self.release_chain(host);
        self.phase = VoicePhase::Disposed;
        debug!("voice {:.2} Hz disposed", self.frequency);
        result
    }

    fn release_chain<H: AudioHost + ?Sized>(&mut self, host: &mut H) -> Result<(), VoiceError> {
        let mut first_error = None;

        for node in self.chain.take_all() {
            let disconnected = host.disconnect(node);
            // Released even if the disconnect failed
            let released = host.release(node);
            if let Err(err) = disconnected.and(released) {
                warn!("failed to release node {}: {}", node, err);
                first_error.get_or_insert(err);
            }
        }

        match first_error {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }

    fn expect_phase(&self, expected: VoicePhase, operation: &'static str) -> Result<(), VoiceError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(VoiceError::InvalidTransition {
                operation,
                phase: self.phase,
            })
        }
    }
}

impl Drop for Voice {
    fn drop(&mut self) {
        if self.chain.len() > 0 {
            warn!(
                "voice {:.2} Hz dropped while owning {} graph nodes",
                self.frequency,
                self.chain.len()
            );
        }
    }
}
