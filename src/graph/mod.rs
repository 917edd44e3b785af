//! Host audio graph
//!
//! Voices never touch samples directly. They build a small graph of
//! sources and gain stages on an [`AudioHost`] and schedule everything
//! against the host clock; the host renders the graph and reports back
//! when sources halt.

mod param;
mod render;

#[cfg(test)]
pub(crate) mod fake;

pub use param::{ParamEvent, ParamTimeline};
pub use render::{Graph, GraphStats};

use crate::synth::Waveform;
use thiserror::Error;

/// Opaque handle to a node owned by a host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u64);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Errors reported by a host graph
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
    #[error("node {0} is not a source")]
    NotASource(NodeId),
    #[error("node {0} is not a gain stage")]
    NotAGain(NodeId),
    #[error("connecting {from} to {to} would create a cycle")]
    Cycle { from: NodeId, to: NodeId },
    #[error("source {0} was already started")]
    AlreadyStarted(NodeId),
    #[error("source {0} already has a stop time")]
    AlreadyStopped(NodeId),
    #[error("source {0} has not been started")]
    NotStarted(NodeId),
}

/// The audio subsystem a voice builds its signal chain on
///
/// All times are seconds on the host's monotonic clock.
pub trait AudioHost {
    /// Current time of the host clock
    fn current_time(&self) -> f64;

    /// Create a periodic source
    fn create_source(&mut self, waveform: Waveform, frequency: f64) -> Result<NodeId, GraphError>;

    /// Create a linear gain stage with a fixed initial gain
    fn create_gain(&mut self, gain: f64) -> Result<NodeId, GraphError>;

    /// Route the output of `from` into `to`
    fn connect(&mut self, from: NodeId, to: NodeId) -> Result<(), GraphError>;

    /// Remove every outgoing connection of `node`
    fn disconnect(&mut self, node: NodeId) -> Result<(), GraphError>;

    /// Free the node; the handle is invalid afterwards
    fn release(&mut self, node: NodeId) -> Result<(), GraphError>;

    /// Begin generating at `when`
    fn start_source(&mut self, node: NodeId, when: f64) -> Result<(), GraphError>;

    /// Halt at `when`; the halt is reported once through [`AudioHost::take_ended`]
    fn stop_source(&mut self, node: NodeId, when: f64) -> Result<(), GraphError>;

    /// Automation timeline of a gain stage
    fn gain_param(&mut self, node: NodeId) -> Result<&mut ParamTimeline, GraphError>;

    /// Instantaneous gain of a gain stage at `time`
    fn gain_value(&self, node: NodeId, time: f64) -> Result<f64, GraphError>;

    /// Drain the sources that halted since the last call
    fn take_ended(&mut self) -> Vec<NodeId>;
}
