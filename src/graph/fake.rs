//! Resource-tracking host for lifecycle tests
//!
//! Renders nothing. Every node handed out is tracked so tests can assert
//! that each one is released exactly once, and the clock only moves when
//! a test advances it.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::{AudioHost, GraphError, NodeId, ParamTimeline};
use crate::synth::Waveform;

#[derive(Debug, Clone)]
pub enum FakeNode {
    Source {
        waveform: Waveform,
        frequency: f64,
        start: Option<f64>,
        stop: Option<f64>,
    },
    Gain(ParamTimeline),
}

#[derive(Debug, Default)]
pub struct FakeHost {
    pub time: f64,
    next_id: u64,
    pub nodes: BTreeMap<NodeId, FakeNode>,
    /// Outgoing connections per node
    pub edges: BTreeMap<NodeId, BTreeSet<NodeId>>,
    /// Release count per node; anything above 1 is a double free
    pub releases: HashMap<NodeId, u32>,
    pub created: Vec<NodeId>,
    /// Nodes whose `disconnect` fails
    pub failing_disconnects: BTreeSet<NodeId>,
    pending_ended: Vec<NodeId>,
    ended_reported: BTreeSet<NodeId>,
}

impl FakeHost {
    pub fn new() -> Self {
        // Id 0 stands in for the shared destination
        Self {
            next_id: 1,
            ..Self::default()
        }
    }

    pub fn destination(&self) -> NodeId {
        NodeId(0)
    }

    /// Move the clock forward, queueing halts that fall inside the step
    pub fn advance(&mut self, seconds: f64) {
        self.time += seconds;
        for (&id, node) in &self.nodes {
            if let FakeNode::Source { stop: Some(stop), .. } = node {
                if *stop <= self.time && self.ended_reported.insert(id) {
                    self.pending_ended.push(id);
                }
            }
        }
    }

    pub fn live_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn sources(&self) -> Vec<(NodeId, Waveform, f64)> {
        self.nodes
            .iter()
            .filter_map(|(&id, node)| match node {
                FakeNode::Source {
                    waveform, frequency, ..
                } => Some((id, *waveform, *frequency)),
                FakeNode::Gain(_) => None,
            })
            .collect()
    }

    pub fn gain(&self, node: NodeId) -> Option<&ParamTimeline> {
        match self.nodes.get(&node) {
            Some(FakeNode::Gain(param)) => Some(param),
            _ => None,
        }
    }

    pub fn stop_time(&self, node: NodeId) -> Option<f64> {
        match self.nodes.get(&node) {
            Some(FakeNode::Source { stop, .. }) => *stop,
            _ => None,
        }
    }

    pub fn outputs(&self, node: NodeId) -> Vec<NodeId> {
        self.edges
            .get(&node)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Every node created has been released exactly once
    pub fn all_released_once(&self) -> bool {
        self.created
            .iter()
            .all(|id| self.releases.get(id).copied() == Some(1))
    }

    fn add(&mut self, node: FakeNode) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, node);
        self.created.push(id);
        id
    }

    fn known(&self, node: NodeId) -> bool {
        node == self.destination() || self.nodes.contains_key(&node)
    }
}

impl AudioHost for FakeHost {
    fn current_time(&self) -> f64 {
        self.time
    }

    fn create_source(&mut self, waveform: Waveform, frequency: f64) -> Result<NodeId, GraphError> {
        Ok(self.add(FakeNode::Source {
            waveform,
            frequency,
            start: None,
            stop: None,
        }))
    }

    fn create_gain(&mut self, gain: f64) -> Result<NodeId, GraphError> {
        Ok(self.add(FakeNode::Gain(ParamTimeline::new(gain))))
    }

    fn connect(&mut self, from: NodeId, to: NodeId) -> Result<(), GraphError> {
        if !self.known(from) {
            return Err(GraphError::UnknownNode(from));
        }
        if !self.known(to) {
            return Err(GraphError::UnknownNode(to));
        }
        self.edges.entry(from).or_default().insert(to);
        Ok(())
    }

    fn disconnect(&mut self, node: NodeId) -> Result<(), GraphError> {
        if self.failing_disconnects.contains(&node) || !self.known(node) {
            return Err(GraphError::UnknownNode(node));
        }
        self.edges.remove(&node);
        Ok(())
    }

    fn release(&mut self, node: NodeId) -> Result<(), GraphError> {
        *self.releases.entry(node).or_default() += 1;
        if self.nodes.remove(&node).is_none() {
            return Err(GraphError::UnknownNode(node));
        }
        self.edges.remove(&node);
        Ok(())
    }

    fn start_source(&mut self, node: NodeId, when: f64) -> Result<(), GraphError> {
        match self.nodes.get_mut(&node) {
            Some(FakeNode::Source { start, .. }) => {
                *start = Some(when);
                Ok(())
            }
            Some(_) => Err(GraphError::NotASource(node)),
            None => Err(GraphError::UnknownNode(node)),
        }
    }

    fn stop_source(&mut self, node: NodeId, when: f64) -> Result<(), GraphError> {
        match self.nodes.get_mut(&node) {
            Some(FakeNode::Source { stop, .. }) => {
                *stop = Some(when);
                Ok(())
            }
            Some(_) => Err(GraphError::NotASource(node)),
            None => Err(GraphError::UnknownNode(node)),
        }
    }

    fn gain_param(&mut self, node: NodeId) -> Result<&mut ParamTimeline, GraphError> {
        match self.nodes.get_mut(&node) {
            Some(FakeNode::Gain(param)) => Ok(param),
            Some(_) => Err(GraphError::NotAGain(node)),
            None => Err(GraphError::UnknownNode(node)),
        }
    }

    fn gain_value(&self, node: NodeId, time: f64) -> Result<f64, GraphError> {
        match self.nodes.get(&node) {
            Some(FakeNode::Gain(param)) => Ok(param.value_at(time)),
            Some(_) => Err(GraphError::NotAGain(node)),
            None => Err(GraphError::UnknownNode(node)),
        }
    }

    fn take_ended(&mut self) -> Vec<NodeId> {
        std::mem::take(&mut self.pending_ended)
    }
}
