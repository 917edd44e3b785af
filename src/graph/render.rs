//! Sample-accurate renderer for the host graph

use std::collections::HashMap;

use super::{AudioHost, GraphError, NodeId, ParamTimeline};
use crate::synth::{Oscillator, Waveform};

/// Lifetime counters for graph nodes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphStats {
    /// Nodes created over the graph's lifetime (destination excluded)
    pub created: u64,
    /// Nodes released over the graph's lifetime
    pub released: u64,
}

impl GraphStats {
    /// Nodes currently alive
    pub fn live(&self) -> u64 {
        self.created - self.released
    }
}

#[derive(Debug)]
enum SourceState {
    Idle,
    Scheduled { start: f64, stop: Option<f64> },
    Ended,
}

#[derive(Debug)]
struct Source {
    oscillator: Oscillator,
    state: SourceState,
    output: f64,
}

#[derive(Debug)]
enum NodeKind {
    Source(Source),
    Gain(ParamTimeline),
    Destination,
}

#[derive(Debug)]
struct Node {
    kind: NodeKind,
    inputs: Vec<NodeId>,
}

/// Mono render graph driven by its own sample clock
pub struct Graph {
    sample_rate: f64,
    frame: u64,
    next_id: u64,
    nodes: HashMap<NodeId, Node>,
    destination: NodeId,
    master_volume: f64,
    ended: Vec<NodeId>,
    stats: GraphStats,
}

impl Graph {
    /// Create an empty graph with a single destination node
    pub fn new(sample_rate: f64) -> Self {
        let destination = NodeId(0);
        let mut nodes = HashMap::new();
        nodes.insert(
            destination,
            Node {
                kind: NodeKind::Destination,
                inputs: Vec::new(),
            },
        );

        Self {
            sample_rate,
            frame: 0,
            next_id: 1,
            nodes,
            destination,
            master_volume: 1.0,
            ended: Vec::new(),
            stats: GraphStats::default(),
        }
    }

    /// The shared output every voice connects to
    pub fn destination(&self) -> NodeId {
        self.destination
    }

    /// Get the sample rate
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Set the gain applied at the destination
    pub fn set_master_volume(&mut self, volume: f64) {
        self.master_volume = volume;
    }

    /// Node lifetime counters
    pub fn stats(&self) -> GraphStats {
        self.stats
    }

    /// Whether `node` is still alive
    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    /// Render one frame and advance the clock
    pub fn render_frame(&mut self) -> f64 {
        let time = self.current_time();

        for (&id, node) in self.nodes.iter_mut() {
            if let NodeKind::Source(source) = &mut node.kind {
                source.output = match source.state {
                    SourceState::Scheduled { stop: Some(stop), .. } if time >= stop => {
                        source.state = SourceState::Ended;
                        self.ended.push(id);
                        0.0
                    }
                    SourceState::Scheduled { start, .. } if time >= start => {
                        source.oscillator.generate()
                    }
                    _ => 0.0,
                };
            }
        }

        let output = self.evaluate(self.destination, time) * self.master_volume;
        self.frame += 1;
        output
    }

    fn evaluate(&self, id: NodeId, time: f64) -> f64 {
        let Some(node) = self.nodes.get(&id) else {
            return 0.0;
        };

        match &node.kind {
            NodeKind::Source(source) => source.output,
            NodeKind::Gain(param) => self.sum_inputs(node, time) * param.value_at(time),
            NodeKind::Destination => self.sum_inputs(node, time),
        }
    }

    fn sum_inputs(&self, node: &Node, time: f64) -> f64 {
        node.inputs.iter().map(|&input| self.evaluate(input, time)).sum()
    }

    fn add_node(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            Node {
                kind,
                inputs: Vec::new(),
            },
        );
        self.stats.created += 1;
        id
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, GraphError> {
        self.nodes.get_mut(&id).ok_or(GraphError::UnknownNode(id))
    }

    fn source_mut(&mut self, id: NodeId) -> Result<&mut Source, GraphError> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::Source(source) => Ok(source),
            _ => Err(GraphError::NotASource(id)),
        }
    }

    /// Whether `target` feeds into `node`, directly or transitively
    fn is_upstream(&self, target: NodeId, node: NodeId) -> bool {
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            if current == target {
                return true;
            }
            if let Some(n) = self.nodes.get(&current) {
                stack.extend(n.inputs.iter().copied());
            }
        }
        false
    }
}

impl AudioHost for Graph {
    fn current_time(&self) -> f64 {
        self.frame as f64 / self.sample_rate
    }

    fn create_source(&mut self, waveform: Waveform, frequency: f64) -> Result<NodeId, GraphError> {
        let oscillator = Oscillator::new(waveform, frequency, self.sample_rate);
        Ok(self.add_node(NodeKind::Source(Source {
            oscillator,
            state: SourceState::Idle,
            output: 0.0,
        })))
    }

    fn create_gain(&mut self, gain: f64) -> Result<NodeId, GraphError> {
        Ok(self.add_node(NodeKind::Gain(ParamTimeline::new(gain))))
    }

    fn connect(&mut self, from: NodeId, to: NodeId) -> Result<(), GraphError> {
        if !self.nodes.contains_key(&from) {
            return Err(GraphError::UnknownNode(from));
        }
        if !self.nodes.contains_key(&to) {
            return Err(GraphError::UnknownNode(to));
        }
        if self.is_upstream(to, from) {
            return Err(GraphError::Cycle { from, to });
        }

        let inputs = &mut self.node_mut(to)?.inputs;
        if !inputs.contains(&from) {
            inputs.push(from);
        }
        Ok(())
    }

    fn disconnect(&mut self, node: NodeId) -> Result<(), GraphError> {
        if !self.nodes.contains_key(&node) {
            return Err(GraphError::UnknownNode(node));
        }
        for other in self.nodes.values_mut() {
            other.inputs.retain(|&input| input != node);
        }
        Ok(())
    }

    fn release(&mut self, node: NodeId) -> Result<(), GraphError> {
        if node == self.destination {
            return Err(GraphError::UnknownNode(node));
        }
        self.disconnect(node)?;
        self.nodes.remove(&node);
        self.ended.retain(|&ended| ended != node);
        self.stats.released += 1;
        Ok(())
    }

    fn start_source(&mut self, node: NodeId, when: f64) -> Result<(), GraphError> {
        let source = self.source_mut(node)?;
        match source.state {
            SourceState::Idle => {
                source.state = SourceState::Scheduled {
                    start: when,
                    stop: None,
                };
                Ok(())
            }
            _ => Err(GraphError::AlreadyStarted(node)),
        }
    }

    fn stop_source(&mut self, node: NodeId, when: f64) -> Result<(), GraphError> {
        let source = self.source_mut(node)?;
        match &mut source.state {
            SourceState::Scheduled { stop, .. } if stop.is_none() => {
                *stop = Some(when);
                Ok(())
            }
            SourceState::Idle => Err(GraphError::NotStarted(node)),
            _ => Err(GraphError::AlreadyStopped(node)),
        }
    }

    fn gain_param(&mut self, node: NodeId) -> Result<&mut ParamTimeline, GraphError> {
        match &mut self.node_mut(node)?.kind {
            NodeKind::Gain(param) => Ok(param),
            _ => Err(GraphError::NotAGain(node)),
        }
    }

    fn gain_value(&self, node: NodeId, time: f64) -> Result<f64, GraphError> {
        match &self.nodes.get(&node).ok_or(GraphError::UnknownNode(node))?.kind {
            NodeKind::Gain(param) => Ok(param.value_at(time)),
            _ => Err(GraphError::NotAGain(node)),
        }
    }

    fn take_ended(&mut self) -> Vec<NodeId> {
        std::mem::take(&mut self.ended)
    }
}
