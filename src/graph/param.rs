//! Automation timeline for a single gain value
//!
//! Mirrors the scheduling model of a Web Audio `AudioParam`: values are
//! set or ramped at absolute times on the host clock and the timeline is
//! evaluated lazily at whatever time the renderer asks for.

/// A scheduled change to the parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamEvent {
    /// Jump to `value` at `time`
    SetValue { time: f64, value: f64 },
    /// Ramp linearly from the previous event's value, reaching `value` at `time`
    LinearRamp { time: f64, value: f64 },
}

impl ParamEvent {
    /// Time at which the event's value is reached
    pub fn time(&self) -> f64 {
        match *self {
            ParamEvent::SetValue { time, .. } | ParamEvent::LinearRamp { time, .. } => time,
        }
    }

    /// Value held once the event completes
    pub fn value(&self) -> f64 {
        match *self {
            ParamEvent::SetValue { value, .. } | ParamEvent::LinearRamp { value, .. } => value,
        }
    }
}

/// Time-ordered list of automation events with a default value
#[derive(Debug, Clone)]
pub struct ParamTimeline {
    default_value: f64,
    events: Vec<ParamEvent>,
}

impl ParamTimeline {
    /// Create a timeline that holds `default_value` until something is scheduled
    pub fn new(default_value: f64) -> Self {
        Self {
            default_value,
            events: Vec::new(),
        }
    }

    /// Value used before the first event
    pub fn default_value(&self) -> f64 {
        self.default_value
    }

    /// Scheduled events in time order
    pub fn events(&self) -> &[ParamEvent] {
        &self.events
    }

    /// Schedule an instantaneous change
    pub fn set_value_at_time(&mut self, value: f64, time: f64) {
        self.insert(ParamEvent::SetValue { time, value });
    }

    /// Schedule a linear ramp ending at `time`
    ///
    /// The ramp starts from whatever event precedes it on the timeline.
    pub fn linear_ramp_to_value_at_time(&mut self, value: f64, time: f64) {
        self.insert(ParamEvent::LinearRamp { time, value });
    }

    /// Drop every event scheduled at or after `time`
    pub fn cancel_scheduled_values(&mut self, time: f64) {
        self.events.retain(|event| event.time() < time);
    }

    /// Evaluate the timeline at `time`
    pub fn value_at(&self, time: f64) -> f64 {
        // Index of the first event that has not completed yet
        let next = self.events.partition_point(|event| event.time() <= time);

        let (prev_time, prev_value) = match next.checked_sub(1) {
            Some(idx) => (self.events[idx].time(), self.events[idx].value()),
            None => (f64::NEG_INFINITY, self.default_value),
        };

        match self.events.get(next) {
            Some(&ParamEvent::LinearRamp { time: end, value }) if prev_time.is_finite() => {
                let span = end - prev_time;
                if span <= 0.0 {
                    return value;
                }
                let t = (time - prev_time) / span;
                prev_value + (value - prev_value) * t
            }
            _ => prev_value,
        }
    }

    fn insert(&mut self, event: ParamEvent) {
        // Equal times keep insertion order
        let idx = self
            .events
            .partition_point(|existing| existing.time() <= event.time());
        self.events.insert(idx, event);
    }
}

impl Default for ParamTimeline {
    fn default() -> Self {
        Self::new(1.0)
    }
}
