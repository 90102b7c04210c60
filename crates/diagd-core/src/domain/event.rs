//! Metric events submitted to the remote metrics sink
//!
//! An [`Event`] is immutable once built. Equality treats `dimensions` as a
//! set: two events that only differ in the order of their dimensions are the
//! same event.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The two shapes of event the sink accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Something happened once
    Occurrence,
    /// A measurement (a size, a duration, an uptime)
    Integer,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventKind::Occurrence => "occurrence",
            EventKind::Integer => "integer",
        };
        write!(f, "{}", s)
    }
}

/// A single metric event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    kind: EventKind,
    metric_id: u32,
    dimensions: Vec<u32>,
    value: u64,
}

impl Event {
    /// Creates an occurrence event. Occurrences always carry a value of 1.
    pub fn occurrence(metric_id: u32, dimensions: Vec<u32>) -> Self {
        Self {
            kind: EventKind::Occurrence,
            metric_id,
            dimensions,
            value: 1,
        }
    }

    /// Creates an integer (measurement) event.
    pub fn integer(metric_id: u32, dimensions: Vec<u32>, value: u64) -> Self {
        Self {
            kind: EventKind::Integer,
            metric_id,
            dimensions,
            value,
        }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn metric_id(&self) -> u32 {
        self.metric_id
    }

    pub fn dimensions(&self) -> &[u32] {
        &self.dimensions
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    fn dimension_set(&self) -> BTreeSet<u32> {
        self.dimensions.iter().copied().collect()
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.metric_id == other.metric_id
            && self.value == other.value
            && self.dimension_set() == other.dimension_set()
    }
}

impl Eq for Event {}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} metric={} dimensions={:?} value={}",
            self.kind, self.metric_id, self.dimensions, self.value
        )
    }
}
