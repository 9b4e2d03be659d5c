use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Unique identifier for a node in the simulation hierarchy.
///
/// Worlds, entities, and components all carry one of these. Ids are stable
/// for the lifetime of the object and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

/// Timing values for one simulation step.
///
/// `elapsed` is the time covered by the current step; `total` is the
/// simulated time since server start as of the beginning of the step.
/// Clients synchronise against the server's published start time, so both
/// values are simulated time, not wall-clock readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GameTime {
    pub elapsed: Duration,
    pub total: Duration,
}

impl GameTime {
    pub fn new(elapsed: Duration, total: Duration) -> Self {
        Self { elapsed, total }
    }

    /// Elapsed time for this step in whole milliseconds.
    pub fn elapsed_millis(&self) -> u64 {
        self.elapsed.as_millis() as u64
    }
}
