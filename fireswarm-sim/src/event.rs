//! Event types and priority queue ordering for discrete event simulation.

use std::cmp::Ordering;
use std::ops::Add;

use fireswarm::{Duration, PeerAddress};

/// Simulation time: milliseconds since the simulator was created.
///
/// Unlike node clocks this never wraps, so it can order the event queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SimTime(u64);

impl SimTime {
    pub const ZERO: SimTime = SimTime(0);

    pub const fn from_millis(ms: u64) -> Self {
        SimTime(ms)
    }

    pub const fn from_secs(secs: u64) -> Self {
        SimTime(secs * 1000)
    }

    pub const fn as_millis(self) -> u64 {
        self.0
    }
}

impl Add<Duration> for SimTime {
    type Output = SimTime;

    fn add(self, rhs: Duration) -> SimTime {
        SimTime(self.0 + u64::from(rhs.as_millis()))
    }
}

/// Unique sequence number for deterministic event ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SequenceNumber(u64);

impl SequenceNumber {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Scenario actions that can be scheduled during simulation.
#[derive(Debug, Clone)]
pub enum ScenarioAction {
    /// Partition the network into isolated groups.
    Partition { groups: Vec<Vec<PeerAddress>> },
    /// Heal all partitions (restore full connectivity).
    HealPartition,
    /// Disable a specific link.
    DisableLink { from: PeerAddress, to: PeerAddress },
    /// Enable a specific link.
    EnableLink { from: PeerAddress, to: PeerAddress },
    /// Set loss rate on a link.
    SetLossRate {
        from: PeerAddress,
        to: PeerAddress,
        rate: f64,
    },
    /// Take a view snapshot for metrics.
    TakeSnapshot,
}

/// Events in the discrete event simulation.
#[derive(Debug, Clone)]
pub enum Event {
    /// Deliver a data frame to a node.
    FrameDelivery {
        to: PeerAddress,
        from: PeerAddress,
        data: Vec<u8>,
    },
    /// Deliver a delivery report for an earlier send back to its sender.
    TxStatus { to: PeerAddress, delivered: bool },
    /// One iteration of a node's main loop.
    Tick { node: PeerAddress },
    /// Application on `from` fans a payload out to its view.
    AppTransmit { from: PeerAddress, payload: Vec<u8> },
    /// Execute a scenario action.
    ScenarioAction(ScenarioAction),
}

/// A scheduled event with time and sequence number for ordering.
#[derive(Debug, Clone)]
pub struct ScheduledEvent {
    /// When the event should occur.
    pub time: SimTime,
    /// Sequence number for deterministic ordering of same-time events.
    pub seq: SequenceNumber,
    /// The event to process.
    pub event: Event,
}

impl ScheduledEvent {
    pub fn new(time: SimTime, seq: SequenceNumber, event: Event) -> Self {
        Self { time, seq, event }
    }
}

// Implement ordering for min-heap (BinaryHeap is max-heap, so we reverse).
impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.seq == other.seq
    }
}

impl Eq for ScheduledEvent {}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        // Earlier time first, then lower sequence number.
        match other.time.cmp(&self.time) {
            Ordering::Equal => other.seq.cmp(&self.seq),
            ord => ord,
        }
    }
}
