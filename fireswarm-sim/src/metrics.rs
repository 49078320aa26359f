//! Metrics collection for simulation analysis.

use fireswarm::PeerAddress;
use hashbrown::HashMap;

use crate::event::SimTime;

/// Neighbor views and pending counts of every node at one point in time.
#[derive(Debug, Clone)]
pub struct ViewSnapshot {
    /// When this snapshot was taken.
    pub time: SimTime,
    /// View members of each node, in storage order.
    pub views: HashMap<PeerAddress, Vec<PeerAddress>>,
    /// Pending-send count of each node.
    pub pending: HashMap<PeerAddress, u32>,
}

impl ViewSnapshot {
    /// Create a new empty snapshot.
    pub fn new(time: SimTime) -> Self {
        Self {
            time,
            views: HashMap::new(),
            pending: HashMap::new(),
        }
    }

    /// Record a node's state.
    pub fn record_node(&mut self, node: PeerAddress, view: Vec<PeerAddress>, pending: u32) {
        self.views.insert(node, view);
        self.pending.insert(node, pending);
    }

    /// View size of `node`, or 0 if unknown.
    pub fn view_size(&self, node: PeerAddress) -> usize {
        self.views.get(&node).map_or(0, Vec::len)
    }

    /// True if `node` has `peer` in its view.
    pub fn knows(&self, node: PeerAddress, peer: PeerAddress) -> bool {
        self.views.get(&node).is_some_and(|v| v.contains(&peer))
    }

    /// Largest view in the network.
    pub fn max_view_size(&self) -> usize {
        self.views.values().map(Vec::len).max().unwrap_or(0)
    }

    /// Smallest view in the network.
    pub fn min_view_size(&self) -> usize {
        self.views.values().map(Vec::len).min().unwrap_or(0)
    }

    /// Nodes whose view is empty.
    pub fn isolated(&self) -> Vec<PeerAddress> {
        let mut nodes: Vec<PeerAddress> = self
            .views
            .iter()
            .filter(|(_, v)| v.is_empty())
            .map(|(&n, _)| n)
            .collect();
        nodes.sort_by_key(|n| n.as_u64());
        nodes
    }

    /// Sum of all pending-send counts.
    pub fn total_pending(&self) -> u64 {
        self.pending.values().map(|&p| u64::from(p)).sum()
    }
}

/// Simulation metrics collected over time.
#[derive(Debug, Clone, Default)]
pub struct SimMetrics {
    /// Frames put on air (a broadcast counts once).
    pub frames_sent: u64,
    /// Receptions lost to link loss or an inactive link.
    pub frames_dropped: u64,
    /// Receptions handed to a node.
    pub frames_delivered: u64,
    /// Delivery reports returned to senders.
    pub status_reports: u64,
    /// Application commands surfaced to node applications.
    pub app_commands: u64,
    /// Snapshots taken at intervals.
    pub snapshots: Vec<ViewSnapshot>,
}

impl SimMetrics {
    /// Create new empty metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a snapshot.
    pub fn add_snapshot(&mut self, snapshot: ViewSnapshot) {
        self.snapshots.push(snapshot);
    }

    /// First time every node had a non-empty view.
    pub fn discovery_time(&self) -> Option<SimTime> {
        self.snapshots
            .iter()
            .find(|s| !s.views.is_empty() && s.isolated().is_empty())
            .map(|s| s.time)
    }

    /// Get the latest snapshot.
    pub fn latest_snapshot(&self) -> Option<&ViewSnapshot> {
        self.snapshots.last()
    }
}

/// Result of running a simulation.
#[derive(Debug, Clone)]
pub struct SimulationResult {
    /// Final simulation time.
    pub end_time: SimTime,
    /// Collected metrics.
    pub metrics: SimMetrics,
    /// Whether simulation ended due to event queue exhaustion (vs time limit).
    pub queue_exhausted: bool,
}

impl SimulationResult {
    /// Check if every node ended with at least one neighbor.
    pub fn all_discovered(&self) -> bool {
        self.metrics
            .latest_snapshot()
            .is_some_and(|s| s.isolated().is_empty())
    }

    /// Largest view at the end.
    pub fn final_max_view_size(&self) -> usize {
        self.metrics
            .latest_snapshot()
            .map(|s| s.max_view_size())
            .unwrap_or(0)
    }

    /// Smallest view at the end.
    pub fn final_min_view_size(&self) -> usize {
        self.metrics
            .latest_snapshot()
            .map(|s| s.min_view_size())
            .unwrap_or(0)
    }
}
