//! Scenario builder for setting up and running simulations.

use fireswarm::{Duration, PeerAddress, Timestamp};

use crate::event::{ScenarioAction, SimTime};
use crate::metrics::SimulationResult;
use crate::node::SimNode;
use crate::sim::{Simulator, DEFAULT_TICK};
use crate::topology::Topology;

/// Type of topology to generate.
#[derive(Debug, Clone)]
enum TopologyType {
    FullyConnected,
    Chain,
    /// First node is the hub.
    Star,
    Custom(Topology),
}

/// Scheduled action with nodes referred to by index.
#[derive(Debug, Clone)]
enum PlannedAction {
    Partition(Vec<Vec<usize>>),
    Heal,
    DisableLink(usize, usize),
    EnableLink(usize, usize),
    LossRate(usize, usize, f64),
    Transmit(usize, Vec<u8>),
    Snapshot,
}

/// Builder for simulation scenarios.
///
/// Nodes get serial numbers `1..=num_nodes`; index `i` refers to serial `i + 1`.
pub struct ScenarioBuilder {
    num_nodes: usize,
    seed: u64,
    topology_type: TopologyType,
    loss_rate: f64,
    delay: Option<Duration>,
    tick_interval: Duration,
    clock_origin: Timestamp,
    actions: Vec<(SimTime, PlannedAction)>,
    snapshot_interval: Option<Duration>,
}

impl Default for ScenarioBuilder {
    fn default() -> Self {
        Self::new(0)
    }
}

impl ScenarioBuilder {
    /// Create a fully connected scenario with the given number of nodes.
    pub fn new(num_nodes: usize) -> Self {
        Self {
            num_nodes,
            seed: 42,
            topology_type: TopologyType::FullyConnected,
            loss_rate: 0.0,
            delay: None,
            tick_interval: DEFAULT_TICK,
            clock_origin: Timestamp::ZERO,
            actions: Vec::new(),
            snapshot_interval: None,
        }
    }

    /// Set the RNG seed for deterministic simulation.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Use a custom topology over the addresses from [`ScenarioBuilder::addresses`].
    pub fn topology(mut self, topo: Topology) -> Self {
        self.topology_type = TopologyType::Custom(topo);
        self
    }

    pub fn fully_connected(mut self) -> Self {
        self.topology_type = TopologyType::FullyConnected;
        self
    }

    pub fn chain_topology(mut self) -> Self {
        self.topology_type = TopologyType::Chain;
        self
    }

    pub fn star_topology(mut self) -> Self {
        self.topology_type = TopologyType::Star;
        self
    }

    /// Set loss rate on every link.
    pub fn with_loss_rate(mut self, rate: f64) -> Self {
        self.loss_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Set delay on every link.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Set the interval between node main-loop iterations.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Start node clocks at `origin` instead of zero.
    pub fn with_clock_origin(mut self, origin: Timestamp) -> Self {
        self.clock_origin = origin;
        self
    }

    /// Set snapshot interval for metrics collection.
    pub fn with_snapshot_interval(mut self, interval: Duration) -> Self {
        self.snapshot_interval = Some(interval);
        self
    }

    /// Schedule a network partition into groups of node indices.
    pub fn partition_at(mut self, time: SimTime, groups: Vec<Vec<usize>>) -> Self {
        self.actions.push((time, PlannedAction::Partition(groups)));
        self
    }

    /// Schedule partition healing at the specified time.
    pub fn heal_at(mut self, time: SimTime) -> Self {
        self.actions.push((time, PlannedAction::Heal));
        self
    }

    pub fn disable_link_at(mut self, time: SimTime, a: usize, b: usize) -> Self {
        self.actions.push((time, PlannedAction::DisableLink(a, b)));
        self
    }

    pub fn enable_link_at(mut self, time: SimTime, a: usize, b: usize) -> Self {
        self.actions.push((time, PlannedAction::EnableLink(a, b)));
        self
    }

    /// Change the loss rate of one link.
    pub fn loss_rate_at(mut self, time: SimTime, a: usize, b: usize, rate: f64) -> Self {
        self.actions.push((time, PlannedAction::LossRate(a, b, rate)));
        self
    }

    /// Schedule node `from` to fan `payload` out to its view.
    pub fn transmit_at(mut self, time: SimTime, from: usize, payload: Vec<u8>) -> Self {
        self.actions.push((time, PlannedAction::Transmit(from, payload)));
        self
    }

    /// Schedule a snapshot at the specified time.
    pub fn snapshot_at(mut self, time: SimTime) -> Self {
        self.actions.push((time, PlannedAction::Snapshot));
        self
    }

    /// Addresses the built nodes will have, by index.
    pub fn addresses(&self) -> Vec<PeerAddress> {
        (1..=self.num_nodes as u32).map(SimNode::address_for).collect()
    }

    /// Build the simulator with all nodes and topology.
    pub fn build(self) -> (Simulator, Vec<PeerAddress>) {
        let addresses = self.addresses();

        let mut topo = match self.topology_type {
            TopologyType::FullyConnected => Topology::fully_connected(&addresses),
            TopologyType::Chain => Topology::chain(&addresses),
            TopologyType::Star => Topology::star(&addresses),
            TopologyType::Custom(t) => t,
        };
        if self.loss_rate > 0.0 {
            topo.set_global_loss_rate(self.loss_rate);
        }
        if let Some(delay) = self.delay {
            topo.set_global_delay(delay);
        }

        let mut sim = Simulator::new(self.seed)
            .with_topology(topo)
            .with_tick_interval(self.tick_interval)
            .with_clock_origin(self.clock_origin);
        if let Some(interval) = self.snapshot_interval {
            sim = sim.with_snapshot_interval(interval);
        }

        // Topology is in place before nodes start, so first announcements propagate
        for serial in 1..=self.num_nodes as u32 {
            sim.add_node(serial);
        }

        // Unknown indices are skipped
        let at = |i: usize| addresses.get(i).copied();
        for (time, action) in self.actions {
            match action {
                PlannedAction::Partition(groups) => {
                    let groups: Vec<Vec<PeerAddress>> = groups
                        .into_iter()
                        .map(|g| g.into_iter().filter_map(at).collect::<Vec<_>>())
                        .collect();
                    sim.schedule_action(time, ScenarioAction::Partition { groups });
                }
                PlannedAction::Heal => sim.schedule_action(time, ScenarioAction::HealPartition),
                PlannedAction::DisableLink(a, b) => {
                    if let (Some(from), Some(to)) = (at(a), at(b)) {
                        sim.schedule_action(time, ScenarioAction::DisableLink { from, to });
                    }
                }
                PlannedAction::EnableLink(a, b) => {
                    if let (Some(from), Some(to)) = (at(a), at(b)) {
                        sim.schedule_action(time, ScenarioAction::EnableLink { from, to });
                    }
                }
                PlannedAction::LossRate(a, b, rate) => {
                    if let (Some(from), Some(to)) = (at(a), at(b)) {
                        sim.schedule_action(time, ScenarioAction::SetLossRate { from, to, rate });
                    }
                }
                PlannedAction::Transmit(from, payload) => {
                    if let Some(from) = at(from) {
                        sim.schedule_transmit(time, from, payload);
                    }
                }
                PlannedAction::Snapshot => sim.schedule_action(time, ScenarioAction::TakeSnapshot),
            }
        }

        (sim, addresses)
    }

    /// Build and run the simulation for the specified duration.
    pub fn run_for(self, duration: Duration) -> SimulationResult {
        let (mut sim, _) = self.build();
        sim.run_for(duration)
    }

    /// Build and run until the specified time.
    pub fn run_until(self, time: SimTime) -> SimulationResult {
        let (mut sim, _) = self.build();
        sim.run_until(time)
    }
}

/// Convenience function to create a simple N-node fully connected scenario.
pub fn simple_scenario(num_nodes: usize) -> ScenarioBuilder {
    ScenarioBuilder::new(num_nodes).fully_connected()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_builder_basic() {
        let (sim, nodes) = ScenarioBuilder::new(3).with_seed(123).build();

        assert_eq!(nodes.len(), 3);
        assert_eq!(sim.node_addresses(), nodes);
        assert!(sim.topology().is_connected(nodes[0], nodes[2]));
    }

    #[test]
    fn test_scenario_run_for() {
        let result = simple_scenario(2).run_for(Duration::from_secs(1));

        assert_eq!(result.end_time, SimTime::from_secs(1));
        assert!(!result.metrics.snapshots.is_empty());
        assert!(result.all_discovered());
    }

    #[test]
    fn test_scenario_with_loss_and_delay() {
        let (sim, nodes) = ScenarioBuilder::new(2)
            .with_loss_rate(0.5)
            .with_delay(Duration::from_millis(30))
            .build();

        let link = sim.topology().get_link(nodes[0], nodes[1]).unwrap();
        assert_eq!(link.loss_rate, 0.5);
        assert_eq!(link.delay, Duration::from_millis(30));
    }

    #[test]
    fn test_scenario_partition() {
        let (mut sim, nodes) = ScenarioBuilder::new(4)
            .partition_at(SimTime::from_millis(500), vec![vec![0, 1], vec![2, 3]])
            .build();

        assert!(sim.topology().is_connected(nodes[0], nodes[2]));

        sim.run_for(Duration::from_secs(1));

        assert!(!sim.topology().is_connected(nodes[0], nodes[2]));
        assert!(sim.topology().is_connected(nodes[0], nodes[1]));
        assert!(sim.topology().is_connected(nodes[2], nodes[3]));
    }

    #[test]
    fn test_scenario_transmit_reaches_view() {
        let (mut sim, nodes) = ScenarioBuilder::new(3)
            .transmit_at(SimTime::from_secs(1), 0, vec![0x40, 1])
            .build();

        let result = sim.run_for(Duration::from_secs(2));
        assert_eq!(result.metrics.app_commands, 2);
        for &peer in &nodes[1..] {
            assert_eq!(sim.node(&peer).unwrap().received(), &[(nodes[0], 0x40, vec![1])]);
        }
    }

    #[test]
    fn test_scheduled_loss_rate() {
        let (mut sim, nodes) = ScenarioBuilder::new(2)
            .loss_rate_at(SimTime::from_millis(100), 0, 1, 1.0)
            .build();

        sim.run_for(Duration::from_secs(1));
        let link = sim.topology().get_link(nodes[0], nodes[1]).unwrap();
        assert_eq!(link.loss_rate, 1.0);
    }

    #[test]
    fn test_unknown_indices_are_skipped() {
        let (mut sim, _) = ScenarioBuilder::new(2)
            .transmit_at(SimTime::from_millis(10), 9, vec![0x40])
            .disable_link_at(SimTime::from_millis(10), 0, 9)
            .build();

        let result = sim.run_for(Duration::from_secs(1));
        assert_eq!(result.metrics.app_commands, 0);
    }
}
