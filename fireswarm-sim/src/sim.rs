//! Discrete event simulator for fireswarm networks.

use std::collections::BinaryHeap;

use fireswarm::{Duration, Frame, Outbound, PeerAddress, Timestamp};
use hashbrown::HashMap;

use crate::event::{Event, ScenarioAction, ScheduledEvent, SequenceNumber, SimTime};
use crate::metrics::{SimMetrics, SimulationResult, ViewSnapshot};
use crate::node::SimNode;
use crate::topology::Topology;

/// Default interval between two main-loop iterations of a node.
pub const DEFAULT_TICK: Duration = Duration::from_millis(100);

/// Time for a delivery report to reach the sender of a broadcast or a lost unicast.
pub const STATUS_DELAY: Duration = Duration::from_millis(1);

/// Discrete event simulator for fireswarm networks.
pub struct Simulator {
    /// All nodes in the simulation.
    nodes: HashMap<PeerAddress, SimNode>,
    /// Network topology.
    topology: Topology,
    /// Current simulation time.
    current_time: SimTime,
    /// Node clock reading at simulation time zero.
    clock_origin: Timestamp,
    /// Interval between node main-loop iterations.
    tick_interval: Duration,
    /// Priority queue of scheduled events.
    event_queue: BinaryHeap<ScheduledEvent>,
    /// Collected metrics.
    metrics: SimMetrics,
    /// Next sequence number for event ordering.
    next_seq: u64,
    /// Seed nodes derive their random sources from.
    seed: u64,
    /// RNG state for frame loss.
    rng_state: u64,
    /// Interval for automatic snapshots.
    snapshot_interval: Option<Duration>,
    /// Next snapshot time.
    next_snapshot: Option<SimTime>,
}

impl Simulator {
    /// Create a new simulator with given RNG seed.
    pub fn new(seed: u64) -> Self {
        Self {
            nodes: HashMap::new(),
            topology: Topology::new(),
            current_time: SimTime::ZERO,
            clock_origin: Timestamp::ZERO,
            tick_interval: DEFAULT_TICK,
            event_queue: BinaryHeap::new(),
            metrics: SimMetrics::new(),
            next_seq: 0,
            seed,
            rng_state: seed,
            snapshot_interval: None,
            next_snapshot: None,
        }
    }

    /// Set the network topology.
    pub fn with_topology(mut self, topology: Topology) -> Self {
        self.topology = topology;
        self
    }

    /// Set what node clocks read at simulation time zero.
    pub fn with_clock_origin(mut self, origin: Timestamp) -> Self {
        self.clock_origin = origin;
        self
    }

    /// Set the interval between node main-loop iterations.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Set the snapshot interval for automatic view recording.
    pub fn with_snapshot_interval(mut self, interval: Duration) -> Self {
        self.snapshot_interval = Some(interval);
        self.next_snapshot = Some(self.current_time + interval);
        self
    }

    /// Add and start a node with the given serial number.
    pub fn add_node(&mut self, serial: u32) -> PeerAddress {
        let seed = self
            .seed
            .wrapping_add(u64::from(serial).wrapping_mul(0x9E37_79B9_7F4A_7C15));
        let now = self.node_time();
        let mut node = SimNode::new(serial, seed, now);
        let address = node.address();

        node.start(now);
        self.nodes.insert(address, node);
        self.collect_outgoing(address);

        // Stagger main loops so nodes do not tick in lockstep
        let offset = Duration::from_millis(serial % self.tick_interval.as_millis());
        self.schedule(self.current_time + offset, Event::Tick { node: address });

        address
    }

    /// Get a reference to a node.
    pub fn node(&self, address: &PeerAddress) -> Option<&SimNode> {
        self.nodes.get(address)
    }

    /// Get a mutable reference to a node.
    pub fn node_mut(&mut self, address: &PeerAddress) -> Option<&mut SimNode> {
        self.nodes.get_mut(address)
    }

    /// All node addresses, in address order.
    pub fn node_addresses(&self) -> Vec<PeerAddress> {
        let mut addresses: Vec<PeerAddress> = self.nodes.keys().copied().collect();
        addresses.sort_by_key(|a| a.as_u64());
        addresses
    }

    /// Get the current simulation time.
    pub fn current_time(&self) -> SimTime {
        self.current_time
    }

    /// What node clocks read right now.
    pub fn node_time(&self) -> Timestamp {
        // Truncation is the wrap of the node clock
        self.clock_origin + Duration::from_millis(self.current_time.as_millis() as u32)
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn topology_mut(&mut self) -> &mut Topology {
        &mut self.topology
    }

    /// Get collected metrics.
    pub fn metrics(&self) -> &SimMetrics {
        &self.metrics
    }

    /// Schedule an event.
    pub fn schedule(&mut self, time: SimTime, event: Event) {
        let seq = SequenceNumber::new(self.next_seq);
        self.next_seq += 1;
        self.event_queue.push(ScheduledEvent::new(time, seq, event));
    }

    /// Schedule a scenario action.
    pub fn schedule_action(&mut self, time: SimTime, action: ScenarioAction) {
        self.schedule(time, Event::ScenarioAction(action));
    }

    /// Schedule an application fan-out from `from`.
    pub fn schedule_transmit(&mut self, time: SimTime, from: PeerAddress, payload: Vec<u8>) {
        self.schedule(time, Event::AppTransmit { from, payload });
    }

    /// Run simulation until specified time.
    pub fn run_until(&mut self, end_time: SimTime) -> SimulationResult {
        while self
            .event_queue
            .peek()
            .is_some_and(|event| event.time <= end_time)
        {
            let Some(event) = self.event_queue.pop() else {
                break;
            };
            self.advance_time(event.time);
            self.process_event(event.event);
            self.maybe_take_snapshot();
        }

        // Advance to end_time even if no more events
        self.advance_time(end_time);
        self.take_snapshot();

        SimulationResult {
            end_time: self.current_time,
            metrics: self.metrics.clone(),
            queue_exhausted: self.event_queue.peek().is_none(),
        }
    }

    /// Run simulation for specified duration.
    pub fn run_for(&mut self, duration: Duration) -> SimulationResult {
        self.run_until(self.current_time + duration)
    }

    /// Run until event queue is empty or max events processed.
    pub fn run_events(&mut self, max_events: usize) -> SimulationResult {
        let mut processed = 0;

        while let Some(event) = self.event_queue.pop() {
            self.advance_time(event.time);
            self.process_event(event.event);

            processed += 1;
            if processed >= max_events {
                break;
            }

            self.maybe_take_snapshot();
        }

        self.take_snapshot();

        SimulationResult {
            end_time: self.current_time,
            metrics: self.metrics.clone(),
            queue_exhausted: self.event_queue.is_empty(),
        }
    }

    fn advance_time(&mut self, time: SimTime) {
        if time > self.current_time {
            self.current_time = time;
        }
    }

    fn process_event(&mut self, event: Event) {
        match event {
            Event::FrameDelivery { to, from, data } => {
                self.deliver(to, Frame::Data { from, data });
            }
            Event::TxStatus { to, delivered } => {
                self.metrics.status_reports += 1;
                self.deliver(to, Frame::TxStatus { delivered });
            }
            Event::Tick { node } => {
                self.tick(node);
            }
            Event::AppTransmit { from, payload } => {
                self.app_transmit(from, payload);
            }
            Event::ScenarioAction(action) => {
                self.execute_action(action);
            }
        }
    }

    /// Hand a frame to a node and count what it surfaced.
    fn deliver(&mut self, to: PeerAddress, frame: Frame) {
        let now = self.node_time();
        let is_data = matches!(frame, Frame::Data { .. });
        if let Some(node) = self.nodes.get_mut(&to) {
            let before = node.received().len();
            node.handle_frame(frame, now);
            if is_data {
                self.metrics.frames_delivered += 1;
            }
            self.metrics.app_commands += (node.received().len() - before) as u64;
        }
        self.collect_outgoing(to);
    }

    fn tick(&mut self, address: PeerAddress) {
        let now = self.node_time();
        let Some(node) = self.nodes.get_mut(&address) else {
            return;
        };
        node.handle_tick(now);
        self.collect_outgoing(address);

        let next = self.current_time + self.tick_interval;
        self.schedule(next, Event::Tick { node: address });
    }

    fn app_transmit(&mut self, from: PeerAddress, payload: Vec<u8>) {
        let now = self.node_time();
        if let Some(node) = self.nodes.get_mut(&from) {
            node.transmit(&payload, now);
        }
        self.collect_outgoing(from);
    }

    /// Collect outgoing frames from a node and route them.
    fn collect_outgoing(&mut self, sender: PeerAddress) {
        let frames = match self.nodes.get(&sender) {
            Some(node) => node.take_outgoing(),
            None => return,
        };

        for frame in frames {
            self.route(sender, frame);
        }
    }

    /// Put one frame on air and schedule its receptions and delivery report.
    fn route(&mut self, sender: PeerAddress, frame: Outbound) {
        self.metrics.frames_sent += 1;
        let now = self.current_time;

        if frame.dest.is_broadcast() {
            for neighbor in self.topology.neighbors(sender) {
                if let Some(delay) = self.try_link(sender, neighbor) {
                    self.schedule(
                        now + delay,
                        Event::FrameDelivery {
                            to: neighbor,
                            from: sender,
                            data: frame.data.clone(),
                        },
                    );
                }
            }
            // Broadcasts are unacknowledged; the radio reports them as sent
            self.schedule(
                now + STATUS_DELAY,
                Event::TxStatus {
                    to: sender,
                    delivered: true,
                },
            );
            return;
        }

        match self.try_link(sender, frame.dest) {
            Some(delay) => {
                self.schedule(
                    now + delay,
                    Event::FrameDelivery {
                        to: frame.dest,
                        from: sender,
                        data: frame.data,
                    },
                );
                self.schedule(
                    now + delay,
                    Event::TxStatus {
                        to: sender,
                        delivered: true,
                    },
                );
            }
            None => {
                log::trace!("unicast {} -> {} lost", sender, frame.dest);
                self.schedule(
                    now + STATUS_DELAY,
                    Event::TxStatus {
                        to: sender,
                        delivered: false,
                    },
                );
            }
        }
    }

    /// Link delay if a frame from `from` reaches `to`, `None` if it is lost.
    fn try_link(&mut self, from: PeerAddress, to: PeerAddress) -> Option<Duration> {
        let (active, loss_rate, delay) = match self.topology.get_link(from, to) {
            Some(link) => (link.active, link.loss_rate, link.delay),
            None => (false, 0.0, Duration::ZERO),
        };

        if !active || (loss_rate > 0.0 && self.random_f64() < loss_rate) {
            self.metrics.frames_dropped += 1;
            return None;
        }
        Some(delay)
    }

    fn execute_action(&mut self, action: ScenarioAction) {
        match action {
            ScenarioAction::Partition { groups } => {
                self.topology.partition(&groups);
            }
            ScenarioAction::HealPartition => {
                self.topology.heal();
            }
            ScenarioAction::DisableLink { from, to } => {
                if let Some(link) = self.topology.get_link_mut(from, to) {
                    link.active = false;
                }
            }
            ScenarioAction::EnableLink { from, to } => {
                if let Some(link) = self.topology.get_link_mut(from, to) {
                    link.active = true;
                }
            }
            ScenarioAction::SetLossRate { from, to, rate } => {
                if let Some(link) = self.topology.get_link_mut(from, to) {
                    link.loss_rate = rate.clamp(0.0, 1.0);
                }
            }
            ScenarioAction::TakeSnapshot => {
                self.take_snapshot();
            }
        }
    }

    fn maybe_take_snapshot(&mut self) {
        if let Some(next) = self.next_snapshot {
            if self.current_time >= next {
                self.take_snapshot();
                if let Some(interval) = self.snapshot_interval {
                    self.next_snapshot = Some(next + interval);
                }
            }
        }
    }

    /// Record every node's view and pending count.
    pub fn take_snapshot(&mut self) {
        let mut snapshot = ViewSnapshot::new(self.current_time);

        for (&address, node) in &self.nodes {
            snapshot.record_node(
                address,
                node.neighbors().as_slice().to_vec(),
                node.pending_sends(),
            );
        }

        self.metrics.add_snapshot(snapshot);
    }

    /// Generate a random f64 in [0, 1).
    fn random_f64(&mut self) -> f64 {
        self.rng_state = self
            .rng_state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1);
        (self.rng_state >> 11) as f64 / (1u64 << 53) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::Link;
    use fireswarm::wire::{encode_command, reset_frame};

    fn pair() -> (PeerAddress, PeerAddress) {
        (SimNode::address_for(1), SimNode::address_for(2))
    }

    fn connected_pair() -> (Simulator, PeerAddress, PeerAddress) {
        let (a, b) = pair();
        let mut sim = Simulator::new(42).with_topology(Topology::fully_connected(&[a, b]));
        sim.add_node(1);
        sim.add_node(2);
        (sim, a, b)
    }

    #[test]
    fn test_simulator_creation() {
        let sim = Simulator::new(42);
        assert_eq!(sim.current_time(), SimTime::ZERO);
        assert!(sim.node_addresses().is_empty());
    }

    #[test]
    fn test_add_nodes() {
        let mut sim = Simulator::new(42);
        let n1 = sim.add_node(1);
        let n2 = sim.add_node(2);

        assert_ne!(n1, n2);
        assert_eq!(sim.node_addresses(), vec![n1, n2]);
        assert!(sim.node(&n1).is_some());
    }

    #[test]
    fn test_isolated_node_stays_alone() {
        let mut sim = Simulator::new(42);
        let n1 = sim.add_node(1);

        let result = sim.run_for(Duration::from_secs(1));

        let node = sim.node(&n1).unwrap();
        assert_eq!(node.view_size(), 0);
        assert_eq!(node.metrics().presence_sent, 1);
        assert_eq!(result.metrics.frames_sent, 1);
        assert_eq!(result.metrics.frames_delivered, 0);
    }

    #[test]
    fn test_two_nodes_discover_each_other() {
        let (mut sim, a, b) = connected_pair();
        sim.run_for(Duration::from_secs(1));

        assert!(sim.node(&a).unwrap().neighbors().contains(&b));
        assert!(sim.node(&b).unwrap().neighbors().contains(&a));
    }

    #[test]
    fn test_pending_drains_after_reports() {
        let (mut sim, a, b) = connected_pair();
        sim.schedule_transmit(SimTime::from_secs(1), a, encode_command(0x40, b"go"));
        let result = sim.run_for(Duration::from_secs(5));

        // One broadcast each, one unicast from a, every report returned
        assert_eq!(sim.node(&a).unwrap().pending_sends(), 0);
        assert_eq!(sim.node(&b).unwrap().pending_sends(), 0);
        assert_eq!(result.metrics.status_reports, 3);
        assert_eq!(result.metrics.app_commands, 1);
        assert_eq!(
            sim.node(&b).unwrap().received(),
            &[(a, 0x40, b"go".to_vec())]
        );
    }

    #[test]
    fn test_unicast_over_dead_link_reports_failure() {
        let (mut sim, a, b) = connected_pair();
        sim.schedule_action(
            SimTime::from_millis(500),
            ScenarioAction::DisableLink { from: a, to: b },
        );
        sim.schedule_transmit(SimTime::from_secs(1), a, encode_command(0x40, &[]));
        let result = sim.run_for(Duration::from_secs(2));

        let node = sim.node(&a).unwrap();
        assert_eq!(node.metrics().status_failed, 1);
        assert_eq!(node.pending_sends(), 0);
        assert_eq!(result.metrics.app_commands, 0);
        assert_eq!(result.metrics.frames_dropped, 1);
    }

    #[test]
    fn test_reset_empties_receiver_view() {
        let (mut sim, a, b) = connected_pair();
        sim.schedule_transmit(SimTime::from_secs(1), a, reset_frame());
        sim.run_for(Duration::from_secs(2));

        let node_b = sim.node(&b).unwrap();
        assert_eq!(node_b.resets_received(), 1);
        // b has not heard a again yet: next presence is one spread delay out
        assert_eq!(node_b.view_size(), 0);
        assert!(sim.node(&a).unwrap().neighbors().contains(&b));
    }

    #[test]
    fn test_lossy_link_drops_everything() {
        let (a, b) = pair();
        let mut topo = Topology::new();
        topo.add_link(a, b, Link::new().with_loss_rate(1.0));
        let mut sim = Simulator::new(7).with_topology(topo);
        sim.add_node(1);
        sim.add_node(2);

        let result = sim.run_for(Duration::from_secs(1));
        assert_eq!(result.metrics.frames_delivered, 0);
        assert_eq!(result.metrics.frames_dropped, 2);
        assert_eq!(sim.node(&a).unwrap().view_size(), 0);
    }

    #[test]
    fn test_presence_rate_across_clock_wrap() {
        let (a, b) = pair();
        let mut sim = Simulator::new(42)
            .with_topology(Topology::fully_connected(&[a, b]))
            .with_clock_origin(Timestamp::from_millis(u32::MAX - 5_000));
        sim.add_node(1);
        sim.add_node(2);

        sim.run_for(Duration::from_secs(60));

        // Node 1 ticks at 1ms past every 100ms; announcements at 0, 10.001s, ... 50.001s
        assert_eq!(sim.node(&a).unwrap().metrics().presence_sent, 6);
        assert!(sim.node(&a).unwrap().neighbors().contains(&b));
    }

    #[test]
    fn test_schedule_action() {
        let (mut sim, a, b) = connected_pair();

        sim.schedule_action(
            SimTime::from_millis(500),
            ScenarioAction::Partition {
                groups: vec![vec![a], vec![b]],
            },
        );
        sim.run_for(Duration::from_secs(1));

        assert!(!sim.topology().is_connected(a, b));
    }

    #[test]
    fn test_snapshots_record_views() {
        let (a, b) = pair();
        let mut sim = Simulator::new(42)
            .with_topology(Topology::fully_connected(&[a, b]))
            .with_snapshot_interval(Duration::from_millis(500));
        sim.add_node(1);
        sim.add_node(2);

        let result = sim.run_for(Duration::from_secs(2));
        assert!(result.metrics.snapshots.len() >= 4);
        let last = result.metrics.latest_snapshot().unwrap();
        assert!(last.knows(a, b));
        assert!(last.knows(b, a));
        assert!(result.all_discovered());
    }
}
