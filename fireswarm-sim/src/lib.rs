//! fireswarm-sim - Discrete event network simulator for fireswarm nodes.
//!
//! Runs many fireflies in one process against a simulated radio, without
//! real-time delays.
//!
//! # Features
//!
//! - **Discrete event simulation**: No real-time delays, deterministic ordering
//! - **Multiple nodes in single process**: Every node is an independent `Swarm`
//! - **Configurable topology**: Fully connected, chain, star, or custom topologies
//! - **Link properties**: Frame loss and delay per link
//! - **Delivery reports**: Every send is answered by a status frame, as a radio would
//! - **Scenario builder**: Scheduled partitions, link failures, application traffic
//! - **Metrics collection**: View snapshots, frame counts, discovery time
//!
//! # Example
//!
//! ```
//! use fireswarm_sim::{Duration, ScenarioBuilder};
//!
//! // Create a 5-node network and run for 10 seconds
//! let result = ScenarioBuilder::new(5)
//!     .with_seed(42)
//!     .run_for(Duration::from_secs(10));
//!
//! // Every node heard at least one other
//! assert!(result.all_discovered());
//! ```
//!
//! # Architecture
//!
//! The simulator uses a priority queue of events ordered by (time, sequence_number).
//! The main loop:
//! 1. Pop next event from queue
//! 2. Advance simulation time
//! 3. Process event (tick, frame reception, delivery report, application send)
//! 4. Collect outgoing frames
//! 5. Route through topology, schedule receptions and delivery reports
//!
//! Nodes are driven through their synchronous entry points (`maybe_broadcast`,
//! `try_poll`, `transmit`) instead of the async `step` loop.

pub mod event;
pub mod metrics;
pub mod node;
pub mod scenario;
pub mod sim;
pub mod topology;

// Re-export main types
pub use event::{Event, ScenarioAction, ScheduledEvent, SimTime};
pub use fireswarm::{Duration, PeerAddress, Timestamp};
pub use metrics::{SimMetrics, SimulationResult, ViewSnapshot};
pub use node::SimNode;
pub use scenario::{simple_scenario, ScenarioBuilder};
pub use sim::Simulator;
pub use topology::{Link, Topology};

#[cfg(test)]
mod tests {
    use super::*;
    use fireswarm::debug::DebugEvent;
    use fireswarm::wire::reset_frame;
    use fireswarm::{SwarmConfig, DEFAULT_VIEW};

    #[test]
    fn test_single_node_has_empty_view() {
        let result = ScenarioBuilder::new(1)
            .with_seed(42)
            .run_for(Duration::from_secs(5));

        let snapshot = result.metrics.latest_snapshot().unwrap();
        assert_eq!(snapshot.max_view_size(), 0);
        assert!(!result.all_discovered());
    }

    #[test]
    fn test_small_network_everyone_knows_everyone() {
        // Below view capacity admission is lossless
        let (mut sim, nodes) = ScenarioBuilder::new(5).with_seed(1).build();
        let result = sim.run_for(Duration::from_secs(1));

        let snapshot = result.metrics.latest_snapshot().unwrap();
        for &a in &nodes {
            for &b in &nodes {
                if a != b {
                    assert!(snapshot.knows(a, b), "{} does not know {}", a, b);
                }
            }
        }
        assert_eq!(result.final_min_view_size(), 4);
    }

    #[test]
    fn test_dense_network_views_stay_bounded() {
        let (mut sim, nodes) = ScenarioBuilder::new(20)
            .with_seed(3)
            .with_snapshot_interval(Duration::from_secs(5))
            .build();
        let result = sim.run_for(Duration::from_secs(60));

        for snapshot in &result.metrics.snapshots {
            assert!(snapshot.max_view_size() <= DEFAULT_VIEW);
            for view in snapshot.views.values() {
                let mut sorted: Vec<u64> = view.iter().map(|a| a.as_u64()).collect();
                sorted.sort_unstable();
                sorted.dedup();
                assert_eq!(sorted.len(), view.len(), "duplicate in view");
            }
        }
        assert_eq!(result.final_min_view_size(), DEFAULT_VIEW);

        // Replacement happened somewhere once views filled up
        let replaced: u32 = nodes
            .iter()
            .map(|n| sim.node(n).unwrap().metrics().peers_replaced)
            .sum();
        assert!(replaced > 0);
    }

    #[test]
    fn test_chain_nodes_only_know_adjacent() {
        let (mut sim, nodes) = ScenarioBuilder::new(5)
            .with_seed(42)
            .chain_topology()
            .build();
        let result = sim.run_for(Duration::from_secs(30));

        let snapshot = result.metrics.latest_snapshot().unwrap();
        assert_eq!(snapshot.view_size(nodes[0]), 1);
        assert_eq!(snapshot.view_size(nodes[2]), 2);
        assert!(snapshot.knows(nodes[2], nodes[1]));
        assert!(snapshot.knows(nodes[2], nodes[3]));
        assert!(!snapshot.knows(nodes[0], nodes[2]));
    }

    #[test]
    fn test_star_hub_sees_all_spokes() {
        let (mut sim, nodes) = ScenarioBuilder::new(6).star_topology().build();
        let hub = nodes[0];
        assert_eq!(sim.topology().neighbors(hub).len(), 5);

        sim.run_for(Duration::from_secs(20));

        assert_eq!(sim.node(&hub).unwrap().view_size(), 5);
        for spoke in &nodes[1..] {
            assert_eq!(sim.node(spoke).unwrap().neighbors().as_slice(), &[hub]);
        }
    }

    #[test]
    fn test_reset_then_rediscovery() {
        let delay = <fireswarm::DefaultConfig as SwarmConfig>::SPREAD_DELAY;
        let (mut sim, nodes) = ScenarioBuilder::new(3)
            .transmit_at(SimTime::from_secs(2), 0, reset_frame())
            .build();

        sim.run_for(Duration::from_secs(3));
        for peer in &nodes[1..] {
            let node = sim.node(peer).unwrap();
            assert_eq!(node.resets_received(), 1);
            // The whole view is dropped, not just the sender
            assert_eq!(node.view_size(), 0);
        }

        // The next round of announcements refills every view
        sim.run_for(delay);
        for peer in &nodes[1..] {
            assert_eq!(sim.node(peer).unwrap().view_size(), 2);
        }
    }

    #[test]
    fn test_partition_then_heal_rediscovers() {
        let builder = ScenarioBuilder::new(4);
        let addrs = builder.addresses();
        let mut topo = Topology::fully_connected(&addrs);
        topo.partition(&[vec![addrs[0], addrs[1]], vec![addrs[2], addrs[3]]]);
        let (mut sim, nodes) = builder
            .topology(topo)
            .heal_at(SimTime::from_secs(5))
            .build();

        let result = sim.run_for(Duration::from_secs(4));
        let snapshot = result.metrics.latest_snapshot().unwrap();
        assert!(snapshot.knows(nodes[0], nodes[1]));
        assert!(!snapshot.knows(nodes[0], nodes[2]));

        let result = sim.run_for(Duration::from_secs(12));
        let snapshot = result.metrics.latest_snapshot().unwrap();
        assert!(snapshot.knows(nodes[0], nodes[2]));
        assert!(snapshot.knows(nodes[3], nodes[1]));
    }

    #[test]
    fn test_debug_events_are_observable() {
        let (mut sim, nodes) = ScenarioBuilder::new(2).build();
        sim.run_for(Duration::from_secs(1));

        let events = sim.node(&nodes[0]).unwrap().take_debug_events();
        assert!(matches!(events.first(), Some(DebugEvent::PresenceSent { .. })));
        assert!(events.contains(&DebugEvent::PeerAdmitted {
            peer: nodes[1],
            view_size: 1,
        }));
    }
}
