//! SimNode wrapper for simulated fireflies.

use std::cell::Cell;
use std::convert::Infallible;
use std::future::{ready, Ready};

use embassy_sync::channel::Channel;
use fireswarm::debug::DebugEvent;
use fireswarm::{
    Clock, Command, DefaultConfig, Frame, NeighborSet, Outbound, PeerAddress, Random,
    Swarm, SwarmMetrics, Timestamp, Transport, TransportInChannel, TransportOutChannel,
    DEFAULT_VIEW,
};

/// Vendor prefix used for every simulated radio address.
pub const SIM_ADDRESS_PREFIX: u32 = 0x0013_A200;

/// Payload limit of a simulated radio frame.
pub const SIM_MTU: usize = 84;

/// Channel-backed transport driven by the simulator.
pub struct SimTransport {
    mtu: usize,
    outgoing: TransportOutChannel,
    incoming: TransportInChannel,
}

impl SimTransport {
    pub fn new() -> Self {
        Self {
            mtu: SIM_MTU,
            outgoing: Channel::new(),
            incoming: Channel::new(),
        }
    }

    /// Inject a frame as if received from the radio.
    ///
    /// Returns false if the receive queue is full.
    pub fn inject_rx(&self, frame: Frame) -> bool {
        self.incoming.try_send(frame).is_ok()
    }

    /// Take all queued outgoing frames in send order.
    pub fn take_sent(&self) -> Vec<Outbound> {
        let mut frames = Vec::new();
        while let Ok(out) = self.outgoing.try_receive() {
            frames.push(out);
        }
        frames
    }
}

impl Default for SimTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for SimTransport {
    // Simulated radios always associate
    type Error = Infallible;

    fn mtu(&self) -> usize {
        self.mtu
    }

    fn outgoing(&self) -> &TransportOutChannel {
        &self.outgoing
    }

    fn incoming(&self) -> &TransportInChannel {
        &self.incoming
    }
}

/// Node-local clock.
///
/// Time is set externally by the simulator. Each node reads the simulation
/// time shifted by its own origin, so node clocks can start near the wrap point.
pub struct SimClock {
    current: Cell<Timestamp>,
}

impl SimClock {
    pub fn at(time: Timestamp) -> Self {
        Self {
            current: Cell::new(time),
        }
    }

    pub fn set(&self, time: Timestamp) {
        self.current.set(time);
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::at(Timestamp::ZERO)
    }
}

impl Clock for SimClock {
    type SleepFuture<'a> = Ready<()>;

    fn now(&self) -> Timestamp {
        self.current.get()
    }

    fn sleep_until(&self, _time: Timestamp) -> Self::SleepFuture<'_> {
        ready(())
    }
}

/// Deterministic random source (LCG).
pub struct SimRandom {
    state: u64,
}

impl SimRandom {
    pub fn with_seed(seed: u64) -> Self {
        Self { state: seed }
    }
}

impl Random for SimRandom {
    fn gen_range(&mut self, min: u64, max: u64) -> u64 {
        self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1);
        let range = max - min;
        if range == 0 {
            return min;
        }
        min + ((self.state >> 33) % range)
    }
}

/// Type alias for simulated nodes.
pub type SimSwarm = Swarm<SimTransport, SimRandom, SimClock, DefaultConfig, DEFAULT_VIEW>;

/// Wrapper around a fireswarm node for simulation.
pub struct SimNode {
    inner: SimSwarm,
    /// Application commands received, as (from, tag, body).
    received: Vec<(PeerAddress, u8, Vec<u8>)>,
    /// Reset commands received.
    resets_received: u32,
}

impl SimNode {
    /// Radio address of the node with the given serial number.
    pub fn address_for(serial: u32) -> PeerAddress {
        PeerAddress::from_parts(SIM_ADDRESS_PREFIX, serial)
    }

    /// Create a node with the given serial number and random seed.
    pub fn new(serial: u32, seed: u64, clock_at: Timestamp) -> Self {
        let inner = Swarm::new(
            Self::address_for(serial),
            SimTransport::new(),
            SimRandom::with_seed(seed),
            SimClock::at(clock_at),
        );
        Self {
            inner,
            received: Vec::new(),
            resets_received: 0,
        }
    }

    pub fn address(&self) -> PeerAddress {
        self.inner.address()
    }

    pub fn inner(&self) -> &SimSwarm {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut SimSwarm {
        &mut self.inner
    }

    pub fn neighbors(&self) -> &NeighborSet<DEFAULT_VIEW> {
        self.inner.neighbors()
    }

    pub fn view_size(&self) -> usize {
        self.inner.neighbors().len()
    }

    pub fn pending_sends(&self) -> u32 {
        self.inner.pending_sends()
    }

    pub fn metrics(&self) -> &SwarmMetrics {
        self.inner.metrics()
    }

    /// Application commands received so far.
    pub fn received(&self) -> &[(PeerAddress, u8, Vec<u8>)] {
        &self.received
    }

    pub fn resets_received(&self) -> u32 {
        self.resets_received
    }

    /// Associate and send the first presence announcement.
    pub fn start(&mut self, now: Timestamp) {
        self.inner.clock().set(now);
        match self.inner.start() {
            Ok(()) => {}
            Err(e) => log::error!("{}: {}", self.address(), e),
        }
    }

    /// One main-loop iteration: announce if due.
    pub fn handle_tick(&mut self, now: Timestamp) {
        self.inner.clock().set(now);
        self.inner.maybe_broadcast(now);
    }

    /// Hand one frame to the node and classify it.
    pub fn handle_frame(&mut self, frame: Frame, now: Timestamp) {
        self.inner.clock().set(now);
        if !self.inner.transport().inject_rx(frame) {
            log::warn!("{}: receive queue full", self.address());
            return;
        }
        match self.inner.try_poll() {
            Command::Other { from, tag, data } => {
                self.received.push((from, tag, data.to_vec()));
            }
            Command::Reset { .. } => self.resets_received += 1,
            _ => {}
        }
    }

    /// Fan a payload out to the current view.
    ///
    /// Returns the number of unicasts issued.
    pub fn transmit(&mut self, payload: &[u8], now: Timestamp) -> usize {
        self.inner.clock().set(now);
        match self.inner.transmit(payload) {
            Ok(n) => n,
            Err(e) => {
                log::warn!("{}: {}", self.address(), e);
                0
            }
        }
    }

    /// Take all outgoing frames from the transport.
    pub fn take_outgoing(&self) -> Vec<Outbound> {
        self.inner.transport().take_sent()
    }

    /// Take all debug events from the node's debug channel.
    pub fn take_debug_events(&self) -> Vec<DebugEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.inner.debug_channel().try_receive() {
            events.push(event);
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fireswarm::wire::{encode_command, presence_frame};

    #[test]
    fn test_simnode_creation() {
        let node = SimNode::new(7, 42, Timestamp::ZERO);
        assert_eq!(node.address(), PeerAddress::from_parts(SIM_ADDRESS_PREFIX, 7));
        assert_eq!(node.view_size(), 0);
        assert_eq!(node.pending_sends(), 0);
    }

    #[test]
    fn test_simnode_start_announces() {
        let mut node = SimNode::new(1, 42, Timestamp::ZERO);
        node.start(Timestamp::ZERO);

        let sent = node.take_outgoing();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].dest.is_broadcast());
        assert_eq!(sent[0].data, presence_frame());
    }

    #[test]
    fn test_simnode_records_commands() {
        let mut node = SimNode::new(1, 42, Timestamp::ZERO);
        let peer = SimNode::address_for(2);

        node.handle_frame(
            Frame::Data {
                from: peer,
                data: presence_frame(),
            },
            Timestamp::ZERO,
        );
        node.handle_frame(
            Frame::Data {
                from: peer,
                data: encode_command(0x40, b"hi"),
            },
            Timestamp::ZERO,
        );

        assert!(node.neighbors().contains(&peer));
        assert_eq!(node.received(), &[(peer, 0x40, b"hi".to_vec())]);
    }

    #[test]
    fn test_sim_random_is_deterministic() {
        let mut a = SimRandom::with_seed(9);
        let mut b = SimRandom::with_seed(9);
        for _ in 0..10 {
            let x = a.gen_range(0, 1000);
            assert_eq!(x, b.gen_range(0, 1000));
            assert!(x < 1000);
        }
    }
}
