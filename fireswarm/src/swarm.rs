//! Swarm context - all state of one firefly.
//!
//! The Swarm struct owns the neighbor view, the pending-send count, the spread
//! timer and the injected transport, random source and clock. It has no
//! background activity: the caller drives it from one loop.
//!
//! # Usage
//!
//! ```ignore
//! let mut swarm = Swarm::<_, _, _, DefaultConfig>::new(address, transport, random, clock);
//! swarm.start()?; // escalate Error::Association to the device error handler
//!
//! loop {
//!     match swarm.step(Duration::from_millis(200)).await {
//!         Command::Other { tag, data, .. } => app.handle(tag, data),
//!         Command::Reset { .. } => app.on_reset(),
//!         _ => {}
//!     }
//! }
//! ```
//!
//! The behavior is split across modules:
//! - [`spread`](crate::spread) - presence announcements and unicast fan-out
//! - [`dispatch`](crate::dispatch) - inbound frame classification

use core::marker::PhantomData;

use alloc::vec::Vec;

use crate::config::{DefaultConfig, SwarmConfig, DEFAULT_VIEW};
use crate::neighbor::NeighborSet;
use crate::spread::SpreadTimer;
use crate::time::{Duration, Timestamp};
use crate::tracker::PendingSends;
use crate::traits::{Clock, Random, Transport};
use crate::types::{Command, Error, Payload, PeerAddress, SwarmMetrics};

/// One firefly.
///
/// Generic over:
/// - `T`: Transport implementation
/// - `R`: Random number generator
/// - `Clk`: Clock implementation
/// - `C`: Compile-time tunables
/// - `VIEW`: Neighbor-view capacity
pub struct Swarm<T, R, Clk, C = DefaultConfig, const VIEW: usize = DEFAULT_VIEW> {
    // Dependencies (injected)
    transport: T,
    random: R,
    clock: Clk,

    address: PeerAddress,

    neighbors: NeighborSet<VIEW>,
    pending: PendingSends,
    spread: SpreadTimer,

    /// Bytes of the last data frame; `Command::Other` borrows from here.
    rx: Payload,

    metrics: SwarmMetrics,

    #[cfg(any(test, feature = "debug"))]
    debug: crate::debug::DebugChannel,

    _config: PhantomData<C>,
}

impl<T, R, Clk, C, const VIEW: usize> Swarm<T, R, Clk, C, VIEW>
where
    T: Transport,
    R: Random,
    Clk: Clock,
    C: SwarmConfig,
{
    /// Create a node with an empty view that has never announced itself.
    pub fn new(address: PeerAddress, transport: T, random: R, clock: Clk) -> Self {
        Self {
            transport,
            random,
            clock,

            address,

            neighbors: NeighborSet::new(),
            pending: PendingSends::new(),
            spread: SpreadTimer::new(),

            rx: Vec::new(),

            metrics: SwarmMetrics::new(),

            #[cfg(any(test, feature = "debug"))]
            debug: embassy_sync::channel::Channel::new(),

            _config: PhantomData,
        }
    }

    /// Join the network and send the first presence announcement.
    ///
    /// An association failure is returned as-is; the node does not retry.
    pub fn start(&mut self) -> Result<(), Error<T::Error>> {
        if let Err(e) = self.transport.associate() {
            log::error!("radio association failed: {:?}", e);
            return Err(Error::Association(e));
        }
        log::info!("firefly {} associated", self.address);

        let now = self.clock.now();
        self.maybe_broadcast(now);
        Ok(())
    }

    /// One iteration of the caller's loop: announce if due, then poll.
    pub async fn step(&mut self, timeout: Duration) -> Command<'_> {
        let now = self.clock.now();
        self.maybe_broadcast(now);
        self.poll(timeout).await
    }

    /// Clear the neighbor view locally.
    pub fn reset_view(&mut self) {
        self.neighbors.reset();
    }

    /// This node's radio address.
    pub fn address(&self) -> PeerAddress {
        self.address
    }

    /// Current neighbor view.
    pub fn neighbors(&self) -> &NeighborSet<VIEW> {
        &self.neighbors
    }

    /// Sends still awaiting a delivery report.
    pub fn pending_sends(&self) -> u32 {
        self.pending.get()
    }

    /// When the last presence announcement went out, if ever.
    pub fn last_spread(&self) -> Option<Timestamp> {
        self.spread.last()
    }

    /// Earliest time the next presence announcement may go out.
    ///
    /// `None` means one is due right away.
    pub fn next_spread(&self) -> Option<Timestamp> {
        self.spread.next_due(C::SPREAD_DELAY)
    }

    /// Traffic and membership counters.
    pub fn metrics(&self) -> &SwarmMetrics {
        &self.metrics
    }

    /// Get the transport reference.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Get the clock reference.
    pub fn clock(&self) -> &Clk {
        &self.clock
    }

    /// Get the current timestamp from the clock.
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Channel receiving debug events.
    #[cfg(any(test, feature = "debug"))]
    pub fn debug_channel(&self) -> &crate::debug::DebugChannel {
        &self.debug
    }

    // --- Internal accessors for other modules ---

    pub(crate) fn neighbors_mut(&mut self) -> &mut NeighborSet<VIEW> {
        &mut self.neighbors
    }

    /// Offer `peer` to the view using the configured retention probability.
    pub(crate) fn offer_peer(&mut self, peer: PeerAddress) -> crate::neighbor::Admission {
        self.neighbors
            .admit(peer, C::ADMIT_PERMILLE, &mut self.random)
    }

    pub(crate) fn pending_mut(&mut self) -> &mut PendingSends {
        &mut self.pending
    }

    pub(crate) fn spread_timer(&self) -> &SpreadTimer {
        &self.spread
    }

    pub(crate) fn spread_mut(&mut self) -> &mut SpreadTimer {
        &mut self.spread
    }

    pub(crate) fn metrics_mut(&mut self) -> &mut SwarmMetrics {
        &mut self.metrics
    }

    /// Store a received frame and borrow its bytes after the tag.
    pub(crate) fn store_rx(&mut self, data: Payload) -> &[u8] {
        self.rx = data;
        self.rx.get(1..).unwrap_or(&[])
    }

    /// Queue one frame. Every attempt counts as pending, even a refused one.
    ///
    /// Returns false if the transport queue was full.
    pub(crate) fn send(&mut self, dest: PeerAddress, data: Payload) -> bool {
        self.pending.record_send();

        if self
            .transport
            .outgoing()
            .try_send(crate::types::Outbound { dest, data })
            .is_err()
        {
            self.metrics.sends_dropped += 1;
            log::warn!("transport queue full, frame to {} dropped", dest);
            emit_debug!(self, crate::debug::DebugEvent::SendDropped { dest });
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::test_impls::{MockClock, MockLinkError, MockRandom, MockTransport};
    use crate::wire::TAG_PRESENCE;

    type TestSwarm = Swarm<MockTransport, MockRandom, MockClock>;

    fn me() -> PeerAddress {
        PeerAddress::from_parts(0x0013_A200, 0x0000_0001)
    }

    #[test]
    fn test_new_swarm_is_idle() {
        let swarm: TestSwarm =
            Swarm::new(me(), MockTransport::new(), MockRandom::new(), MockClock::new());

        assert_eq!(swarm.address(), me());
        assert!(swarm.neighbors().is_empty());
        assert_eq!(swarm.neighbors().capacity(), DEFAULT_VIEW);
        assert_eq!(swarm.pending_sends(), 0);
        assert_eq!(swarm.last_spread(), None);
        assert_eq!(swarm.next_spread(), None);
        assert!(swarm.transport().take_sent().is_empty());
    }

    #[test]
    fn test_start_announces_presence() {
        let clock = MockClock::at(Timestamp::from_millis(1234));
        let mut swarm: TestSwarm = Swarm::new(me(), MockTransport::new(), MockRandom::new(), clock);

        assert_eq!(swarm.start(), Ok(()));

        let sent = swarm.transport().take_sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].dest, PeerAddress::BROADCAST);
        assert_eq!(sent[0].data, alloc::vec![TAG_PRESENCE]);
        assert_eq!(swarm.pending_sends(), 1);
        assert_eq!(swarm.last_spread(), Some(Timestamp::from_millis(1234)));
    }

    #[test]
    fn test_start_reports_association_failure() {
        let mut swarm: TestSwarm = Swarm::new(
            me(),
            MockTransport::unassociated(),
            MockRandom::new(),
            MockClock::new(),
        );

        assert_eq!(
            swarm.start(),
            Err(Error::Association(MockLinkError::NoResponse))
        );
        // Nothing was sent and no state changed
        assert!(swarm.transport().take_sent().is_empty());
        assert_eq!(swarm.pending_sends(), 0);
        assert_eq!(swarm.last_spread(), None);
    }

    #[test]
    fn test_independent_instances() {
        let mut a: TestSwarm =
            Swarm::new(me(), MockTransport::new(), MockRandom::new(), MockClock::new());
        let b: TestSwarm = Swarm::new(
            PeerAddress::from_parts(0x0013_A200, 2),
            MockTransport::new(),
            MockRandom::new(),
            MockClock::new(),
        );

        a.start().unwrap();
        assert_eq!(a.pending_sends(), 1);
        assert_eq!(b.pending_sends(), 0);
        assert!(b.transport().take_sent().is_empty());
    }

    #[test]
    fn test_send_counts_refused_frames() {
        let mut swarm: TestSwarm =
            Swarm::new(me(), MockTransport::new(), MockRandom::new(), MockClock::new());
        let dest = PeerAddress::from_parts(0x0013_A200, 9);

        for _ in 0..crate::traits::TRANSPORT_QUEUE_SIZE {
            assert!(swarm.send(dest, alloc::vec![0x40]));
        }
        assert!(!swarm.send(dest, alloc::vec![0x40]));

        assert_eq!(swarm.pending_sends(), crate::traits::TRANSPORT_QUEUE_SIZE as u32 + 1);
        assert_eq!(swarm.metrics().sends_dropped, 1);
        assert_eq!(
            swarm.debug_channel().try_receive(),
            Ok(crate::debug::DebugEvent::SendDropped { dest })
        );
    }
}
