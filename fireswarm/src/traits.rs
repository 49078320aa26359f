//! Core traits for transport, time, and randomness abstraction.
//!
//! These traits let the swarm logic run against:
//! - Radio modules (XBee-style API mode, LoRa, BLE) or a simulator
//! - Real hardware time or simulated time
//! - Hardware or deterministic random sources

use core::fmt::Debug;
use core::future::Future;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

use crate::time::Timestamp;
use crate::types::{Frame, Outbound};

/// Queue size for transport channels.
pub const TRANSPORT_QUEUE_SIZE: usize = 16;

/// Mutex type used for channels.
pub(crate) type ChannelMutex = CriticalSectionRawMutex;

/// Received, classified frames.
pub type TransportInChannel = Channel<ChannelMutex, Frame, TRANSPORT_QUEUE_SIZE>;

/// Frames waiting to be put on air.
pub type TransportOutChannel = Channel<ChannelMutex, Outbound, TRANSPORT_QUEUE_SIZE>;

/// Transport trait for radio backends.
///
/// The transport owns framing, addressing and frame classification. It
/// exposes two channels:
/// - `outgoing()`: the node queues [`Outbound`] frames, the radio task sends them
/// - `incoming()`: the radio RX path pushes classified [`Frame`]s, the node polls them
///
/// Broadcasts are unacknowledged. Every send, broadcast or unicast, is
/// expected to be answered later by one [`Frame::TxStatus`], but the
/// transport may lose or duplicate those.
///
/// # Usage Contract
///
/// - Radio ISR → `transport.incoming().try_send(frame)`
/// - Swarm → `transport.outgoing().try_send(outbound)`
/// - Transmit task → `transport.outgoing().receive().await`
pub trait Transport {
    /// Error reported when the radio cannot join the network.
    type Error: Debug;

    /// Largest payload one frame can carry.
    fn mtu(&self) -> usize;

    /// Join the network (e.g. query the module's association state).
    ///
    /// Called once by [`Swarm::start`](crate::Swarm::start). A failure is
    /// final: the node does not retry and the caller escalates.
    fn associate(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Channel for frames to transmit.
    fn outgoing(&self) -> &TransportOutChannel;

    /// Channel for received frames.
    fn incoming(&self) -> &TransportInChannel;
}

/// Time source trait for real or simulated time.
///
/// # Example (testing with MockClock)
///
/// ```ignore
/// use fireswarm::traits::test_impls::MockClock;
/// use fireswarm::{Clock, Duration, Timestamp};
///
/// let clock = MockClock::new();
/// assert_eq!(clock.now(), Timestamp::ZERO);
///
/// clock.advance(Duration::from_secs(10));
/// assert_eq!(clock.now(), Timestamp::from_secs(10));
/// ```
///
/// # Example (embedded with embassy)
///
/// ```text
/// struct EmbassyClock;
///
/// impl Clock for EmbassyClock {
///     type SleepFuture<'a> = embassy_time::Timer;
///
///     fn now(&self) -> Timestamp {
///         Timestamp::from_millis(embassy_time::Instant::now().as_millis() as u32)
///     }
///
///     fn sleep_until(&self, time: Timestamp) -> Self::SleepFuture<'_> {
///         let wait = time.elapsed_since(self.now());
///         embassy_time::Timer::after_millis(wait.as_millis() as u64)
///     }
/// }
/// ```
pub trait Clock {
    /// Future type returned by sleep_until.
    type SleepFuture<'a>: Future<Output = ()>
    where
        Self: 'a;

    /// Get the current timestamp.
    fn now(&self) -> Timestamp;

    /// Sleep until the given timestamp.
    fn sleep_until(&self, time: Timestamp) -> Self::SleepFuture<'_>;
}

/// Random number generator trait.
///
/// Used for the retention draw when the neighbor view is full.
pub trait Random {
    /// Generate a random u64 in the range [min, max).
    fn gen_range(&mut self, min: u64, max: u64) -> u64;
}

#[cfg(any(test, feature = "test-support"))]
pub mod test_impls {
    //! Mock implementations of traits for unit testing and doc tests.
    //!
    //! Available when running tests or with the `test-support` feature enabled.

    use alloc::vec::Vec;
    use core::cell::Cell;
    use core::future::{ready, Ready};

    use super::*;
    use crate::time::Duration;
    use crate::types::{Payload, PeerAddress};

    /// Association failure reported by [`MockTransport`].
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum MockLinkError {
        NoResponse,
    }

    /// Mock transport backed by two channels.
    pub struct MockTransport {
        mtu: usize,
        associates: bool,
        outgoing: TransportOutChannel,
        incoming: TransportInChannel,
    }

    impl Default for MockTransport {
        fn default() -> Self {
            Self {
                mtu: 84,
                associates: true,
                outgoing: Channel::new(),
                incoming: Channel::new(),
            }
        }
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_mtu(mtu: usize) -> Self {
            Self {
                mtu,
                ..Self::default()
            }
        }

        /// A transport whose radio never answers the association query.
        pub fn unassociated() -> Self {
            Self {
                associates: false,
                ..Self::default()
            }
        }

        /// Inject a classified frame as if it was received.
        pub fn inject(&self, frame: Frame) {
            let _ = self.incoming.try_send(frame);
        }

        /// Inject a data frame from `from`.
        pub fn inject_data(&self, from: PeerAddress, data: Payload) {
            self.inject(Frame::Data { from, data });
        }

        /// Inject a delivery report.
        pub fn inject_status(&self, delivered: bool) {
            self.inject(Frame::TxStatus { delivered });
        }

        /// Take all queued outgoing frames in send order.
        pub fn take_sent(&self) -> Vec<Outbound> {
            let mut sent = Vec::new();
            while let Ok(out) = self.outgoing.try_receive() {
                sent.push(out);
            }
            sent
        }
    }

    impl Transport for MockTransport {
        type Error = MockLinkError;

        fn mtu(&self) -> usize {
            self.mtu
        }

        fn associate(&mut self) -> Result<(), MockLinkError> {
            if self.associates {
                Ok(())
            } else {
                Err(MockLinkError::NoResponse)
            }
        }

        fn outgoing(&self) -> &TransportOutChannel {
            &self.outgoing
        }

        fn incoming(&self) -> &TransportInChannel {
            &self.incoming
        }
    }

    /// Mock clock for testing (synchronous, time advances manually).
    pub struct MockClock {
        current: Cell<Timestamp>,
    }

    impl Default for MockClock {
        fn default() -> Self {
            Self {
                current: Cell::new(Timestamp::ZERO),
            }
        }
    }

    impl MockClock {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn at(time: Timestamp) -> Self {
            Self {
                current: Cell::new(time),
            }
        }

        /// Jump to the given timestamp.
        pub fn set(&self, time: Timestamp) {
            self.current.set(time);
        }

        /// Advance time by the given duration.
        pub fn advance(&self, duration: Duration) {
            self.current.set(self.current.get() + duration);
        }
    }

    impl Clock for MockClock {
        type SleepFuture<'a> = Ready<()>;

        fn now(&self) -> Timestamp {
            self.current.get()
        }

        fn sleep_until(&self, _time: Timestamp) -> Self::SleepFuture<'_> {
            // Sleeping completes immediately; tests advance time manually.
            ready(())
        }
    }

    /// Mock random for testing (deterministic).
    pub struct MockRandom {
        pub state: u64,
    }

    impl Default for MockRandom {
        fn default() -> Self {
            Self { state: 12345 }
        }
    }

    impl MockRandom {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_seed(seed: u64) -> Self {
            Self { state: seed }
        }
    }

    impl Random for MockRandom {
        fn gen_range(&mut self, min: u64, max: u64) -> u64 {
            // Simple LCG; the high bits have the longest period
            self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1);
            let range = max - min;
            if range == 0 {
                return min;
            }
            min + ((self.state >> 33) % range)
        }
    }
}
