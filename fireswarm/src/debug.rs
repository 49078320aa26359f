//! Debug events for protocol tracing.
//!
//! Stand-in for the status LEDs and serial prints of a bench firefly. Enabled
//! in test builds and with the `debug` feature; the node pushes events into a
//! bounded channel and drops them when nobody drains it.

use embassy_sync::channel::Channel;

use crate::time::Timestamp;
use crate::traits::ChannelMutex;
use crate::types::PeerAddress;

/// Queue size for the debug channel.
pub const DEBUG_QUEUE_SIZE: usize = 64;

/// Debug event channel.
pub type DebugChannel = Channel<ChannelMutex, DebugEvent, DEBUG_QUEUE_SIZE>;

/// Debug events emitted by the node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebugEvent {
    /// Presence announcement queued.
    PresenceSent { timestamp: Timestamp, pending: u32 },
    /// Application payload fanned out to the view.
    Transmitted { recipients: usize, pending: u32 },
    /// Transport queue refused a frame.
    SendDropped { dest: PeerAddress },
    /// New peer stored in a free slot.
    PeerAdmitted { peer: PeerAddress, view_size: usize },
    /// New peer stored over an existing member.
    PeerReplaced {
        peer: PeerAddress,
        evicted: PeerAddress,
    },
    /// New peer turned away by the retention policy.
    PeerRejected { peer: PeerAddress },
    /// View cleared on request.
    ViewReset { from: PeerAddress, dropped: usize },
    /// Application command handed to the caller.
    CommandReceived { from: PeerAddress, tag: u8 },
    /// Delivery report processed.
    TxStatus { delivered: bool, pending: u32 },
    /// Frame of an unrecognized kind ignored.
    UnknownFrame { api_id: u8 },
    /// Data frame without a tag byte ignored.
    MalformedFrame { from: PeerAddress },
}

/// Push a debug event if tracing is compiled in.
///
/// The event expression is only evaluated when tracing is enabled.
macro_rules! emit_debug {
    ($node:expr, $event:expr) => {
        #[cfg(any(test, feature = "debug"))]
        {
            let _ = $node.debug_channel().try_send($event);
        }
    };
}
