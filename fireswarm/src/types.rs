//! Core types for fireswarm nodes.

use core::fmt;

use alloc::vec::Vec;

/// Raw frame bytes.
pub type Payload = Vec<u8>;

/// 64-bit radio endpoint address.
///
/// Assigned by the radio vendor and unique per module. Compared by exact
/// equality only.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PeerAddress(u64);

impl PeerAddress {
    /// All-zero address. Never assigned to a radio.
    pub const UNSET: PeerAddress = PeerAddress(0);

    /// Address reaching every node in radio range.
    pub const BROADCAST: PeerAddress = PeerAddress(0x0000_0000_0000_FFFF);

    /// Create an address from its 64-bit value.
    #[inline]
    pub const fn new(raw: u64) -> Self {
        PeerAddress(raw)
    }

    /// Create an address from its high and low 32-bit halves.
    #[inline]
    pub const fn from_parts(msb: u32, lsb: u32) -> Self {
        PeerAddress(((msb as u64) << 32) | lsb as u64)
    }

    /// High 32 bits (vendor prefix on most modules).
    #[inline]
    pub const fn msb(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Low 32 bits (serial number).
    #[inline]
    pub const fn lsb(self) -> u32 {
        self.0 as u32
    }

    /// The raw 64-bit value.
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn is_broadcast(self) -> bool {
        self.0 == Self::BROADCAST.0
    }
}

impl fmt::Debug for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerAddress({:08x}:{:08x})", self.msb(), self.lsb())
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}{:08x}", self.msb(), self.lsb())
    }
}

/// A frame received from the radio, already classified by the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    /// Data sent by another node.
    Data { from: PeerAddress, data: Payload },
    /// Delivery report for one of our own sends.
    TxStatus { delivered: bool },
    /// Any other frame kind (modem status, AT responses, ...).
    Unknown { api_id: u8 },
}

/// A frame queued for transmission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outbound {
    /// Destination (may be [`PeerAddress::BROADCAST`]).
    pub dest: PeerAddress,
    /// Frame bytes, tag first.
    pub data: Payload,
}

/// Classified result of one poll.
///
/// `Other` borrows its payload from the node's receive buffer; the borrow ends
/// with the next call into the node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command<'a> {
    /// Nothing received within the poll window, or nothing worth reporting.
    None,
    /// A peer announced itself.
    Presence { from: PeerAddress },
    /// A peer asked us to clear our view. The view is already cleared.
    Reset { from: PeerAddress },
    /// Delivery report for one of our sends (diagnostic configs only).
    DeliveryStatus { delivered: bool },
    /// Application command: tag byte and the bytes that followed it.
    Other {
        from: PeerAddress,
        tag: u8,
        data: &'a [u8],
    },
}

impl Command<'_> {
    /// True for [`Command::None`].
    pub fn is_none(&self) -> bool {
        matches!(self, Command::None)
    }
}

/// Counters for sent, dropped and received traffic.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SwarmMetrics {
    /// Presence announcements handed to the transport.
    pub presence_sent: u32,
    /// Unicast application frames handed to the transport.
    pub data_sent: u32,
    /// Sends refused by a full transport queue.
    pub sends_dropped: u32,
    /// Data frames received (any tag).
    pub frames_received: u32,
    /// Delivery reports marked successful.
    pub status_delivered: u32,
    /// Delivery reports marked failed.
    pub status_failed: u32,
    /// Peers added while the view had room.
    pub peers_admitted: u32,
    /// Peers that evicted an existing member.
    pub peers_replaced: u32,
    /// Peers turned away by the retention policy.
    pub peers_rejected: u32,
    /// Reset commands honored.
    pub resets: u32,
    /// Frames of an unrecognized kind.
    pub unknown_frames: u32,
    /// Data frames without a tag byte.
    pub malformed_frames: u32,
}

impl SwarmMetrics {
    pub const fn new() -> Self {
        Self {
            presence_sent: 0,
            data_sent: 0,
            sends_dropped: 0,
            frames_received: 0,
            status_delivered: 0,
            status_failed: 0,
            peers_admitted: 0,
            peers_replaced: 0,
            peers_rejected: 0,
            resets: 0,
            unknown_frames: 0,
            malformed_frames: 0,
        }
    }
}

/// Error type for node operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error<T> {
    /// The radio failed to join the network. Fatal for this node.
    Association(T),
    /// Payload does not fit in one radio frame.
    MessageTooLarge { len: usize, mtu: usize },
}

impl<T: fmt::Debug> fmt::Display for Error<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Association(e) => write!(f, "radio association failed: {:?}", e),
            Error::MessageTooLarge { len, mtu } => {
                write!(f, "message too large: {} bytes (mtu {})", len, mtu)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_address_parts() {
        let addr = PeerAddress::from_parts(0x0013_A200, 0x40A1_B2C3);
        assert_eq!(addr.msb(), 0x0013_A200);
        assert_eq!(addr.lsb(), 0x40A1_B2C3);
        assert_eq!(addr.as_u64(), 0x0013_A200_40A1_B2C3);
        assert!(!addr.is_broadcast());
        assert!(PeerAddress::BROADCAST.is_broadcast());
    }

    #[test]
    fn test_address_exact_equality() {
        // Same low half, different vendor prefix
        let a = PeerAddress::from_parts(1, 42);
        let b = PeerAddress::from_parts(2, 42);
        assert_ne!(a, b);
        assert_eq!(a, PeerAddress::new(a.as_u64()));
    }

    #[test]
    fn test_address_display() {
        let addr = PeerAddress::from_parts(0x0013_A200, 0x0000_00FF);
        assert_eq!(addr.to_string(), "0013a200000000ff");
    }

    #[test]
    fn test_error_display() {
        let err: Error<u8> = Error::MessageTooLarge { len: 300, mtu: 84 };
        assert!(err.to_string().contains("300"));

        let err: Error<&str> = Error::Association("no response");
        assert!(err.to_string().contains("association"));
    }
}
