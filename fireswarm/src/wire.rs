//! Command payload format.
//!
//! Every data frame exchanged between fireflies starts with a one-byte tag:
//!
//! ```text
//! Presence:    TAG_PRESENCE (1)
//! Reset:       TAG_RESET (1)
//! Application: tag (1) || application bytes (N)
//! ```
//!
//! Application tags are any byte other than the two reserved ones.

use alloc::vec::Vec;

use crate::types::Payload;

/// Presence announcement.
pub const TAG_PRESENCE: u8 = 0x01;

/// Request to clear the receiver's neighbor view.
pub const TAG_RESET: u8 = 0x02;

/// Decoded meaning of a tag byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tag {
    Presence,
    Reset,
    App(u8),
}

impl Tag {
    #[inline]
    pub const fn from_byte(byte: u8) -> Self {
        match byte {
            TAG_PRESENCE => Tag::Presence,
            TAG_RESET => Tag::Reset,
            other => Tag::App(other),
        }
    }

    #[inline]
    pub const fn to_byte(self) -> u8 {
        match self {
            Tag::Presence => TAG_PRESENCE,
            Tag::Reset => TAG_RESET,
            Tag::App(b) => b,
        }
    }
}

/// Split a data payload into its tag byte and the remainder.
///
/// Returns `None` for an empty payload.
#[inline]
pub fn split_command(data: &[u8]) -> Option<(u8, &[u8])> {
    data.split_first().map(|(tag, rest)| (*tag, rest))
}

/// Build a command payload from a tag and body.
pub fn encode_command(tag: u8, body: &[u8]) -> Payload {
    let mut out = Vec::with_capacity(1 + body.len());
    out.push(tag);
    out.extend_from_slice(body);
    out
}

/// The one-byte presence announcement.
pub fn presence_frame() -> Payload {
    encode_command(TAG_PRESENCE, &[])
}

/// The one-byte reset request.
pub fn reset_frame() -> Payload {
    encode_command(TAG_RESET, &[])
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_reserved_frames_are_single_byte() {
        assert_eq!(presence_frame(), vec![TAG_PRESENCE]);
        assert_eq!(reset_frame(), vec![TAG_RESET]);
    }

    #[test]
    fn test_split_command() {
        let frame = encode_command(0x42, &[7, 8, 9]);
        assert_eq!(split_command(&frame), Some((0x42, &[7u8, 8, 9][..])));
        assert_eq!(split_command(&[TAG_RESET]), Some((TAG_RESET, &[][..])));
        assert_eq!(split_command(&[]), None);
    }

    #[test]
    fn test_tag_classification() {
        assert_eq!(Tag::from_byte(TAG_PRESENCE), Tag::Presence);
        assert_eq!(Tag::from_byte(TAG_RESET), Tag::Reset);
        assert_eq!(Tag::from_byte(0x00), Tag::App(0x00));
        assert_eq!(Tag::from_byte(0xFF), Tag::App(0xFF));
        assert_eq!(Tag::App(0x33).to_byte(), 0x33);
    }
}
