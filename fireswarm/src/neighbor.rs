//! Bounded neighbor view.
//!
//! A fixed array of addresses with a logical size and a circular write
//! cursor. Below capacity every new peer is appended. At capacity a new peer
//! either overwrites the slot under the cursor (with the configured
//! probability) or is turned away, which keeps memory fixed while giving every
//! peer in range a long-run chance of being represented.
//!
//! Membership is governed by `len` alone: `reset` does not touch storage.

use crate::traits::Random;
use crate::types::PeerAddress;

/// Outcome of [`NeighborSet::admit`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    /// Stored in a free slot.
    Added,
    /// Stored over the given former member.
    Replaced(PeerAddress),
    /// Turned away by the retention policy; the set is unchanged.
    Rejected,
    /// Already a member; the set is unchanged.
    AlreadyPresent,
}

/// Fixed-capacity set of neighbor addresses.
#[derive(Clone, Debug)]
pub struct NeighborSet<const N: usize> {
    slots: [PeerAddress; N],
    len: usize,
    cursor: usize,
}

impl<const N: usize> Default for NeighborSet<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> NeighborSet<N> {
    /// Create an empty set.
    pub const fn new() -> Self {
        Self {
            slots: [PeerAddress::UNSET; N],
            len: 0,
            cursor: 0,
        }
    }

    /// Maximum number of members.
    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Current number of members.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len == N
    }

    /// Slot the next write goes to.
    #[inline]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// True iff `addr` is currently a member.
    pub fn contains(&self, addr: &PeerAddress) -> bool {
        self.as_slice().contains(addr)
    }

    /// Current members in storage order.
    #[inline]
    pub fn as_slice(&self) -> &[PeerAddress] {
        &self.slots[..self.len]
    }

    /// Iterate over current members in storage order.
    pub fn iter(&self) -> core::slice::Iter<'_, PeerAddress> {
        self.as_slice().iter()
    }

    /// Offer a newly seen peer to the set.
    ///
    /// When the set is full the peer replaces the member under the cursor if
    /// `random.gen_range(0, 1000) < admit_permille`.
    pub fn admit<R: Random>(
        &mut self,
        addr: PeerAddress,
        admit_permille: u16,
        random: &mut R,
    ) -> Admission {
        if self.contains(&addr) {
            return Admission::AlreadyPresent;
        }
        if N == 0 {
            return Admission::Rejected;
        }

        if self.len < N {
            self.write(addr);
            self.len += 1;
            return Admission::Added;
        }

        if random.gen_range(0, 1000) < u64::from(admit_permille) {
            let evicted = self.slots[self.cursor];
            self.write(addr);
            Admission::Replaced(evicted)
        } else {
            Admission::Rejected
        }
    }

    /// Forget every member.
    pub fn reset(&mut self) {
        self.len = 0;
        self.cursor = 0;
    }

    fn write(&mut self, addr: PeerAddress) {
        self.slots[self.cursor] = addr;
        self.cursor += 1;
        if self.cursor == N {
            self.cursor = 0;
        }
    }
}

impl<'a, const N: usize> IntoIterator for &'a NeighborSet<N> {
    type Item = &'a PeerAddress;
    type IntoIter = core::slice::Iter<'a, PeerAddress>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
