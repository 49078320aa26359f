//! Outbound traffic: rate-limited presence announcements and unicast fan-out.
//!
//! A presence announcement is a one-byte broadcast. It goes out at most once
//! per `SPREAD_DELAY`; the first one goes out immediately. Delay comparisons
//! use wrapping subtraction so the gate keeps working across clock wrap.

use crate::config::SwarmConfig;
use crate::swarm::Swarm;
use crate::time::{Duration, Timestamp};
use crate::traits::{Clock, Random, Transport};
use crate::types::{Error, PeerAddress};
use crate::wire::presence_frame;

/// Time of the last presence announcement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SpreadTimer {
    last: Option<Timestamp>,
}

impl SpreadTimer {
    pub const fn new() -> Self {
        Self { last: None }
    }

    pub fn last(&self) -> Option<Timestamp> {
        self.last
    }

    /// True if no announcement was ever sent or `delay` has elapsed since.
    pub fn is_due(&self, now: Timestamp, delay: Duration) -> bool {
        match self.last {
            None => true,
            Some(last) => now.is_at_least(last, delay),
        }
    }

    pub fn mark(&mut self, now: Timestamp) {
        self.last = Some(now);
    }

    /// Earliest time the next announcement is allowed; `None` if due now.
    pub fn next_due(&self, delay: Duration) -> Option<Timestamp> {
        self.last.map(|last| last + delay)
    }
}

impl<T, R, Clk, C, const VIEW: usize> Swarm<T, R, Clk, C, VIEW>
where
    T: Transport,
    R: Random,
    Clk: Clock,
    C: SwarmConfig,
{
    /// Broadcast a presence announcement if the spread delay has elapsed.
    ///
    /// Returns true if an announcement was issued. A frame refused by a full
    /// transport queue still counts as issued.
    pub fn maybe_broadcast(&mut self, now: Timestamp) -> bool {
        if !self.spread_timer().is_due(now, C::SPREAD_DELAY) {
            return false;
        }
        self.spread_mut().mark(now);

        if self.send(PeerAddress::BROADCAST, presence_frame()) {
            self.metrics_mut().presence_sent += 1;
        }
        log::trace!("presence sent at {:?}, {} pending", now, self.pending_sends());
        emit_debug!(
            self,
            crate::debug::DebugEvent::PresenceSent {
                timestamp: now,
                pending: self.pending_sends(),
            }
        );
        true
    }

    /// Unicast `payload` once to every current neighbor.
    ///
    /// No retry and no wait for acknowledgement. Returns the number of sends
    /// issued (the view size), or `MessageTooLarge` before anything is sent.
    pub fn transmit(&mut self, payload: &[u8]) -> Result<usize, Error<T::Error>> {
        let mtu = self.transport().mtu();
        if payload.len() > mtu {
            return Err(Error::MessageTooLarge {
                len: payload.len(),
                mtu,
            });
        }

        let recipients = self.neighbors().len();
        for i in 0..recipients {
            let dest = self.neighbors().as_slice()[i];
            if self.send(dest, payload.to_vec()) {
                self.metrics_mut().data_sent += 1;
            }
        }

        log::debug!(
            "payload of {} bytes sent to {} neighbors",
            payload.len(),
            recipients
        );
        emit_debug!(
            self,
            crate::debug::DebugEvent::Transmitted {
                recipients,
                pending: self.pending_sends(),
            }
        );
        Ok(recipients)
    }
}
