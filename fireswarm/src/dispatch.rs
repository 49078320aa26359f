//! Inbound frame classification.
//!
//! Each poll takes at most one frame from the transport and turns it into a
//! [`Command`]. Frames are handled independently:
//!
//! - Data, presence tag: admit the sender to the view if new.
//! - Data, reset tag: clear the view, then report `Reset`.
//! - Data, any other tag: report it with the remaining bytes.
//! - Delivery status: decrement the pending count.
//! - Anything else: ignored.
//!
//! Nothing a peer sends can make these paths fail.

use embassy_futures::select::{select, Either};

use crate::config::SwarmConfig;
use crate::neighbor::Admission;
use crate::swarm::Swarm;
use crate::time::Duration;
use crate::traits::{Clock, Random, Transport};
use crate::types::{Command, Frame, Payload, PeerAddress};
use crate::wire::{split_command, Tag};

impl<T, R, Clk, C, const VIEW: usize> Swarm<T, R, Clk, C, VIEW>
where
    T: Transport,
    R: Random,
    Clk: Clock,
    C: SwarmConfig,
{
    /// Wait up to `timeout` for one frame and classify it.
    ///
    /// Returns [`Command::None`] if nothing arrived in time. A returned
    /// `Command::Other` borrows the node until the next call.
    pub async fn poll(&mut self, timeout: Duration) -> Command<'_> {
        let deadline = self.now() + timeout;
        let frame = match select(
            self.transport().incoming().receive(),
            self.clock().sleep_until(deadline),
        )
        .await
        {
            Either::First(frame) => frame,
            Either::Second(()) => return Command::None,
        };
        self.handle_frame(frame)
    }

    /// Classify one frame if one is already queued, without waiting.
    pub fn try_poll(&mut self) -> Command<'_> {
        match self.transport().incoming().try_receive() {
            Ok(frame) => self.handle_frame(frame),
            Err(_) => Command::None,
        }
    }

    /// Apply one received frame to the node state.
    pub fn handle_frame(&mut self, frame: Frame) -> Command<'_> {
        match frame {
            Frame::Data { from, data } => self.handle_data(from, data),
            Frame::TxStatus { delivered } => self.handle_tx_status(delivered),
            Frame::Unknown { api_id } => {
                self.metrics_mut().unknown_frames += 1;
                log::debug!("ignoring frame kind 0x{:02x}", api_id);
                emit_debug!(self, crate::debug::DebugEvent::UnknownFrame { api_id });
                Command::None
            }
        }
    }

    fn handle_data(&mut self, from: PeerAddress, data: Payload) -> Command<'_> {
        // Our own broadcast echoed back by the mesh
        if from == self.address() {
            return Command::None;
        }
        self.metrics_mut().frames_received += 1;

        let tag = match split_command(&data) {
            Some((tag, _)) => tag,
            None => {
                self.metrics_mut().malformed_frames += 1;
                log::debug!("empty data frame from {}", from);
                emit_debug!(self, crate::debug::DebugEvent::MalformedFrame { from });
                return Command::None;
            }
        };

        match Tag::from_byte(tag) {
            Tag::Presence => {
                self.handle_presence(from);
                Command::Presence { from }
            }
            Tag::Reset => {
                self.handle_reset(from);
                Command::Reset { from }
            }
            Tag::App(tag) => {
                emit_debug!(self, crate::debug::DebugEvent::CommandReceived { from, tag });
                let body = self.store_rx(data);
                Command::Other {
                    from,
                    tag,
                    data: body,
                }
            }
        }
    }

    /// Offer a presence sender to the view. Existing members are not refreshed.
    fn handle_presence(&mut self, from: PeerAddress) {
        if self.neighbors().contains(&from) {
            return;
        }

        match self.offer_peer(from) {
            Admission::Added => {
                self.metrics_mut().peers_admitted += 1;
                log::debug!("neighbor {} added ({} in view)", from, self.neighbors().len());
                emit_debug!(
                    self,
                    crate::debug::DebugEvent::PeerAdmitted {
                        peer: from,
                        view_size: self.neighbors().len(),
                    }
                );
            }
            Admission::Replaced(evicted) => {
                self.metrics_mut().peers_replaced += 1;
                log::debug!("neighbor {} replaced {}", from, evicted);
                emit_debug!(
                    self,
                    crate::debug::DebugEvent::PeerReplaced {
                        peer: from,
                        evicted,
                    }
                );
            }
            Admission::Rejected => {
                self.metrics_mut().peers_rejected += 1;
                log::trace!("neighbor {} not retained", from);
                emit_debug!(self, crate::debug::DebugEvent::PeerRejected { peer: from });
            }
            Admission::AlreadyPresent => {}
        }
    }

    fn handle_reset(&mut self, from: PeerAddress) {
        let dropped = self.neighbors().len();
        self.neighbors_mut().reset();
        self.metrics_mut().resets += 1;
        log::info!("view reset by {}, {} neighbors dropped", from, dropped);
        emit_debug!(self, crate::debug::DebugEvent::ViewReset { from, dropped });
    }

    fn handle_tx_status(&mut self, delivered: bool) -> Command<'_> {
        if !self.pending_mut().record_report() {
            log::trace!("delivery report with nothing pending");
        }
        if delivered {
            self.metrics_mut().status_delivered += 1;
        } else {
            self.metrics_mut().status_failed += 1;
        }
        emit_debug!(
            self,
            crate::debug::DebugEvent::TxStatus {
                delivered,
                pending: self.pending_sends(),
            }
        );

        if C::REPORT_TX_STATUS {
            Command::DeliveryStatus { delivered }
        } else {
            Command::None
        }
    }
}
