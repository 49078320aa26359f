#![forbid(unsafe_code)]
//! fireswarm - Neighbor membership and command dispatch for firefly meshes
//!
//! A firefly is a small autonomous radio node. It announces itself at a fixed
//! rate, remembers a bounded sample of the peers it hears ("the view"), and
//! exchanges one-byte-tagged command frames with them over an unreliable link.
//!
//! This crate is `no_std` but **requires the `alloc` crate** for frame
//! payloads. The neighbor view itself is a fixed array sized at build time.
//!
//! # Key Properties
//!
//! - Presence announcements are broadcast at most once per spread delay
//! - The view never exceeds its capacity and never holds duplicates
//! - Once full, a newly heard peer replaces one member with a fixed probability
//! - A reset command clears the view and is still reported to the caller
//! - Delivery reports decrement a best-effort pending-send counter
//! - Time is a wrapping 32-bit millisecond counter
//!
//! # Example (integration pattern)
//!
//! ```text
//! use fireswarm::{Command, DefaultConfig, Duration, PeerAddress, Swarm};
//!
//! // Implement Transport, Random and Clock for your radio and board...
//!
//! let mut swarm = Swarm::<_, _, _, DefaultConfig>::new(
//!     PeerAddress::from_parts(0x0013A200, serial),
//!     transport,
//!     random,
//!     clock,
//! );
//! swarm.start()?;
//!
//! loop {
//!     match swarm.step(Duration::from_millis(250)).await {
//!         Command::Other { tag: CMD_BLINK, data, .. } => blink(data),
//!         _ => {}
//!     }
//!     if button_pressed() {
//!         swarm.transmit(&[CMD_BLINK])?;
//!     }
//! }
//! ```
//!
//! # Module Structure
//!
//! - [`types`] - Core types (PeerAddress, Frame, Command, Error)
//! - [`wire`] - Command tag format
//! - [`traits`] - Transport, Random, Clock traits
//! - [`swarm`] - Main Swarm struct and public API
//! - [`neighbor`] - Bounded neighbor view
//! - [`spread`] - Presence announcements and unicast fan-out
//! - [`dispatch`] - Inbound frame classification
//! - [`tracker`] - Pending-send counter
//! - [`time`] - Timestamp and Duration types
//! - [`config`] - Compile-time tunables

#![no_std]

// Prevent test/debug features from being used in release builds.
#[cfg(all(feature = "test-support", not(test), not(debug_assertions)))]
compile_error!(
    "The `test-support` feature must not be enabled in release builds. \
     It includes mock radios and a predictable random source."
);

#[cfg(all(feature = "debug", not(test), not(debug_assertions)))]
compile_error!(
    "The `debug` feature must not be enabled in release builds. \
     It adds protocol tracing overhead intended only for development and simulation."
);

extern crate alloc;

#[macro_use]
pub mod debug;

pub mod config;
pub mod dispatch;
pub mod neighbor;
pub mod spread;
pub mod swarm;
pub mod time;
pub mod tracker;
pub mod traits;
pub mod types;
pub mod wire;

// Re-export main types at crate root
pub use config::{DefaultConfig, DiagnosticConfig, SwarmConfig, DEFAULT_VIEW};
pub use neighbor::{Admission, NeighborSet};
pub use swarm::Swarm;
pub use time::{Duration, Timestamp};
pub use traits::{Clock, Random, Transport, TransportInChannel, TransportOutChannel};
pub use types::{Command, Error, Frame, Outbound, Payload, PeerAddress, SwarmMetrics};

// Re-export constants
pub use traits::TRANSPORT_QUEUE_SIZE;
pub use wire::{TAG_PRESENCE, TAG_RESET};
