//! Compile-time configuration for swarm behavior.
//!
//! The `SwarmConfig` trait carries the tunables a firefly is built with. The
//! neighbor-view capacity is not part of the trait: it sizes a fixed array, so
//! it is a const generic on [`Swarm`](crate::Swarm) and
//! [`NeighborSet`](crate::NeighborSet) (default [`DEFAULT_VIEW`]).
//!
//! # Example
//!
//! ```ignore
//! use fireswarm::{Duration, Swarm, SwarmConfig};
//!
//! struct FieldConfig;
//! impl SwarmConfig for FieldConfig {
//!     const SPREAD_DELAY: Duration = Duration::from_secs(30);
//!     const ADMIT_PERMILLE: u16 = 50;
//!     const REPORT_TX_STATUS: bool = false;
//! }
//!
//! // Twelve-peer view
//! let swarm = Swarm::<_, _, _, FieldConfig, 12>::new(address, transport, random, clock);
//! ```

use crate::time::Duration;

/// Default neighbor-view capacity.
pub const DEFAULT_VIEW: usize = 8;

/// Configuration trait for swarm tunables.
pub trait SwarmConfig {
    /// Minimum interval between two presence announcements.
    const SPREAD_DELAY: Duration;

    /// Probability, in 1/1000, that a newly seen peer replaces an existing
    /// member once the view is full. Values above 1000 always replace.
    const ADMIT_PERMILLE: u16;

    /// Surface delivery-status frames to the caller as
    /// [`Command::DeliveryStatus`](crate::Command::DeliveryStatus) instead of
    /// folding them into [`Command::None`](crate::Command::None).
    const REPORT_TX_STATUS: bool;
}

/// Field configuration: 10s spread delay, 10% replacement, silent status.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultConfig;

impl SwarmConfig for DefaultConfig {
    const SPREAD_DELAY: Duration = Duration::from_secs(10);
    const ADMIT_PERMILLE: u16 = 100;
    const REPORT_TX_STATUS: bool = false;
}

/// Same as [`DefaultConfig`] but reports delivery-status frames to the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiagnosticConfig;

impl SwarmConfig for DiagnosticConfig {
    const SPREAD_DELAY: Duration = DefaultConfig::SPREAD_DELAY;
    const ADMIT_PERMILLE: u16 = DefaultConfig::ADMIT_PERMILLE;
    const REPORT_TX_STATUS: bool = true;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        assert_eq!(DefaultConfig::SPREAD_DELAY, Duration::from_secs(10));
        assert_eq!(DefaultConfig::ADMIT_PERMILLE, 100);
        assert!(!DefaultConfig::REPORT_TX_STATUS);
    }

    #[test]
    fn test_diagnostic_config_only_differs_in_reporting() {
        assert_eq!(DiagnosticConfig::SPREAD_DELAY, DefaultConfig::SPREAD_DELAY);
        assert_eq!(DiagnosticConfig::ADMIT_PERMILLE, DefaultConfig::ADMIT_PERMILLE);
        assert!(DiagnosticConfig::REPORT_TX_STATUS);
    }

    #[test]
    fn test_default_view_nonzero() {
        assert!(DEFAULT_VIEW > 0);
    }
}
