//! Count of sends awaiting a delivery report.
//!
//! Best effort: the transport may drop or duplicate reports, so the count can
//! drift. It never goes below zero.

/// Sends issued but not yet confirmed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PendingSends(u32);

impl PendingSends {
    pub const fn new() -> Self {
        PendingSends(0)
    }

    /// Current count.
    #[inline]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// One transmission attempt was made.
    #[inline]
    pub fn record_send(&mut self) {
        self.0 = self.0.saturating_add(1);
    }

    /// One delivery report arrived.
    ///
    /// Returns `false` when there was nothing pending (the report is absorbed).
    #[inline]
    pub fn record_report(&mut self) -> bool {
        match self.0.checked_sub(1) {
            Some(n) => {
                self.0 = n;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_then_report() {
        let mut pending = PendingSends::new();
        pending.record_send();
        pending.record_send();
        assert_eq!(pending.get(), 2);

        assert!(pending.record_report());
        assert_eq!(pending.get(), 1);
    }

    #[test]
    fn test_report_with_nothing_pending_is_clamped() {
        let mut pending = PendingSends::new();
        assert!(!pending.record_report());
        assert_eq!(pending.get(), 0);

        pending.record_send();
        assert!(pending.record_report());
        assert!(!pending.record_report());
        assert_eq!(pending.get(), 0);
    }
}
