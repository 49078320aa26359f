//! Time types for fireswarm nodes.
//!
//! Radio modules and small MCUs expose a 32-bit millisecond tick that wraps
//! after roughly 49.7 days. Timestamps here follow that width, and every
//! comparison between two timestamps goes through wrapping subtraction so that
//! a node keeps announcing itself across the wrap.

use core::ops::{Add, AddAssign, Mul, Sub};

/// Node-local timestamp in milliseconds since boot (wrapping).
///
/// Not `Ord`: two absolute readings of a wrapping clock cannot be
/// ordered. Use [`Timestamp::elapsed_since`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Timestamp(u32);

impl Timestamp {
    /// Boot time.
    pub const ZERO: Timestamp = Timestamp(0);

    /// Last tick before the clock wraps.
    pub const MAX: Timestamp = Timestamp(u32::MAX);

    /// Create a timestamp from milliseconds.
    #[inline]
    pub const fn from_millis(ms: u32) -> Self {
        Timestamp(ms)
    }

    /// Create a timestamp from seconds.
    #[inline]
    pub const fn from_secs(secs: u32) -> Self {
        Timestamp(secs.wrapping_mul(1000))
    }

    /// Get the timestamp as milliseconds.
    #[inline]
    pub const fn as_millis(self) -> u32 {
        self.0
    }

    /// Time elapsed from `earlier` to `self`, modulo the clock width.
    ///
    /// Correct as long as the real interval is shorter than one full wrap.
    #[inline]
    pub const fn elapsed_since(self, earlier: Timestamp) -> Duration {
        Duration(self.0.wrapping_sub(earlier.0))
    }

    /// True once at least `delay` has passed since `earlier`.
    #[inline]
    pub const fn is_at_least(self, earlier: Timestamp, delay: Duration) -> bool {
        self.elapsed_since(earlier).0 >= delay.0
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;

    #[inline]
    fn add(self, rhs: Duration) -> Timestamp {
        Timestamp(self.0.wrapping_add(rhs.0))
    }
}

impl AddAssign<Duration> for Timestamp {
    #[inline]
    fn add_assign(&mut self, rhs: Duration) {
        self.0 = self.0.wrapping_add(rhs.0);
    }
}

impl Sub for Timestamp {
    type Output = Duration;

    #[inline]
    fn sub(self, rhs: Timestamp) -> Duration {
        self.elapsed_since(rhs)
    }
}

/// Duration in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Duration(u32);

impl Duration {
    /// Zero duration.
    pub const ZERO: Duration = Duration(0);

    /// Maximum duration.
    pub const MAX: Duration = Duration(u32::MAX);

    /// Create a duration from milliseconds.
    #[inline]
    pub const fn from_millis(ms: u32) -> Self {
        Duration(ms)
    }

    /// Create a duration from seconds.
    #[inline]
    pub const fn from_secs(secs: u32) -> Self {
        Duration(secs.saturating_mul(1000))
    }

    /// Get the duration as milliseconds.
    #[inline]
    pub const fn as_millis(self) -> u32 {
        self.0
    }

    /// Get the duration as seconds (truncated).
    #[inline]
    pub const fn as_secs(self) -> u32 {
        self.0 / 1000
    }

    /// Saturating addition.
    #[inline]
    pub const fn saturating_add(self, other: Duration) -> Self {
        Duration(self.0.saturating_add(other.0))
    }

    /// Saturating subtraction.
    #[inline]
    pub const fn saturating_sub(self, other: Duration) -> Self {
        Duration(self.0.saturating_sub(other.0))
    }

    /// Saturating multiplication.
    #[inline]
    pub const fn saturating_mul(self, n: u32) -> Self {
        Duration(self.0.saturating_mul(n))
    }
}

impl Add for Duration {
    type Output = Duration;

    #[inline]
    fn add(self, rhs: Duration) -> Duration {
        self.saturating_add(rhs)
    }
}

impl Mul<u32> for Duration {
    type Output = Duration;

    #[inline]
    fn mul(self, rhs: u32) -> Duration {
        self.saturating_mul(rhs)
    }
}
