//! Core type definitions
//!
//! Time values are millisecond counters that wrap. Ordering between two
//! instants is only meaningful while they are less than half the counter
//! range apart, so `Instant` does not implement `Ord`.

use core::ops::{Add, AddAssign};

/// Point on the monotonic millisecond clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Instant(u32);

/// Span of milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Duration(u32);

impl Instant {
    /// Counter value zero
    pub const ZERO: Instant = Instant(0);

    #[inline(always)]
    pub const fn from_millis(ms: u32) -> Self {
        Instant(ms)
    }

    #[inline(always)]
    pub const fn as_millis(self) -> u32 {
        self.0
    }

    /// Signed distance from `origin` to `self`
    #[inline(always)]
    pub const fn offset_from(self, origin: Instant) -> i32 {
        self.0.wrapping_sub(origin.0) as i32
    }

    /// Strictly earlier than `other`
    #[inline(always)]
    pub const fn is_before(self, other: Instant) -> bool {
        self.offset_from(other) < 0
    }

    /// Earlier than or equal to `other`
    #[inline(always)]
    pub const fn is_at_or_before(self, other: Instant) -> bool {
        self.offset_from(other) <= 0
    }

    /// Time elapsed since `earlier`, wrapping
    #[inline(always)]
    pub const fn since(self, earlier: Instant) -> Duration {
        Duration(self.0.wrapping_sub(earlier.0))
    }

    /// The later of two instants
    #[inline]
    pub const fn later(self, other: Instant) -> Instant {
        if self.is_before(other) {
            other
        } else {
            self
        }
    }
}

impl Duration {
    pub const ZERO: Duration = Duration(0);

    #[inline(always)]
    pub const fn from_millis(ms: u32) -> Self {
        Duration(ms)
    }

    /// `None` if `s` seconds do not fit in the millisecond counter
    #[inline]
    pub const fn from_secs(s: u32) -> Option<Self> {
        match s.checked_mul(1000) {
            Some(ms) => Some(Duration(ms)),
            None => None,
        }
    }

    #[inline(always)]
    pub const fn as_millis(self) -> u32 {
        self.0
    }
}

impl Add<Duration> for Instant {
    type Output = Instant;

    #[inline(always)]
    fn add(self, rhs: Duration) -> Instant {
        Instant(self.0.wrapping_add(rhs.0))
    }
}

impl AddAssign<Duration> for Instant {
    #[inline(always)]
    fn add_assign(&mut self, rhs: Duration) {
        self.0 = self.0.wrapping_add(rhs.0);
    }
}

/// Stable handle to a registered task
///
/// Registry slots move when tasks are removed, so tasks are addressed by id
/// rather than by index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TaskId(pub(crate) u16);

impl TaskId {
    #[inline]
    pub fn raw(self) -> u16 {
        self.0
    }
}

/// Task lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum TaskState {
    /// Registered, never stepped
    NotScheduled = 0,
    /// Currently executing a step
    Running = 1,
    /// Parked at a suspension point
    Suspended = 2,
    /// Completed and removed from the registry
    Done = 3,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_across_wrap() {
        let before = Instant::from_millis(u32::MAX - 5);
        let after = before + Duration::from_millis(10);
        assert_eq!(after.as_millis(), 4);
        assert!(before.is_before(after));
        assert!(!after.is_before(before));
        assert_eq!(after.since(before), Duration::from_millis(10));
        assert_eq!(before.later(after), after);
    }

    #[test]
    fn test_from_secs_range() {
        assert_eq!(Duration::from_secs(3), Some(Duration::from_millis(3000)));
        let longest = Duration::from_millis(4_294_967_000);
        assert_eq!(Duration::from_secs(u32::MAX / 1000), Some(longest));
        assert_eq!(Duration::from_secs(u32::MAX / 1000 + 1), None);
    }

    #[test]
    fn test_at_or_before() {
        let t = Instant::from_millis(100);
        assert!(t.is_at_or_before(t));
        assert!(!t.is_before(t));
        assert!(t.is_at_or_before(Instant::from_millis(101)));
        assert!(!Instant::from_millis(101).is_at_or_before(t));
    }
}
