//! Time management module
//!
//! The kernel reads time only through the [`Clock`] trait. All comparisons
//! are wraparound-safe, so counter overflow cannot invert ordering for
//! differences smaller than half the counter range.

use core::cell::Cell;

use portable_atomic::{AtomicU32, Ordering};

use crate::types::{Duration, Instant};

/// Monotonic millisecond time source
pub trait Clock {
    fn now(&self) -> Instant;
}

impl<C: Clock + ?Sized> Clock for &C {
    #[inline]
    fn now(&self) -> Instant {
        (**self).now()
    }
}

/// Global tick counter advanced by the tick interrupt
static TICKS: AtomicU32 = AtomicU32::new(0);

/// Clock backed by the global tick counter
///
/// With the `systick` feature on ARM the counter is advanced by the SysTick
/// exception; otherwise the application calls [`TickClock::advance`] from
/// whatever timer interrupt it owns.
#[derive(Debug, Clone, Copy, Default)]
pub struct TickClock;

impl TickClock {
    /// Advance the counter by `ticks`, returning the new time
    #[inline(always)]
    pub fn advance(ticks: u32) -> Instant {
        Instant::from_millis(TICKS.fetch_add(ticks, Ordering::Relaxed).wrapping_add(ticks))
    }

    /// Current counter value
    #[inline(always)]
    pub fn ticks() -> u32 {
        TICKS.load(Ordering::Relaxed)
    }
}

impl Clock for TickClock {
    #[inline(always)]
    fn now(&self) -> Instant {
        Instant::from_millis(Self::ticks())
    }
}

/// Clock that only moves when told to
///
/// Meant for host-side simulation and tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<u32>,
}

impl ManualClock {
    pub const fn new(start: u32) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    pub fn set(&self, t: Instant) {
        self.now.set(t.as_millis());
    }

    pub fn advance(&self, d: Duration) {
        self.now.set(self.now.get().wrapping_add(d.as_millis()));
    }
}

impl Clock for ManualClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::from_millis(self.now.get())
    }
}

/// Rate limiter for a block that should run at most once per interval
///
/// Kept as a field of the task record so it survives suspensions.
#[derive(Debug, Clone, Copy)]
pub struct Every {
    interval: Duration,
    last: Instant,
}

impl Every {
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Instant::ZERO,
        }
    }

    /// Returns true, and restarts the interval, once more than `interval`
    /// has passed since the last hit
    pub fn ready(&mut self, now: Instant) -> bool {
        if now.since(self.last) > self.interval {
            self.last = now;
            true
        } else {
            false
        }
    }

    /// Time until the next hit becomes possible
    pub fn remaining(&self, now: Instant) -> Duration {
        let elapsed = now.since(self.last).as_millis();
        let window = self.interval.as_millis().saturating_add(1);
        Duration::from_millis(window.saturating_sub(elapsed))
    }
}

/// Convert hours, minutes, seconds, milliseconds into a duration
///
/// Returns `None` when a field is out of range.
pub fn hmsm(hours: u16, minutes: u8, seconds: u8, milliseconds: u16) -> Option<Duration> {
    if minutes > 59 || seconds > 59 || milliseconds > 999 {
        return None;
    }

    let total_ms = (hours as u32)
        .checked_mul(3_600_000)?
        .checked_add(minutes as u32 * 60_000 + seconds as u32 * 1000 + milliseconds as u32)?;

    Some(Duration::from_millis(total_ms))
}

/// SysTick interrupt handler
#[cfg(all(target_arch = "arm", feature = "systick"))]
#[cortex_m_rt::exception]
fn SysTick() {
    TickClock::advance(1);
}
