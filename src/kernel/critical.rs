//! Critical section handling
//!
//! Wraps the platform interrupt mask in a scoped guard. The guard saves the
//! previous mask state on entry and restores it when dropped, so sections
//! nest and every exit path releases the mask.

use core::marker::PhantomData;

use critical_section::RestoreState;

/// RAII guard for critical sections
///
/// When this guard is created, interrupts are disabled.
/// When it is dropped, interrupts are restored to their previous state.
pub struct CriticalSection {
    restore: RestoreState,
    // must be released on the core/thread that acquired it
    _not_send: PhantomData<*mut ()>,
}

impl CriticalSection {
    /// Enter a critical section by disabling interrupts.
    ///
    /// Returns a guard that will restore interrupt state when dropped.
    #[inline(always)]
    pub fn enter() -> Self {
        // SAFETY: the matching release happens exactly once, in `drop`.
        let restore = unsafe { critical_section::acquire() };
        CriticalSection {
            restore,
            _not_send: PhantomData,
        }
    }

    /// Token for `critical_section::Mutex`, valid while the guard lives
    #[inline(always)]
    pub fn token(&self) -> critical_section::CriticalSection<'_> {
        // SAFETY: interrupts stay masked until `self` is dropped.
        unsafe { critical_section::CriticalSection::new() }
    }
}

impl Drop for CriticalSection {
    #[inline(always)]
    fn drop(&mut self) {
        // SAFETY: `restore` came from the `acquire` in `enter`, and guards
        // are dropped in reverse order of creation.
        unsafe { critical_section::release(self.restore) };
    }
}

/// Execute a closure with interrupts disabled
///
/// The closure receives a reference to the critical section guard,
/// which can be used to access [`CsCell`](crate::cs_cell::CsCell) protected data.
#[inline]
pub fn critical_section<F, R>(f: F) -> R
where
    F: FnOnce(&CriticalSection) -> R,
{
    let cs = CriticalSection::enter();
    f(&cs)
}

/// Check if currently executing in an ISR context
#[inline]
pub fn is_isr_context() -> bool {
    #[cfg(target_arch = "arm")]
    {
        use cortex_m::peripheral::scb::VectActive;
        cortex_m::peripheral::SCB::vect_active() != VectActive::ThreadMode
    }

    #[cfg(not(target_arch = "arm"))]
    {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_sections_release() {
        let outer = CriticalSection::enter();
        let value = critical_section(|_cs| 7);
        drop(outer);
        assert_eq!(value, 7);
        // A fresh section must still be obtainable after both guards dropped.
        assert_eq!(critical_section(|_cs| 1), 1);
    }

    #[test]
    fn test_not_isr_on_host() {
        assert!(!is_isr_context());
    }
}
