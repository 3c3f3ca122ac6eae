//! Critical section protected cell
//!
//! Data shared between thread mode and interrupt handlers that is only
//! touched while interrupts are masked.

use core::cell::RefCell;

use critical_section::Mutex;

use crate::critical::CriticalSection;

/// A cell that can only be accessed within a critical section.
pub struct CsCell<T>(Mutex<RefCell<T>>);

impl<T> CsCell<T> {
    #[inline(always)]
    pub const fn new(value: T) -> Self {
        Self(Mutex::new(RefCell::new(value)))
    }

    /// Run `f` on the inner value while `cs` keeps interrupts masked
    ///
    /// # Panics
    /// If `f` re-enters `with` on the same cell.
    #[inline(always)]
    pub fn with<R>(&self, cs: &CriticalSection, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut *self.0.borrow_ref_mut(cs.token()))
    }

    /// Exclusive access through `&mut self`, no masking needed
    #[inline(always)]
    pub fn get_mut(&mut self) -> &mut T {
        self.0.get_mut().get_mut()
    }
}
