//! Port layer - CPU-specific implementations
//!
//! Tick timer setup, idling and the full-stack context switch for the
//! target CPU.

pub mod ctxt;

pub use ctxt::{Context, StackContext};

#[cfg(target_arch = "arm")]
pub mod arm;

#[cfg(target_arch = "arm")]
pub use arm::*;

// Stub implementations for non-ARM targets (for testing)
#[cfg(not(target_arch = "arm"))]
pub mod stub {
    /// Wait for the next event
    #[inline]
    pub fn idle() {
        core::hint::spin_loop();
    }

    pub fn systick_init(_reload: u32) {
        // No-op for testing
    }

    /// No switch handler on the host; callers drive
    /// [`finish_switch`](super::ctxt::finish_switch) directly
    #[inline]
    pub fn pend_switch() {}
}

#[cfg(not(target_arch = "arm"))]
pub use stub::*;
