//! Cooperative EDF task kernel for OS-less microcontrollers
//!
//! Provides:
//! - Stackless continuations as the task suspension primitive
//! - An earliest-deadline-first scheduler running one task step per tick
//! - A single-writer versioned cell (seqlock) readable from any context
//! - A packed event queue for interrupt-to-task signalling
//! - A save/switch context interface for full-stack tasks

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]

// ============ Critical Section ============

#[cfg(target_arch = "arm")]
mod cs_impl {
    use cortex_m::interrupt;
    use cortex_m::register::primask;
    use critical_section::{set_impl, Impl, RawRestoreState};

    struct SingleCoreCriticalSection;
    set_impl!(SingleCoreCriticalSection);

    unsafe impl Impl for SingleCoreCriticalSection {
        unsafe fn acquire() -> RawRestoreState {
            let was_active = primask::read().is_active();
            interrupt::disable();
            was_active
        }

        unsafe fn release(was_active: RawRestoreState) {
            if was_active {
                unsafe { interrupt::enable() }
            }
        }
    }
}

// ============ Modules ============

pub mod log;
mod lang_items;

pub mod kernel;
pub mod port;
pub mod sync;

// ============ Re-exports ============

pub use kernel::config;
pub use kernel::config::*;
pub use kernel::critical;
pub use kernel::cs_cell;
pub use kernel::error;
pub use kernel::error::{KernelError, KernelResult};
pub use kernel::sched;
pub use kernel::sched::{Scheduler, Tick};
pub use kernel::task;
pub use kernel::task::{from_fn, Continuation, Coroutine, Resume, Step, TaskCx};
pub use kernel::time;
pub use kernel::time::{Clock, TickClock};
pub use kernel::types;
pub use kernel::types::*;

#[cfg(feature = "seqcell")]
pub use sync::seq::{SeqBytes, SeqCell, SeqWriter};
#[cfg(feature = "evq")]
pub use sync::evq::EventQueue;
