//! Compile-time configuration for the kernel
//!
//! These constants control resource limits and timing of the scheduler.

/// Default number of task slots in a scheduler registry
pub const CFG_TASK_MAX: usize = 8;

/// Clock tick rate in Hz (one tick per millisecond)
pub const CFG_TICK_RATE_HZ: u32 = 1000;

/// Deadline step applied to a task that suspends without moving its own deadline
pub const CFG_STARVATION_NUDGE: u32 = 1;

/// Width in bits of the packed event queue word
pub const CFG_EVQ_WORD_BITS: u32 = 32;
