//! Core kernel modules
//!
//! Contains configuration, errors, time, continuations and the scheduler.

pub mod config;
pub mod critical;
pub mod cs_cell;
pub mod error;
pub mod sched;
pub mod task;
pub mod time;
pub mod types;
