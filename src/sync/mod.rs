//! Interrupt-safe data exchange
//!
//! The only structures interrupt handlers may touch: the versioned
//! single-writer cell and the packed event queue.

#[cfg(feature = "seqcell")]
pub mod seq;

#[cfg(feature = "evq")]
pub mod evq;
