//! Task Control Block (TCB) definition
//!
//! The TCB holds everything the scheduler keeps for one task.

use crate::task::{Continuation, Coroutine, Status};
use crate::types::{Instant, TaskId, TaskState};

/// Task Control Block
pub(crate) struct Tcb<'a> {
    /// Stable handle
    pub id: TaskId,
    /// Saved resumption point
    pub k: Continuation,
    /// Priority target, earliest runs first
    pub deadline: Instant,
    /// Earliest time the task may run
    pub resume_at: Instant,
    /// Cancellation requested
    pub cancelled: bool,
    /// Task body
    pub body: &'a mut dyn Coroutine,
}

impl<'a> Tcb<'a> {
    pub fn new(
        id: TaskId,
        body: &'a mut dyn Coroutine,
        deadline: Instant,
        resume_at: Instant,
    ) -> Self {
        Tcb {
            id,
            k: Continuation::new(),
            deadline,
            resume_at,
            cancelled: false,
            body,
        }
    }

    /// Check if task may run at `now`
    #[inline]
    pub fn is_eligible(&self, now: Instant) -> bool {
        self.resume_at.is_at_or_before(now)
    }

    #[inline]
    pub fn state(&self) -> TaskState {
        match self.k.status() {
            Status::Start => TaskState::NotScheduled,
            Status::Suspended(_) => TaskState::Suspended,
            Status::Done => TaskState::Done,
        }
    }
}
