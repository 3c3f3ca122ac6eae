//! Task management module
//!
//! A task is a [`Coroutine`] body plus the timing fields the scheduler
//! keeps for it. Bodies dispatch on the [`Resume`] point they are handed and
//! end every step by returning one of the suspension primitives on
//! [`TaskCx`], or [`TaskCx::done`].
//!
//! # Example
//! ```ignore
//! struct Blink {
//!     on: bool,
//! }
//!
//! impl Coroutine for Blink {
//!     fn step(&mut self, at: Resume, cx: &mut TaskCx) -> Step {
//!         match at {
//!             Resume::Start | Resume::At(1) => {
//!                 self.on = !self.on;
//!                 cx.sleep(Duration::from_millis(500), 1)
//!             }
//!             Resume::At(_) => cx.done(),
//!         }
//!     }
//! }
//! ```

mod continuation;
mod tcb;

pub use continuation::{Continuation, Resume, Status, Step};
pub(crate) use tcb::Tcb;

use crate::types::{Duration, Instant, TaskId, TaskState};

/// A task body driven one step at a time
///
/// State that must survive a suspension belongs in `self`; locals of `step`
/// are gone once it returns.
pub trait Coroutine {
    fn step(&mut self, at: Resume, cx: &mut TaskCx) -> Step;
}

/// Task body built from a closure, see [`from_fn`]
pub struct FromFn<F>(F);

/// Adapt a closure into a task body
///
/// The closure's captures play the role of the task record.
pub fn from_fn<F>(f: F) -> FromFn<F>
where
    F: FnMut(Resume, &mut TaskCx) -> Step,
{
    FromFn(f)
}

impl<F> Coroutine for FromFn<F>
where
    F: FnMut(Resume, &mut TaskCx) -> Step,
{
    #[inline]
    fn step(&mut self, at: Resume, cx: &mut TaskCx) -> Step {
        (self.0)(at, cx)
    }
}

/// View of the running task's own scheduling fields
///
/// A task changes its deadline and eligibility time only through the
/// primitives here, each of which is the last thing the step does. Once the
/// task has been cancelled every primitive returns [`Step::Done`] instead of
/// suspending.
#[derive(Debug)]
pub struct TaskCx {
    id: TaskId,
    now: Instant,
    pub(crate) deadline: Instant,
    pub(crate) resume_at: Instant,
    cancelled: bool,
}

impl TaskCx {
    pub(crate) fn new(
        id: TaskId,
        now: Instant,
        deadline: Instant,
        resume_at: Instant,
        cancelled: bool,
    ) -> Self {
        Self {
            id,
            now,
            deadline,
            resume_at,
            cancelled,
        }
    }

    /// Id of the running task
    #[inline]
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Time the scheduler read at the start of this tick
    #[inline]
    pub fn now(&self) -> Instant {
        self.now
    }

    #[inline]
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    #[inline]
    pub fn resume_at(&self) -> Instant {
        self.resume_at
    }

    /// Always [`TaskState::Running`]; a context only exists during a step
    #[inline]
    pub fn state(&self) -> TaskState {
        TaskState::Running
    }

    /// Whether the task has been asked to stop
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Suspend until `at`
    #[inline]
    pub fn wake(&mut self, at: Instant, token: u16) -> Step {
        if self.cancelled {
            return Step::Done;
        }
        self.resume_at = at;
        Step::Suspend(token)
    }

    /// Suspend for `d`
    #[inline]
    pub fn sleep(&mut self, d: Duration, token: u16) -> Step {
        self.wake(self.now + d, token)
    }

    /// Change the deadline without changing when the task may run
    #[inline]
    pub fn resched(&mut self, deadline: Instant, token: u16) -> Step {
        if self.cancelled {
            return Step::Done;
        }
        self.deadline = deadline;
        Step::Suspend(token)
    }

    /// Push the deadline one period further
    #[inline]
    pub fn period(&mut self, delta: Duration, token: u16) -> Step {
        if self.cancelled {
            return Step::Done;
        }
        self.deadline += delta;
        Step::Suspend(token)
    }

    /// Suspend without touching the timing fields
    #[inline]
    pub fn yield_now(&mut self, token: u16) -> Step {
        if self.cancelled {
            return Step::Done;
        }
        Step::Suspend(token)
    }

    /// Finish the task
    #[inline]
    pub fn done(&self) -> Step {
        Step::Done
    }
}
