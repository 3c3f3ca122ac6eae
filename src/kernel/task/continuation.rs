//! Stackless continuation
//!
//! A continuation records where a procedure suspended. Resuming hands the
//! recorded point back to the procedure, which dispatches on it and
//! continues with the statement after that suspension point. No stack is
//! saved: anything that has to survive a suspension lives in the record
//! that owns the continuation.

/// Where a procedure resumes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Resume {
    /// First invocation, run from the top
    Start,
    /// Continue after the suspension point with this token
    At(u16),
}

/// Result of running a procedure for one step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[must_use = "a step must be returned to the continuation that drives it"]
pub enum Step {
    /// Suspended at the point identified by the token
    Suspend(u16),
    /// Ran to completion
    Done,
}

/// Continuation status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Status {
    Start,
    Suspended(u16),
    Done,
}

/// Saved resumption point of one procedure
///
/// Besides backing every scheduled task, a continuation can be embedded in
/// a task record to drive a sub-procedure step by step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Continuation {
    status: Status,
}

impl Continuation {
    pub const fn new() -> Self {
        Self {
            status: Status::Start,
        }
    }

    #[inline]
    pub fn status(&self) -> Status {
        self.status
    }

    #[inline]
    pub fn is_done(&self) -> bool {
        self.status == Status::Done
    }

    /// Rewind to the start
    #[inline]
    pub fn reset(&mut self) {
        self.status = Status::Start;
    }

    /// Run `body` from the saved resumption point for one step
    ///
    /// A finished continuation stays finished and does not call `body`.
    pub fn resume<F>(&mut self, body: F) -> Status
    where
        F: FnOnce(Resume) -> Step,
    {
        let at = match self.status {
            Status::Done => return Status::Done,
            Status::Start => Resume::Start,
            Status::Suspended(token) => Resume::At(token),
        };

        self.status = match body(at) {
            Step::Suspend(token) => Status::Suspended(token),
            Step::Done => Status::Done,
        };
        self.status
    }
}

impl Default for Continuation {
    fn default() -> Self {
        Self::new()
    }
}
