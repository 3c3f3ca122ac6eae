//! Scheduler module
//!
//! Earliest-deadline-first selection over a fixed-capacity registry. Each
//! [`Scheduler::tick`] picks, among the tasks whose `resume_at` has passed,
//! the one with the earliest deadline and runs exactly one step of it.
//! Ties go to the task found first in the registry, which is an artifact of
//! the scan rather than a guarantee.
//!
//! The registry belongs to the scheduling loop. Interrupt handlers talk to
//! tasks through [`SeqCell`](crate::sync::seq::SeqCell) and
//! [`EventQueue`](crate::sync::evq::EventQueue) only.

mod registry;

use registry::Registry;

use crate::config::{CFG_STARVATION_NUDGE, CFG_TASK_MAX};
use crate::critical::is_isr_context;
use crate::error::{KernelError, KernelResult};
use crate::task::{Coroutine, Status, TaskCx, Tcb};
use crate::time::Clock;
use crate::types::{Duration, Instant, TaskId, TaskState};

/// Outcome of one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Tick {
    /// No task was eligible
    Idle,
    /// The task ran one step and suspended
    Ran(TaskId),
    /// The task ran its last step and was removed
    Finished(TaskId),
}

/// EDF scheduler over at most `N` tasks
pub struct Scheduler<'a, C: Clock, const N: usize = CFG_TASK_MAX> {
    clock: C,
    registry: Registry<'a, N>,
    next_id: u16,
}

impl<'a, C: Clock, const N: usize> Scheduler<'a, C, N> {
    pub fn new(clock: C) -> Self {
        Scheduler {
            clock,
            registry: Registry::new(),
            next_id: 0,
        }
    }

    /// Register a task that is eligible now with deadline now
    pub fn spawn(&mut self, body: &'a mut dyn Coroutine) -> KernelResult<TaskId> {
        let now = self.clock.now();
        self.spawn_at(body, now, now)
    }

    /// Register a task with explicit timing fields
    ///
    /// # Returns
    /// * `Ok(id)` - Task registered
    /// * `Err(KernelError::CapacityExceeded)` - All `N` slots are taken
    /// * `Err(KernelError::TaskCreateIsr)` - Called from interrupt context
    pub fn spawn_at(
        &mut self,
        body: &'a mut dyn Coroutine,
        deadline: Instant,
        resume_at: Instant,
    ) -> KernelResult<TaskId> {
        if is_isr_context() {
            return Err(KernelError::TaskCreateIsr);
        }

        if self.registry.is_full() {
            crate::warn!("registry full, {} tasks", N);
            return Err(KernelError::CapacityExceeded);
        }

        let id = self.alloc_id();
        self.registry.push(Tcb::new(id, body, deadline, resume_at))?;
        crate::trace!("task {} spawned", id.raw());
        Ok(id)
    }

    /// Ask a task to stop
    ///
    /// The task becomes eligible immediately, sees
    /// [`TaskCx::is_cancelled`] on its next step and is removed at the end
    /// of that step.
    pub fn cancel(&mut self, id: TaskId) -> KernelResult<()> {
        if is_isr_context() {
            return Err(KernelError::TaskCancelIsr);
        }

        let now = self.clock.now();
        let idx = self.registry.position(id).ok_or(KernelError::TaskNotExist)?;
        let tcb = self.registry.get_mut(idx).ok_or(KernelError::TaskNotExist)?;

        tcb.cancelled = true;
        if now.is_before(tcb.resume_at) {
            tcb.resume_at = now;
        }
        crate::debug!("task {} cancelled", id.raw());
        Ok(())
    }

    /// Run one step of the earliest-deadline eligible task
    pub fn tick(&mut self) -> Tick {
        debug_assert!(!is_isr_context());

        let now = self.clock.now();
        let Some(idx) = self.select(now) else {
            return Tick::Idle;
        };
        let Some(tcb) = self.registry.get_mut(idx) else {
            return Tick::Idle;
        };

        let Tcb {
            id,
            k,
            deadline,
            resume_at,
            cancelled,
            body,
        } = tcb;
        let id = *id;
        let before = *deadline;

        let mut cx = TaskCx::new(id, now, *deadline, *resume_at, *cancelled);
        let status = k.resume(|at| body.step(at, &mut cx));

        if status == Status::Done || *cancelled {
            self.registry.swap_remove(idx);
            crate::trace!("task {} finished", id.raw());
            return Tick::Finished(id);
        }

        *resume_at = cx.resume_at;
        *deadline = if cx.deadline == before {
            // Polling step: push the task back so siblings get a turn.
            now.later(before) + Duration::from_millis(CFG_STARVATION_NUDGE)
        } else {
            cx.deadline
        };

        Tick::Ran(id)
    }

    /// Tick forever, idling the CPU while nothing is eligible
    pub fn run(&mut self) -> ! {
        loop {
            if self.tick() == Tick::Idle {
                crate::port::idle();
            }
        }
    }

    /// Eligible task with the earliest deadline, first registered on ties
    fn select(&self, now: Instant) -> Option<usize> {
        let mut best: Option<(usize, i32)> = None;

        for (idx, tcb) in self.registry.iter().enumerate() {
            if !tcb.is_eligible(now) {
                continue;
            }
            let key = tcb.deadline.offset_from(now);
            match best {
                Some((_, best_key)) if best_key <= key => {}
                _ => best = Some((idx, key)),
            }
        }

        best.map(|(idx, _)| idx)
    }

    fn alloc_id(&mut self) -> TaskId {
        loop {
            let id = TaskId(self.next_id);
            self.next_id = self.next_id.wrapping_add(1);
            if self.registry.position(id).is_none() {
                return id;
            }
        }
    }

    fn tcb(&self, id: TaskId) -> Option<&Tcb<'a>> {
        self.registry.get(self.registry.position(id)?)
    }

    // ============ Introspection ============

    /// Lifecycle state of a task
    ///
    /// Ids that are no longer registered report [`TaskState::Done`]; a task
    /// observes itself as [`TaskState::Running`] through [`TaskCx::state`].
    pub fn state(&self, id: TaskId) -> TaskState {
        self.tcb(id).map_or(TaskState::Done, Tcb::state)
    }

    pub fn deadline(&self, id: TaskId) -> Option<Instant> {
        self.tcb(id).map(|t| t.deadline)
    }

    pub fn resume_at(&self, id: TaskId) -> Option<Instant> {
        self.tcb(id).map(|t| t.resume_at)
    }

    /// Earliest `resume_at` over all tasks
    pub fn next_wake(&self) -> Option<Instant> {
        let now = self.clock.now();
        self.registry
            .iter()
            .map(|t| t.resume_at)
            .min_by_key(|t| t.offset_from(now))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.registry.len() == 0
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    #[inline]
    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    #[inline]
    pub fn clock(&self) -> &C {
        &self.clock
    }
}

#[cfg(test)]
mod tests {
    use core::cell::Cell;

    use super::*;
    use crate::task::{from_fn, Resume, Step};
    use crate::time::ManualClock;

    /// Finishes after `steps` polling steps
    struct Poller {
        steps: u32,
    }

    impl Coroutine for Poller {
        fn step(&mut self, _at: Resume, cx: &mut TaskCx) -> Step {
            if self.steps <= 1 {
                return cx.done();
            }
            self.steps -= 1;
            cx.yield_now(1)
        }
    }

    fn ms(t: u32) -> Instant {
        Instant::from_millis(t)
    }

    #[test]
    fn test_empty_tick_is_idle() {
        let clock = ManualClock::new(0);
        let mut sched: Scheduler<'_, _, 4> = Scheduler::new(&clock);
        assert!(sched.is_empty());
        assert_eq!(sched.tick(), Tick::Idle);
        assert_eq!(sched.next_wake(), None);
    }

    #[test]
    fn test_earliest_deadline_selected_first() {
        let clock = ManualClock::new(0);
        let (mut a, mut b, mut c) = (Poller { steps: 1 }, Poller { steps: 1 }, Poller { steps: 1 });
        let mut sched: Scheduler<'_, _> = Scheduler::new(&clock);

        let ida = sched.spawn_at(&mut a, ms(10), ms(0)).unwrap();
        let idb = sched.spawn_at(&mut b, ms(5), ms(0)).unwrap();
        let idc = sched.spawn_at(&mut c, ms(20), ms(0)).unwrap();

        assert_eq!(sched.tick(), Tick::Finished(idb));
        assert_eq!(sched.tick(), Tick::Finished(ida));
        assert_eq!(sched.tick(), Tick::Finished(idc));
        assert_eq!(sched.tick(), Tick::Idle);
    }

    #[test]
    fn test_tie_goes_to_first_registered() {
        let clock = ManualClock::new(0);
        let (mut a, mut b) = (Poller { steps: 1 }, Poller { steps: 1 });
        let mut sched: Scheduler<'_, _, 2> = Scheduler::new(&clock);

        let ida = sched.spawn_at(&mut a, ms(7), ms(0)).unwrap();
        let _idb = sched.spawn_at(&mut b, ms(7), ms(0)).unwrap();
        assert_eq!(sched.tick(), Tick::Finished(ida));
    }

    #[test]
    fn test_capacity_exceeded_keeps_registry() {
        let clock = ManualClock::new(0);
        let (mut a, mut b, mut c) = (Poller { steps: 1 }, Poller { steps: 1 }, Poller { steps: 1 });
        let mut sched: Scheduler<'_, _, 2> = Scheduler::new(&clock);

        let ida = sched.spawn_at(&mut a, ms(3), ms(0)).unwrap();
        let idb = sched.spawn_at(&mut b, ms(1), ms(0)).unwrap();
        assert_eq!(sched.spawn(&mut c), Err(KernelError::CapacityExceeded));

        assert_eq!(sched.len(), 2);
        assert_eq!(sched.deadline(ida), Some(ms(3)));
        assert_eq!(sched.deadline(idb), Some(ms(1)));
        assert_eq!(sched.tick(), Tick::Finished(idb));
        assert_eq!(sched.tick(), Tick::Finished(ida));
    }

    #[test]
    fn test_polling_task_is_nudged() {
        let clock = ManualClock::new(0);
        let mut p = Poller { steps: 10 };
        let mut sched: Scheduler<'_, _, 2> = Scheduler::new(&clock);

        let id = sched.spawn_at(&mut p, ms(4), ms(0)).unwrap();
        assert_eq!(sched.tick(), Tick::Ran(id));
        assert_eq!(sched.deadline(id), Some(ms(5)));

        // A deadline already in the past moves past the current time.
        clock.set(ms(100));
        assert_eq!(sched.tick(), Tick::Ran(id));
        assert_eq!(sched.deadline(id), Some(ms(101)));
    }

    #[test]
    fn test_nudge_yields_to_sibling() {
        let clock = ManualClock::new(0);
        let mut hog = Poller { steps: 100 };
        let mut other = Poller { steps: 1 };
        let mut sched: Scheduler<'_, _, 2> = Scheduler::new(&clock);

        let hog_id = sched.spawn_at(&mut hog, ms(0), ms(0)).unwrap();
        let other_id = sched.spawn_at(&mut other, ms(3), ms(0)).unwrap();

        // Deadlines 0, 1, 2 keep the hog first; at 3 the tie goes to the
        // hog again (registered first); at 4 the sibling wins.
        for _ in 0..4 {
            assert_eq!(sched.tick(), Tick::Ran(hog_id));
        }
        assert_eq!(sched.tick(), Tick::Finished(other_id));
    }

    #[test]
    fn test_own_deadline_change_is_kept() {
        let clock = ManualClock::new(0);
        let mut body = from_fn(|at, cx: &mut TaskCx| match at {
            Resume::Start => cx.period(Duration::from_millis(50), 1),
            Resume::At(_) => cx.done(),
        });
        let mut sched: Scheduler<'_, _, 1> = Scheduler::new(&clock);

        let id = sched.spawn_at(&mut body, ms(10), ms(0)).unwrap();
        assert_eq!(sched.tick(), Tick::Ran(id));
        assert_eq!(sched.deadline(id), Some(ms(60)));
        assert_eq!(sched.state(id), TaskState::Suspended);
    }

    #[test]
    fn test_sleep_gates_eligibility() {
        let clock = ManualClock::new(0);
        let wakes = Cell::new(0);
        let mut body = from_fn(|at, cx: &mut TaskCx| match at {
            Resume::Start => cx.sleep(Duration::from_millis(30), 1),
            Resume::At(_) => {
                wakes.set(wakes.get() + 1);
                cx.done()
            }
        });
        let mut sched: Scheduler<'_, _, 1> = Scheduler::new(&clock);

        let id = sched.spawn(&mut body).unwrap();
        assert_eq!(sched.state(id), TaskState::NotScheduled);
        assert_eq!(sched.tick(), Tick::Ran(id));
        assert_eq!(sched.next_wake(), Some(ms(30)));

        clock.set(ms(29));
        assert_eq!(sched.tick(), Tick::Idle);

        clock.set(ms(30));
        assert_eq!(sched.tick(), Tick::Finished(id));
        assert_eq!(wakes.get(), 1);
        assert_eq!(sched.state(id), TaskState::Done);
    }

    #[test]
    fn test_swap_compaction_keeps_ids() {
        let clock = ManualClock::new(0);
        let (mut a, mut b, mut c) = (Poller { steps: 1 }, Poller { steps: 5 }, Poller { steps: 5 });
        let mut sched: Scheduler<'_, _, 3> = Scheduler::new(&clock);

        let ida = sched.spawn_at(&mut a, ms(0), ms(0)).unwrap();
        let idb = sched.spawn_at(&mut b, ms(10), ms(0)).unwrap();
        let idc = sched.spawn_at(&mut c, ms(20), ms(0)).unwrap();

        assert_eq!(sched.tick(), Tick::Finished(ida));
        assert_eq!(sched.len(), 2);
        assert_eq!(sched.deadline(idb), Some(ms(10)));
        assert_eq!(sched.deadline(idc), Some(ms(20)));
        assert_eq!(sched.tick(), Tick::Ran(idb));
    }

    #[test]
    fn test_cancel_wakes_and_finishes() {
        let clock = ManualClock::new(0);
        let saw_cancel = Cell::new(false);
        let mut body = from_fn(|_at, cx: &mut TaskCx| {
            if cx.is_cancelled() {
                saw_cancel.set(true);
            }
            cx.sleep(Duration::from_millis(1000), 1)
        });
        let mut sched: Scheduler<'_, _, 1> = Scheduler::new(&clock);

        let id = sched.spawn(&mut body).unwrap();
        assert_eq!(sched.tick(), Tick::Ran(id));
        assert_eq!(sched.tick(), Tick::Idle);

        sched.cancel(id).unwrap();
        assert_eq!(sched.tick(), Tick::Finished(id));
        assert!(saw_cancel.get());
        assert_eq!(sched.cancel(id), Err(KernelError::TaskNotExist));
    }

    #[test]
    fn test_cancel_removes_task_ignoring_flag() {
        let clock = ManualClock::new(0);
        let steps = Cell::new(0);
        let mut body = from_fn(|_at, _cx: &mut TaskCx| {
            steps.set(steps.get() + 1);
            Step::Suspend(1)
        });
        let mut sched: Scheduler<'_, _, 1> = Scheduler::new(&clock);

        let id = sched.spawn(&mut body).unwrap();
        assert_eq!(sched.tick(), Tick::Ran(id));
        assert_eq!(sched.state(id), TaskState::Suspended);

        sched.cancel(id).unwrap();
        assert_eq!(sched.tick(), Tick::Finished(id));
        assert_eq!(sched.state(id), TaskState::Done);
        assert!(sched.is_empty());
        assert_eq!(steps.get(), 2);
        assert_eq!(sched.tick(), Tick::Idle);
    }

    #[test]
    fn test_task_sees_itself_running() {
        let clock = ManualClock::new(0);
        let seen = Cell::new(None);
        let mut body = from_fn(|_at, cx: &mut TaskCx| {
            seen.set(Some(cx.state()));
            cx.done()
        });
        let mut sched: Scheduler<'_, _, 1> = Scheduler::new(&clock);

        let id = sched.spawn(&mut body).unwrap();
        assert_eq!(sched.state(id), TaskState::NotScheduled);
        assert_eq!(sched.tick(), Tick::Finished(id));
        assert_eq!(seen.get(), Some(TaskState::Running));
        assert_eq!(sched.state(id), TaskState::Done);
    }

    #[test]
    fn test_selection_across_clock_wrap() {
        let clock = ManualClock::new(u32::MAX - 10);
        let (mut early, mut late) = (Poller { steps: 1 }, Poller { steps: 1 });
        let mut sched: Scheduler<'_, _, 2> = Scheduler::new(&clock);

        // Deadline 5 lies after the wrap and must rank behind MAX - 2.
        let id_late = sched.spawn_at(&mut late, ms(5), ms(u32::MAX - 10)).unwrap();
        let id_early = sched.spawn_at(&mut early, ms(u32::MAX - 2), ms(u32::MAX - 10)).unwrap();

        assert_eq!(sched.tick(), Tick::Finished(id_early));
        assert_eq!(sched.tick(), Tick::Finished(id_late));
    }

    #[test]
    fn test_ids_are_unique() {
        let clock = ManualClock::new(0);
        let (mut a, mut b) = (Poller { steps: 1 }, Poller { steps: 1 });
        let mut sched: Scheduler<'_, _, 2> = Scheduler::new(&clock);
        let ida = sched.spawn(&mut a).unwrap();
        let idb = sched.spawn(&mut b).unwrap();
        assert_ne!(ida, idb);
        assert_eq!(sched.capacity(), 2);
    }
}
