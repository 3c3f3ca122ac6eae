//! Task registry - fixed-capacity table of TCBs
//!
//! Removal swaps the last entry into the freed slot, so the order of
//! remaining tasks is not preserved.

use heapless::Vec;

use crate::error::{KernelError, KernelResult};
use crate::task::Tcb;
use crate::types::TaskId;

/// Fixed-capacity task table
pub(crate) struct Registry<'a, const N: usize> {
    tasks: Vec<Tcb<'a>, N>,
}

impl<'a, const N: usize> Registry<'a, N> {
    pub const fn new() -> Self {
        Registry { tasks: Vec::new() }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.tasks.is_full()
    }

    /// Append a TCB, returning its slot index
    pub fn push(&mut self, tcb: Tcb<'a>) -> KernelResult<usize> {
        self.tasks.push(tcb).map_err(|_| KernelError::CapacityExceeded)?;
        Ok(self.tasks.len() - 1)
    }

    /// Remove the TCB at `idx`, moving the last TCB into its slot
    pub fn swap_remove(&mut self, idx: usize) -> Option<Tcb<'a>> {
        (idx < self.tasks.len()).then(|| self.tasks.swap_remove(idx))
    }

    #[inline]
    pub fn get(&self, idx: usize) -> Option<&Tcb<'a>> {
        self.tasks.get(idx)
    }

    #[inline]
    pub fn get_mut(&mut self, idx: usize) -> Option<&mut Tcb<'a>> {
        self.tasks.get_mut(idx)
    }

    /// Slot index of the task with `id`
    pub fn position(&self, id: TaskId) -> Option<usize> {
        self.iter().position(|t| t.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tcb<'a>> {
        self.tasks.iter()
    }
}
