//! Event queue
//!
//! Interrupt handlers record small event codes here and the scheduling
//! loop drains them. Codes of `BITS` bits are packed into one word; the
//! head sits in the low bits. Every operation runs in a short critical
//! section, so producers and consumers may live in either context.
//!
//! Full and empty are reported to the caller, who decides whether to drop
//! the event or apply backpressure.

use crate::config::CFG_EVQ_WORD_BITS;
use crate::critical::critical_section;
use crate::cs_cell::CsCell;
use crate::error::{KernelError, KernelResult};

struct Packed {
    word: u32,
    len: u8,
}

/// Fixed-capacity FIFO of `BITS`-bit codes
pub struct EventQueue<const BITS: u32> {
    inner: CsCell<Packed>,
}

impl<const BITS: u32> EventQueue<BITS> {
    /// Number of codes the queue holds
    pub const CAPACITY: usize = {
        assert!(BITS >= 1 && BITS <= CFG_EVQ_WORD_BITS, "event width must be 1..=32 bits");
        (CFG_EVQ_WORD_BITS / BITS) as usize
    };

    /// Mask of one slot
    const MASK: u32 = if BITS >= u32::BITS { u32::MAX } else { (1 << BITS) - 1 };

    pub const fn new() -> Self {
        // Forces the width check at build time.
        let _ = Self::CAPACITY;
        Self {
            inner: CsCell::new(Packed { word: 0, len: 0 }),
        }
    }

    /// Append `code` at the tail
    ///
    /// # Returns
    /// * `Ok(())` - Code queued
    /// * `Err(KernelError::QueueFull)` - No room, queue unchanged
    /// * `Err(KernelError::EventCodeInvalid)` - Code wider than `BITS`
    pub fn push(&self, code: u32) -> KernelResult<()> {
        if code & !Self::MASK != 0 {
            return Err(KernelError::EventCodeInvalid);
        }

        critical_section(|cs| {
            self.inner.with(cs, |q| {
                if q.len as usize >= Self::CAPACITY {
                    return Err(KernelError::QueueFull);
                }
                q.word |= code << (BITS * q.len as u32);
                q.len += 1;
                Ok(())
            })
        })
    }

    /// Remove the code at the head
    ///
    /// # Returns
    /// * `Ok(code)` - Oldest queued code
    /// * `Err(KernelError::QueueEmpty)` - Nothing queued, queue unchanged
    pub fn pop(&self) -> KernelResult<u32> {
        critical_section(|cs| {
            self.inner.with(cs, |q| {
                if q.len == 0 {
                    return Err(KernelError::QueueEmpty);
                }
                let code = q.word & Self::MASK;
                q.word = q.word.checked_shr(BITS).unwrap_or(0);
                q.len -= 1;
                Ok(code)
            })
        })
    }

    /// Head code without removing it
    pub fn peek(&self) -> Option<u32> {
        critical_section(|cs| self.inner.with(cs, |q| (q.len > 0).then_some(q.word & Self::MASK)))
    }

    pub fn len(&self) -> usize {
        critical_section(|cs| self.inner.with(cs, |q| q.len as usize))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() >= Self::CAPACITY
    }

    /// Drop every queued code
    pub fn clear(&self) {
        critical_section(|cs| {
            self.inner.with(cs, |q| {
                q.word = 0;
                q.len = 0;
            })
        });
    }
}

impl<const BITS: u32> Default for EventQueue<BITS> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let q: EventQueue<4> = EventQueue::new();
        q.push(1).unwrap();
        q.push(2).unwrap();
        assert_eq!(q.peek(), Some(1));
        assert_eq!(q.pop(), Ok(1));
        assert_eq!(q.pop(), Ok(2));
        assert_eq!(q.pop(), Err(KernelError::QueueEmpty));
    }

    #[test]
    fn test_capacity_by_width() {
        assert_eq!(EventQueue::<1>::CAPACITY, 32);
        assert_eq!(EventQueue::<4>::CAPACITY, 8);
        assert_eq!(EventQueue::<5>::CAPACITY, 6);
        assert_eq!(EventQueue::<32>::CAPACITY, 1);
    }

    #[test]
    fn test_full_leaves_queue_unchanged() {
        let q: EventQueue<8> = EventQueue::new();
        for code in [10, 20, 30, 40] {
            q.push(code).unwrap();
        }
        assert!(q.is_full());
        assert_eq!(q.push(50), Err(KernelError::QueueFull));
        assert_eq!(q.len(), 4);
        for code in [10, 20, 30, 40] {
            assert_eq!(q.pop(), Ok(code));
        }
        assert!(q.is_empty());
    }

    #[test]
    fn test_empty_pop_leaves_queue_unchanged() {
        let q: EventQueue<2> = EventQueue::new();
        assert_eq!(q.pop(), Err(KernelError::QueueEmpty));
        assert_eq!(q.len(), 0);
        q.push(3).unwrap();
        assert_eq!(q.pop(), Ok(3));
    }

    #[test]
    fn test_code_too_wide() {
        let q: EventQueue<3> = EventQueue::new();
        assert_eq!(q.push(8), Err(KernelError::EventCodeInvalid));
        assert!(q.is_empty());
        q.push(7).unwrap();
        assert_eq!(q.pop(), Ok(7));
    }

    #[test]
    fn test_full_width_slot() {
        let q: EventQueue<32> = EventQueue::new();
        q.push(u32::MAX).unwrap();
        assert_eq!(q.push(1), Err(KernelError::QueueFull));
        assert_eq!(q.pop(), Ok(u32::MAX));
        assert!(q.is_empty());
    }

    #[test]
    fn test_interleaved_and_clear() {
        let q: EventQueue<4> = EventQueue::new();
        q.push(1).unwrap();
        q.push(2).unwrap();
        assert_eq!(q.pop(), Ok(1));
        q.push(3).unwrap();
        assert_eq!(q.pop(), Ok(2));
        assert_eq!(q.pop(), Ok(3));

        q.push(9).unwrap();
        q.clear();
        assert_eq!(q.peek(), None);
        assert_eq!(q.pop(), Err(KernelError::QueueEmpty));
    }
}
