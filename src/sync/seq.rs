//! Single-writer, multi-reader versioned cell (seqlock)
//!
//! Lets an interrupt handler publish a multi-word value that thread-mode
//! code reads without masking interrupts, even on 8- and 16-bit cores where
//! a plain load of the value would tear.
//!
//! The version counter is odd while a write is in progress and even when
//! the value is stable. A reader snapshots the version, copies the value,
//! snapshots again and retries if the two differ. Writers never wait.
//! Wraparound of the counter is harmless because readers only compare
//! snapshots for equality.
//!
//! Readers can spin while writes keep landing; how long is bounded only by
//! the write rate of whatever drives the cell.

use core::cell::UnsafeCell;
use core::ptr;

use portable_atomic::{fence, AtomicBool, AtomicUsize, Ordering};

use crate::error::{KernelError, KernelResult};

/// Versioned value shared by one writer and any number of readers
pub struct SeqCell<T> {
    version: AtomicUsize,
    claimed: AtomicBool,
    value: UnsafeCell<T>,
}

/// Byte-range flavour of [`SeqCell`]
pub type SeqBytes<const N: usize> = SeqCell<[u8; N]>;

// SAFETY: only the single `SeqWriter` mutates `value`, and readers validate
// every copy against the version counter before using it.
unsafe impl<T: Copy + Send> Sync for SeqCell<T> {}

impl<T: Copy> SeqCell<T> {
    pub const fn new(value: T) -> Self {
        Self {
            version: AtomicUsize::new(0),
            claimed: AtomicBool::new(false),
            value: UnsafeCell::new(value),
        }
    }

    /// Claim the write side
    ///
    /// At most one writer exists at a time; it is released on drop, so an
    /// interrupt handler may claim it on every invocation.
    ///
    /// # Returns
    /// * `Ok(writer)` - This caller is now the only writer
    /// * `Err(KernelError::WriterClaimed)` - Another writer is alive
    pub fn writer(&self) -> KernelResult<SeqWriter<'_, T>> {
        if self.claimed.swap(true, Ordering::Acquire) {
            return Err(KernelError::WriterClaimed);
        }
        Ok(SeqWriter { cell: self })
    }

    /// Read a consistent copy of the value, retrying across concurrent writes
    pub fn read(&self) -> T {
        loop {
            if let Some(value) = self.try_read() {
                return value;
            }
            core::hint::spin_loop();
        }
    }

    /// One read attempt
    ///
    /// Returns `None` if a write was in progress or landed during the copy.
    pub fn try_read(&self) -> Option<T> {
        self.read_with(|p| unsafe { ptr::read_volatile(p) })
    }

    /// Current version, even when stable
    #[inline]
    pub fn version(&self) -> usize {
        self.version.load(Ordering::Acquire)
    }

    /// Direct access through exclusive ownership
    #[inline]
    pub fn get_mut(&mut self) -> &mut T {
        self.value.get_mut()
    }

    /// Run `copy` between the two version snapshots
    fn read_with<R>(&self, copy: impl FnOnce(*const T) -> R) -> Option<R> {
        let before = self.version.load(Ordering::Acquire);
        if before & 1 != 0 {
            return None;
        }

        let out = copy(self.value.get());

        fence(Ordering::Acquire);
        let after = self.version.load(Ordering::Relaxed);
        (before == after).then_some(out)
    }
}

impl<T: Copy + Default> Default for SeqCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<const N: usize> SeqCell<[u8; N]> {
    /// Copy `out.len()` bytes starting at `offset` into `out`
    ///
    /// The whole range is recopied whenever a write interferes.
    pub fn read_range(&self, offset: usize, out: &mut [u8]) -> KernelResult<()> {
        check_range::<N>(offset, out.len())?;
        loop {
            let done = self.read_with(|p| {
                let base = p.cast::<u8>();
                for (i, byte) in out.iter_mut().enumerate() {
                    // SAFETY: `offset + i < N` was checked above.
                    *byte = unsafe { ptr::read_volatile(base.add(offset + i)) };
                }
            });
            if done.is_some() {
                return Ok(());
            }
            core::hint::spin_loop();
        }
    }
}

/// Write side of a [`SeqCell`]
pub struct SeqWriter<'a, T: Copy> {
    cell: &'a SeqCell<T>,
}

impl<'a, T: Copy> SeqWriter<'a, T> {
    /// Publish a new value
    pub fn write(&mut self, value: T) {
        self.write_with(|p| unsafe { ptr::write_volatile(p, value) });
    }

    /// Read-modify-write the value
    pub fn update(&mut self, f: impl FnOnce(&mut T)) {
        let mut value = self.current();
        f(&mut value);
        self.write(value);
    }

    /// The value as last written
    ///
    /// The writer is the only mutator, so no version check is needed.
    pub fn current(&self) -> T {
        // SAFETY: no other writer exists while `self` is alive.
        unsafe { ptr::read_volatile(self.cell.value.get()) }
    }

    /// Mark the version odd, run `store`, then mark it even again
    fn write_with(&mut self, store: impl FnOnce(*mut T)) {
        let version = &self.cell.version;
        let v = version.load(Ordering::Relaxed);

        version.store(v.wrapping_add(1), Ordering::Relaxed);
        fence(Ordering::Release);

        store(self.cell.value.get());

        version.store(v.wrapping_add(2), Ordering::Release);
    }
}

impl<'a, const N: usize> SeqWriter<'a, [u8; N]> {
    /// Overwrite the bytes starting at `offset` with `src`
    pub fn write_range(&mut self, offset: usize, src: &[u8]) -> KernelResult<()> {
        check_range::<N>(offset, src.len())?;
        self.write_with(|p| {
            let base = p.cast::<u8>();
            for (i, byte) in src.iter().enumerate() {
                // SAFETY: `offset + i < N` was checked above.
                unsafe { ptr::write_volatile(base.add(offset + i), *byte) };
            }
        });
        Ok(())
    }
}

impl<T: Copy> Drop for SeqWriter<'_, T> {
    fn drop(&mut self) {
        self.cell.claimed.store(false, Ordering::Release);
    }
}

fn check_range<const N: usize>(offset: usize, len: usize) -> KernelResult<()> {
    match offset.checked_add(len) {
        Some(end) if end <= N => Ok(()),
        _ => Err(KernelError::RangeInvalid),
    }
}
