//! Error types for the kernel
//!
//! Every fallible operation returns a `Result`; nothing in the kernel panics
//! on a caller mistake.

/// Kernel error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum KernelError {
    // ============ Registry errors ============
    /// Task registry is full
    CapacityExceeded = 10001,
    /// No task with the given id is registered
    TaskNotExist = 10002,
    /// Cannot register a task from ISR
    TaskCreateIsr = 10003,
    /// Cannot cancel a task from ISR
    TaskCancelIsr = 10004,

    // ============ Queue errors ============
    /// Queue is full
    QueueFull = 20001,
    /// Queue is empty
    QueueEmpty = 20002,
    /// Event code does not fit in a queue slot
    EventCodeInvalid = 20003,

    // ============ Cell errors ============
    /// The cell already has a writer
    WriterClaimed = 30001,
    /// Byte range lies outside the cell
    RangeInvalid = 30002,
}

/// Result type alias for kernel operations
pub type KernelResult<T> = Result<T, KernelError>;

impl KernelError {
    /// Numeric error code
    #[inline]
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Whether the error reports a full or empty queue
    #[inline]
    pub fn is_queue_status(self) -> bool {
        matches!(self, KernelError::QueueFull | KernelError::QueueEmpty)
    }
}
