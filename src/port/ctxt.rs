//! Full-stack context switching
//!
//! An alternative to stackless tasks for code that has to block deep in a
//! call chain. Each context owns a stack; [`Context::switch`] saves the
//! running one and continues another.
//!
//! On Cortex-M the switch happens in PendSV (enable the `ctxt` feature):
//! the handler pushes r4-r11 and EXC_RETURN onto the process stack, hands
//! the stack pointer to [`finish_switch`] and pops the next context's
//! registers from the pointer it gets back. Other targets only request the
//! switch; their platform handler must call [`finish_switch`] itself.

use core::ptr;

use portable_atomic::{AtomicPtr, Ordering};

use crate::error::{KernelError, KernelResult};

/// Entry point of a full-stack context, receives the `arg` given to
/// [`Context::prepare`]
pub type Entry = extern "C" fn(usize) -> !;

/// Save and switch capability of a port
pub trait Context: Sized {
    /// Lay out a context on `stack` that starts in `entry(arg)` the first
    /// time it is switched to
    ///
    /// # Returns
    /// * `Ok(cx)` - Context ready to be switched to
    /// * `Err(KernelError::RangeInvalid)` - `stack` cannot hold the initial frame
    fn prepare(stack: &'static mut [u32], entry: Entry, arg: usize) -> KernelResult<Self>;

    /// Record the stack pointer the context was suspended at
    fn save(&mut self, sp: *mut u32);

    /// Stack pointer to restore from when the context resumes
    fn stack_ptr(&self) -> *mut u32;

    /// Suspend the running context into `from` and continue `to`
    ///
    /// Returns once some other context switches back to `from`.
    ///
    /// # Safety
    /// `from` must be the running context, and both contexts must stay in
    /// place until the switch has completed.
    unsafe fn switch(from: &mut Self, to: &Self);
}

/// Stack pointer based context used by the Cortex-M port
#[derive(Debug)]
pub struct StackContext {
    sp: *mut u32,
}

/// Words pushed by software: r4-r11, EXC_RETURN
const SW_FRAME_WORDS: usize = 9;
/// Words pushed by the exception entry: r0-r3, r12, lr, pc, xPSR
const HW_FRAME_WORDS: usize = 8;
const FRAME_WORDS: usize = SW_FRAME_WORDS + HW_FRAME_WORDS;

/// Return to thread mode on the process stack
const EXC_RETURN_THREAD_PSP: u32 = 0xFFFF_FFFD;
/// Thumb state bit
const XPSR_THUMB: u32 = 0x0100_0000;

impl Context for StackContext {
    fn prepare(stack: &'static mut [u32], entry: Entry, arg: usize) -> KernelResult<Self> {
        // Exception frames must start on an 8-byte boundary.
        let base = stack.as_ptr() as usize;
        let top = (base + stack.len() * 4) & !7;
        let words = (top - base) / 4;
        let start = words.checked_sub(FRAME_WORDS).ok_or(KernelError::RangeInvalid)?;

        let frame = &mut stack[start..start + FRAME_WORDS];
        frame.copy_from_slice(&[
            // r4-r11, filled with a recognisable pattern
            0x0404_0404,
            0x0505_0505,
            0x0606_0606,
            0x0707_0707,
            0x0808_0808,
            0x0909_0909,
            0x1010_1010,
            0x1111_1111,
            EXC_RETURN_THREAD_PSP,
            // r0
            arg as u32,
            // r1-r3, r12
            0,
            0,
            0,
            0,
            // lr
            context_return as usize as u32,
            // pc
            entry as usize as u32 | 1,
            XPSR_THUMB,
        ]);

        Ok(StackContext {
            sp: frame.as_mut_ptr(),
        })
    }

    #[inline]
    fn save(&mut self, sp: *mut u32) {
        self.sp = sp;
    }

    #[inline]
    fn stack_ptr(&self) -> *mut u32 {
        self.sp
    }

    unsafe fn switch(from: &mut Self, to: &Self) {
        request(from, to);
        crate::port::pend_switch();
    }
}

/// Context being switched away from, null before the first switch
pub(crate) static SWITCH_FROM: AtomicPtr<StackContext> = AtomicPtr::new(ptr::null_mut());
/// Context being switched to, null when no switch is pending
pub(crate) static SWITCH_TO: AtomicPtr<StackContext> = AtomicPtr::new(ptr::null_mut());

pub(crate) fn request(from: *mut StackContext, to: *const StackContext) {
    SWITCH_TO.store(to.cast_mut(), Ordering::Release);
    SWITCH_FROM.store(from, Ordering::Release);
}

/// Complete a pending switch
///
/// Called by the platform switch handler with the stack pointer of the
/// suspended context. Returns the stack pointer to restore, or null when
/// no switch is pending.
///
/// # Safety
/// The contexts passed to the pending [`Context::switch`] must still be
/// alive.
#[no_mangle]
pub unsafe extern "C" fn finish_switch(sp: *mut u32) -> *mut u32 {
    let to = SWITCH_TO.swap(ptr::null_mut(), Ordering::AcqRel);
    let from = SWITCH_FROM.swap(ptr::null_mut(), Ordering::AcqRel);

    // SAFETY: both pointers came from live references in `switch`.
    let Some(to) = (unsafe { to.as_ref() }) else {
        return ptr::null_mut();
    };
    if let Some(from) = unsafe { from.as_mut() } {
        from.save(sp);
    }
    to.stack_ptr()
}

/// Landing pad for an entry function that returns anyway
extern "C" fn context_return() -> ! {
    loop {
        crate::port::idle();
    }
}

/// Leave the boot stack and run `to`
///
/// # Safety
/// `to` must live for the rest of the program.
#[cfg(all(target_arch = "arm", feature = "ctxt"))]
pub unsafe fn start(to: &StackContext) -> ! {
    use cortex_m::peripheral::scb::SystemHandler;

    let mut scb = unsafe { cortex_m::Peripherals::steal() }.SCB;
    // SAFETY: lowest priority, so the switch never preempts another handler.
    unsafe { scb.set_priority(SystemHandler::PendSV, 0xF0) };

    request(ptr::null_mut(), to);
    crate::port::pend_switch();
    loop {
        crate::port::idle();
    }
}
