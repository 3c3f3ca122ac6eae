//! Cortex-M port implementation
//!
//! SysTick drives the millisecond clock; the scheduler sleeps on WFI while
//! no task is eligible. With the `ctxt` feature PendSV performs full-stack
//! context switches.

use cortex_m::peripheral::syst::SystClkSource;

/// Initialize SysTick timer for the kernel tick
///
/// # Arguments
/// * `cnts` - Core clock cycles per tick
///
/// # Example
/// For 16MHz clock with 1000Hz tick rate: cnts = 16_000_000 / 1000 = 16_000
pub fn systick_init(cnts: u32) {
    // SAFETY: SYST is only configured here, before the scheduler runs.
    let mut p = unsafe { cortex_m::Peripherals::steal() };

    p.SYST.set_reload(cnts.saturating_sub(1));
    p.SYST.clear_current();
    p.SYST.set_clock_source(SystClkSource::Core);
    p.SYST.enable_interrupt();
    p.SYST.enable_counter();
}

/// Sleep until the next interrupt
#[inline(always)]
pub fn idle() {
    cortex_m::asm::wfi();
}

/// Pend the context switch handler
#[inline(always)]
pub fn pend_switch() {
    cortex_m::peripheral::SCB::set_pendsv();
}

/// PendSV exception handler - performs the full context switch
///
/// 1. Save r4-r11 and EXC_RETURN below the current PSP (skipped on the
///    first switch, which leaves the boot stack)
/// 2. Let `finish_switch` record that pointer and pick the next context
/// 3. Restore r4-r11 and EXC_RETURN from the next context's stack
/// 4. Exception return onto the process stack
#[cfg(feature = "ctxt")]
#[no_mangle]
#[unsafe(naked)]
pub unsafe extern "C" fn PendSV() {
    use crate::port::ctxt::SWITCH_FROM;

    core::arch::naked_asm!(
        "cpsid i",
        "dsb",
        "isb",

        "mrs r0, psp",

        "ldr r1, ={from}",
        "ldr r1, [r1]",
        "cbz r1, 1f",

        "stmdb r0!, {{r4-r11, lr}}",

        "1:",
        // keep EXC_RETURN across the call, r4 pads to 8 bytes
        "push {{r4, lr}}",
        "bl {finish}",
        "pop {{r4, lr}}",

        "cbz r0, 2f",
        "ldmia r0!, {{r4-r11, lr}}",
        "msr psp, r0",

        "2:",
        "cpsie i",
        "dsb",
        "isb",

        "bx lr",

        from = sym SWITCH_FROM,
        finish = sym crate::port::ctxt::finish_switch,
    );
}
