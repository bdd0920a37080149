//! # Kernel Configuration
//!
//! Capacities are compile-time constants: every pool in the kernel is a
//! fixed-size arena sized from here, and none of them grow at runtime.
//!
//! | Constant              | Value | Meaning                              |
//! |-----------------------|-------|--------------------------------------|
//! | `PROC_MAX`            | 10    | process table slots (idle included)  |
//! | `PROC_NAME_LEN`       | 32    | bytes kept from a process name       |
//! | `PROC_STACK_SIZE`     | 8192  | bytes of stack per process           |
//! | `TIMERS_MAX`          | 32    | timer callback slots                 |
//! | `SCHEDULER_TIMESLICE` | 250   | ticks a process runs before rotation |
//! | `TIMER_HZ`            | 100   | PIT ticks per second                 |
//!
//! Everything that may reasonably differ between boots lives in
//! [`KernelConfig`].

use log::LevelFilter;

pub const PROC_MAX: usize = 10;
pub const PROC_NAME_LEN: usize = 32;
pub const PROC_STACK_SIZE: usize = 8192;
pub const TIMERS_MAX: usize = 32;
pub const SCHEDULER_TIMESLICE: u32 = 250;
pub const TIMER_HZ: u32 = 100;

/// Runtime knobs handed to [`crate::kernel::Kernel`] at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelConfig {
    /// Ticks a process may hold the CPU before the scheduler rotates.
    pub timeslice: u32,
    /// Code segment selector written into every initial trap frame.
    pub code_selector: u16,
    /// Stack segment selector written into every initial trap frame.
    pub data_selector: u16,
    pub log_level: LevelFilter,
    /// Ticks between two status reports. Zero disables the report.
    pub status_interval: u32,
    /// Execute `int3` from the panic handler before halting.
    pub break_on_panic: bool,
}

impl KernelConfig {
    pub const DEFAULT: Self = Self {
        timeslice: SCHEDULER_TIMESLICE,
        code_selector: 0x08,
        data_selector: 0x10,
        log_level: LevelFilter::Info,
        status_interval: 10 * TIMER_HZ,
        break_on_panic: false,
    };

    pub const fn with_timeslice(mut self, timeslice: u32) -> Self {
        self.timeslice = timeslice;
        self
    }

    pub const fn with_selectors(mut self, code: u16, data: u16) -> Self {
        self.code_selector = code;
        self.data_selector = data;
        self
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
