//! Interrupt plumbing: trap frames, the vector table, and the PIC.
//!
//! `dispatch`, `pic` and `trap` are plain data and build everywhere. The
//! descriptor tables and exception handlers touch the CPU directly and only
//! exist in the bare-metal build.

pub mod dispatch;
#[cfg(target_os = "none")]
pub mod gdt;
#[cfg(target_os = "none")]
#[allow(clippy::module_inception)]
pub mod interrupts;
pub mod pic;
pub mod trap;

pub use dispatch::Dispatcher;
pub use pic::{Bank, InterruptController, IrqLine};
pub use trap::{TrapEntry, TrapFrame};

/// Loads the GDT/TSS, the exception gates, and remaps the PIC.
#[cfg(target_os = "none")]
pub fn init(pic: &mut pic::Pic8259) {
    gdt::init();
    interrupts::init_idt();
    pic.initialize();
}
