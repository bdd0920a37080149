//! The one kernel instance on real hardware.

use spin::Mutex;
use x86_64::instructions::interrupts;

use crate::config::KernelConfig;
use crate::interrupts::pic::Pic8259;
use crate::interrupts::trap::TrapFrame;
use crate::kernel::Kernel;

pub type MachineKernel = Kernel<Pic8259>;

pub static KERNEL: Mutex<MachineKernel> = Mutex::new(Kernel::new(Pic8259::new(), KernelConfig::DEFAULT));

/// Runs `f` on the kernel from process context.
///
/// Interrupts stay off for the duration, so a trap cannot arrive while the
/// lock is held and spin on it forever.
pub fn with_kernel<R>(f: impl FnOnce(&mut MachineKernel) -> R) -> R {
    interrupts::without_interrupts(|| f(&mut KERNEL.lock()))
}

/// Called by the trap stubs with the frame they just built; returns the
/// frame to restore. Interrupt gates clear IF on entry.
#[no_mangle]
extern "C" fn kernel_trap_entry(frame: *mut TrapFrame) -> *mut TrapFrame {
    KERNEL.lock().handle_trap(frame).as_ptr()
}
