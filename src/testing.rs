//! Host-side doubles for the hardware seams.

use core::ptr::NonNull;

use crate::interrupts::pic::{Bank, InterruptController};
use crate::interrupts::trap::{TrapEntry, TrapFrame};
use crate::kernel::Kernel;

/// Records what the kernel asked of the PIC instead of doing port I/O.
pub struct MockController {
    pub masks: [u8; 2],
    /// EOIs sent, per bank.
    pub eoi: [u32; 2],
    pub gates: [Option<TrapEntry>; 256],
}

impl MockController {
    /// Every line masked, cascade included.
    pub fn new() -> Self {
        Self {
            masks: [0xFF, 0xFF],
            eoi: [0, 0],
            gates: [None; 256],
        }
    }
}

impl InterruptController for MockController {
    fn install_gate(&mut self, vector: u8, entry: TrapEntry) {
        self.gates[vector as usize] = Some(entry);
    }

    fn read_mask(&mut self, bank: Bank) -> u8 {
        self.masks[bank.index()]
    }

    fn write_mask(&mut self, bank: Bank, mask: u8) {
        self.masks[bank.index()] = mask;
    }

    fn end_of_interrupt(&mut self, bank: Bank) {
        self.eoi[bank.index()] += 1;
    }
}

/// A plausible, never-called stub address.
pub fn entry() -> TrapEntry {
    TrapEntry::new(0xffff_8000_0010_0000)
}

pub extern "C" fn parked() -> ! {
    loop {
        core::hint::spin_loop();
    }
}

/// Delivers `vector` the way a stub would: on the current process's stack.
pub fn trap(kernel: &mut Kernel<MockController>, vector: u8) -> NonNull<TrapFrame> {
    let frame = kernel.current_frame();
    deliver(kernel, frame, vector)
}

/// Delivers `vector` with the stub's frame at `frame`, on whatever stack
/// that is.
pub fn deliver(kernel: &mut Kernel<MockController>, frame: NonNull<TrapFrame>, vector: u8) -> NonNull<TrapFrame> {
    let frame = frame.as_ptr();
    unsafe { (*frame).vector = vector as u64 };
    kernel.handle_trap(frame)
}
