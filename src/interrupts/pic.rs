//! # Programmable Interrupt Controller (8259 PIC)
//!
//! Line masking and acknowledgement for the two chained 8259 chips.
//!
//! ## PIC Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐
//! │   PIC 1     │     │   PIC 2     │
//! │  (Primary)  │◀────│ (Secondary) │
//! │ IRQ 0-7     │IRQ2 │ IRQ 8-15    │
//! └─────────────┘     └─────────────┘
//!       │
//!       ▼
//!     CPU
//! ```
//!
//! ## Vector Remapping
//!
//! - PIC 1: vectors 32-39 (IRQ 0-7)
//! - PIC 2: vectors 40-47 (IRQ 8-15)
//!
//! ## Interrupt Assignments
//!
//! | IRQ | Vector | Device        |
//! |-----|--------|---------------|
//! | 0   | 32     | PIT timer     |
//! | 2   | 34     | cascade       |
//! | 4   | 36     | COM1 (serial) |
//!
//! Secondary-bank lines reach the CPU through the cascade line, so a line on
//! PIC 2 is only deliverable while IRQ2 is unmasked on PIC 1, and finishing
//! one needs an EOI on both chips.

use crate::interrupts::trap::TrapEntry;

pub const PIC_1_OFFSET: u8 = 32; // Primary PIC handles IRQs 0-7
pub const PIC_2_OFFSET: u8 = 40; // Secondary PIC handles IRQs 8-15

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bank {
    Primary,
    Secondary,
}

impl Bank {
    pub const fn index(self) -> usize {
        match self {
            Bank::Primary => 0,
            Bank::Secondary => 1,
        }
    }
}

/// One of the sixteen PIC input lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IrqLine(u8);

impl IrqLine {
    pub const TIMER: IrqLine = IrqLine(0);
    pub const CASCADE: IrqLine = IrqLine(2);
    pub const COM1: IrqLine = IrqLine(4);

    pub const fn new(line: u8) -> Option<Self> {
        if line < 16 {
            Some(Self(line))
        } else {
            None
        }
    }

    /// The line a remapped vector belongs to, if any.
    pub const fn from_vector(vector: u8) -> Option<Self> {
        if vector >= PIC_1_OFFSET && vector < PIC_2_OFFSET + 8 {
            Some(Self(vector - PIC_1_OFFSET))
        } else {
            None
        }
    }

    pub const fn vector(self) -> u8 {
        PIC_1_OFFSET + self.0
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub const fn bank(self) -> Bank {
        if self.0 < 8 {
            Bank::Primary
        } else {
            Bank::Secondary
        }
    }

    /// Mask bit of this line inside its own bank.
    pub const fn bit(self) -> u8 {
        1 << (self.0 % 8)
    }
}

/// Hardware seam for gate installation, line masking and acknowledgement.
///
/// Implementors supply the four port-level primitives; the line-level
/// operations are built on top of them.
pub trait InterruptController {
    /// Points IDT `vector` at `entry`.
    fn install_gate(&mut self, vector: u8, entry: TrapEntry);

    /// Current mask register of `bank`; a set bit means masked.
    fn read_mask(&mut self, bank: Bank) -> u8;

    fn write_mask(&mut self, bank: Bank, mask: u8);

    /// Non-specific EOI to one chip.
    fn end_of_interrupt(&mut self, bank: Bank);

    fn unmask_line(&mut self, line: IrqLine) {
        let bank = line.bank();
        let mask = self.read_mask(bank) & !line.bit();
        self.write_mask(bank, mask);

        if bank == Bank::Secondary && !self.line_enabled(IrqLine::CASCADE) {
            self.unmask_line(IrqLine::CASCADE);
        }
    }

    fn mask_line(&mut self, line: IrqLine) {
        let bank = line.bank();
        let mask = self.read_mask(bank) | line.bit();
        self.write_mask(bank, mask);
    }

    fn line_enabled(&mut self, line: IrqLine) -> bool {
        self.read_mask(line.bank()) & line.bit() == 0
    }

    /// Acknowledges `line` so the chip will deliver it again.
    fn dismiss(&mut self, line: IrqLine) {
        if line.bank() == Bank::Secondary {
            self.end_of_interrupt(Bank::Secondary);
        }
        self.end_of_interrupt(Bank::Primary);
    }
}

#[cfg(target_os = "none")]
pub use self::hardware::Pic8259;

#[cfg(target_os = "none")]
mod hardware {
    use super::{Bank, InterruptController, PIC_1_OFFSET, PIC_2_OFFSET};
    use crate::interrupts::{interrupts, trap::TrapEntry};
    use pic8259::ChainedPics;
    use x86_64::instructions::port::Port;

    const PIC_1_COMMAND: u16 = 0x20;
    const PIC_2_COMMAND: u16 = 0xA0;
    const CMD_END_OF_INTERRUPT: u8 = 0x20;

    /// The legacy chained 8259 pair, remapped to vectors 32-47.
    pub struct Pic8259 {
        pics: ChainedPics,
    }

    impl Pic8259 {
        pub const fn new() -> Self {
            Self {
                pics: unsafe { ChainedPics::new(PIC_1_OFFSET, PIC_2_OFFSET) },
            }
        }

        /// Remaps both chips and masks every line but the cascade.
        pub fn initialize(&mut self) {
            unsafe {
                self.pics.initialize();
                self.pics.write_masks(0xFF & !(1 << 2), 0xFF);
            }
        }
    }

    impl InterruptController for Pic8259 {
        fn install_gate(&mut self, vector: u8, entry: TrapEntry) {
            interrupts::install_gate(vector, entry);
        }

        fn read_mask(&mut self, bank: Bank) -> u8 {
            unsafe { self.pics.read_masks()[bank.index()] }
        }

        fn write_mask(&mut self, bank: Bank, mask: u8) {
            unsafe {
                let [primary, secondary] = self.pics.read_masks();
                match bank {
                    Bank::Primary => self.pics.write_masks(mask, secondary),
                    Bank::Secondary => self.pics.write_masks(primary, mask),
                }
            }
        }

        fn end_of_interrupt(&mut self, bank: Bank) {
            let port = match bank {
                Bank::Primary => PIC_1_COMMAND,
                Bank::Secondary => PIC_2_COMMAND,
            };
            unsafe { Port::<u8>::new(port).write(CMD_END_OF_INTERRUPT) };
        }
    }
}
