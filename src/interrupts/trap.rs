//! # Trap Frames and Entry Stubs
//!
//! Every hardware IRQ enters the kernel through a small assembly stub that
//! completes the frame the CPU already pushed, hands a pointer to it to
//! `kernel_trap_entry`, and restores whichever frame that call returns.
//!
//! ## Frame Layout (lowest address first)
//!
//! ```text
//! ┌──────────────────────────────┐ ◀── frame pointer (rsp after the pushes)
//! │ r15 .. r8, rbp, rdi, rsi,    │  pushed by trap_common
//! │ rdx, rcx, rbx, rax           │
//! ├──────────────────────────────┤
//! │ vector, error_code           │  pushed by the per-vector stub
//! ├──────────────────────────────┤
//! │ rip, cs, rflags, rsp, ss     │  pushed by the CPU
//! └──────────────────────────────┘
//! ```
//!
//! Returning a different frame pointer from `kernel_trap_entry` is the whole
//! context switch: the stub loads it into `rsp` and unwinds it with `iretq`.

/// Register snapshot saved on the interrupted process's stack.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrapFrame {
    pub r15: u64,
    pub r14: u64,
    pub r13: u64,
    pub r12: u64,
    pub r11: u64,
    pub r10: u64,
    pub r9: u64,
    pub r8: u64,
    pub rbp: u64,
    pub rdi: u64,
    pub rsi: u64,
    pub rdx: u64,
    pub rcx: u64,
    pub rbx: u64,
    pub rax: u64,
    pub vector: u64,
    pub error_code: u64,
    pub rip: u64,
    pub cs: u64,
    pub rflags: u64,
    pub rsp: u64,
    pub ss: u64,
}

/// Reserved bit 1 plus IF.
pub const RFLAGS_DEFAULT: u64 = 0x202;

pub const TRAP_FRAME_SIZE: usize = core::mem::size_of::<TrapFrame>();

impl TrapFrame {
    /// Frame that starts `rip` on `rsp` with interrupts enabled.
    pub const fn initial(rip: u64, rsp: u64, cs: u16, ss: u16) -> Self {
        Self {
            r15: 0,
            r14: 0,
            r13: 0,
            r12: 0,
            r11: 0,
            r10: 0,
            r9: 0,
            r8: 0,
            rbp: 0,
            rdi: 0,
            rsi: 0,
            rdx: 0,
            rcx: 0,
            rbx: 0,
            rax: 0,
            vector: 0,
            error_code: 0,
            rip,
            cs: cs as u64,
            rflags: RFLAGS_DEFAULT,
            rsp,
            ss: ss as u64,
        }
    }

    pub fn interrupts_enabled(&self) -> bool {
        self.rflags & (1 << 9) != 0
    }
}

/// Address of a low-level entry stub, as written into an IDT gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrapEntry(u64);

impl TrapEntry {
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    pub const fn addr(self) -> u64 {
        self.0
    }

    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

#[cfg(target_os = "none")]
pub use self::stubs::{irq_entry, resume};

#[cfg(target_os = "none")]
mod stubs {
    use super::{TrapEntry, TrapFrame};
    use crate::interrupts::pic::IrqLine;
    use core::arch::{asm, global_asm};

    global_asm!(
        ".section .text",
        ".global trap_common",
        ".global trap_restore",
        "trap_common:",
        "    push rax",
        "    push rbx",
        "    push rcx",
        "    push rdx",
        "    push rsi",
        "    push rdi",
        "    push rbp",
        "    push r8",
        "    push r9",
        "    push r10",
        "    push r11",
        "    push r12",
        "    push r13",
        "    push r14",
        "    push r15",
        "    mov rdi, rsp",
        "    cld",
        "    call kernel_trap_entry",
        "    mov rsp, rax",
        "trap_restore:",
        "    pop r15",
        "    pop r14",
        "    pop r13",
        "    pop r12",
        "    pop r11",
        "    pop r10",
        "    pop r9",
        "    pop r8",
        "    pop rbp",
        "    pop rdi",
        "    pop rsi",
        "    pop rdx",
        "    pop rcx",
        "    pop rbx",
        "    pop rax",
        "    add rsp, 16",
        "    iretq",
    );

    macro_rules! irq_stubs {
        ($($name:ident => $vector:literal),* $(,)?) => {
            $(
                global_asm!(concat!(
                    ".section .text\n",
                    ".global ", stringify!($name), "\n",
                    stringify!($name), ":\n",
                    "    push 0\n",
                    "    push ", stringify!($vector), "\n",
                    "    jmp trap_common\n",
                ));
            )*

            extern "C" {
                $(fn $name();)*
            }

            static IRQ_STUBS: [unsafe extern "C" fn(); 16] = [$($name),*];
        };
    }

    irq_stubs! {
        irq_stub_0 => 32,
        irq_stub_1 => 33,
        irq_stub_2 => 34,
        irq_stub_3 => 35,
        irq_stub_4 => 36,
        irq_stub_5 => 37,
        irq_stub_6 => 38,
        irq_stub_7 => 39,
        irq_stub_8 => 40,
        irq_stub_9 => 41,
        irq_stub_10 => 42,
        irq_stub_11 => 43,
        irq_stub_12 => 44,
        irq_stub_13 => 45,
        irq_stub_14 => 46,
        irq_stub_15 => 47,
    }

    /// Entry stub for a PIC line.
    pub fn irq_entry(line: IrqLine) -> TrapEntry {
        TrapEntry::new(IRQ_STUBS[line.index()] as usize as u64)
    }

    /// Unwinds `frame` and continues wherever it points.
    ///
    /// # Safety
    /// `frame` must be a complete trap frame on a stack that stays valid
    /// until the next trap switches away from it.
    pub unsafe fn resume(frame: *const TrapFrame) -> ! {
        asm!(
            "mov rsp, {frame}",
            "jmp trap_restore",
            frame = in(reg) frame,
            options(noreturn),
        )
    }
}
