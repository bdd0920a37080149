//! Process control blocks and their stacks.

use core::cell::UnsafeCell;
use core::fmt;
use core::ptr::NonNull;

use crate::config::{PROC_NAME_LEN, PROC_STACK_SIZE};
use crate::interrupts::trap::{TrapFrame, TRAP_FRAME_SIZE};

/// Code a process starts executing on its first dispatch.
pub type ProcessEntry = extern "C" fn() -> !;

pub type ProcessName = heapless::String<PROC_NAME_LEN>;

/// Process identifier. Never reused while the kernel is up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pid(u32);

impl Pid {
    /// Reserved for the idle process: never queued, never destroyed.
    pub const IDLE: Pid = Pid(0);

    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn as_u32(self) -> u32 {
        self.0
    }

    pub const fn is_idle(self) -> bool {
        self.0 == Self::IDLE.0
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessState {
    Unused,
    Idle,
    Running,
}

impl ProcessState {
    /// One-letter form used in status listings.
    pub const fn code(self) -> char {
        match self {
            ProcessState::Unused => '-',
            ProcessState::Idle => 'I',
            ProcessState::Running => 'R',
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessType {
    Kernel,
    User,
}

#[derive(Debug, Clone)]
pub struct Process {
    pub pid: Pid,
    pub slot: usize,
    pub state: ProcessState,
    pub kind: ProcessType,
    pub name: ProcessName,
    /// Tick at which the process was created.
    pub start_time: u32,
    /// Ticks spent as the current process, in total.
    pub run_time: u32,
    /// Ticks used of the running timeslice.
    pub cpu_time: u32,
    /// Byte offset of the saved trap frame inside the slot's stack.
    pub context: usize,
}

impl Process {
    pub const fn empty(slot: usize) -> Self {
        Self {
            pid: Pid::IDLE,
            slot,
            state: ProcessState::Unused,
            kind: ProcessType::Kernel,
            name: ProcessName::new(),
            start_time: 0,
            run_time: 0,
            cpu_time: 0,
            context: 0,
        }
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn is_live(&self) -> bool {
        self.state != ProcessState::Unused
    }
}

/// Copies as much of `name` as fits, never splitting a character.
pub fn truncate_name(name: &str) -> ProcessName {
    let mut truncated = ProcessName::new();
    for ch in name.chars() {
        if truncated.push(ch).is_err() {
            break;
        }
    }
    truncated
}

/// Backing memory for one process stack.
///
/// The trap stubs read and write saved frames here behind the kernel's
/// back, hence the interior mutability.
#[repr(C, align(16))]
pub struct Stack(UnsafeCell<[u8; PROC_STACK_SIZE]>);

impl Stack {
    pub const fn new() -> Self {
        Self(UnsafeCell::new([0; PROC_STACK_SIZE]))
    }

    pub fn base(&self) -> usize {
        self.0.get() as usize
    }

    /// One past the highest byte; 16-byte aligned.
    pub fn top(&self) -> usize {
        self.base() + PROC_STACK_SIZE
    }

    pub fn scrub(&mut self) {
        self.0.get_mut().fill(0);
    }

    /// Offset at which a full trap frame sits flush against the top.
    pub const fn initial_context() -> usize {
        PROC_STACK_SIZE - TRAP_FRAME_SIZE
    }

    /// Whether a frame at `addr` lies entirely inside this stack.
    pub fn holds_frame(&self, addr: usize) -> bool {
        addr >= self.base()
            && addr.checked_add(TRAP_FRAME_SIZE).is_some_and(|end| end <= self.top())
            && addr % core::mem::align_of::<TrapFrame>() == 0
    }

    pub fn frame_at(&self, offset: usize) -> Option<NonNull<TrapFrame>> {
        let addr = self.base().checked_add(offset)?;
        if !self.holds_frame(addr) {
            return None;
        }
        NonNull::new(addr as *mut TrapFrame)
    }
}

impl Default for Stack {
    fn default() -> Self {
        Self::new()
    }
}
