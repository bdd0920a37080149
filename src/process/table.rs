//! # Process Table
//!
//! A fixed arena of PCBs with one stack per slot. Free slots are handed out
//! FIFO from a circular pool, so a just-released slot is the last to be
//! reused.
//!
//! ## Slot Lifecycle
//!
//! ```text
//!            allocate                 retire               reclaim
//!   pool ─────────────▶ live PCB ─────────────▶ retired ─────────────▶ pool
//!                          │                                  ▲
//!                          └──────────── release ─────────────┘
//! ```
//!
//! A retired slot is invisible to lookups but still holds its stack. That
//! split exists for the one case where the stack being destroyed is the
//! stack the trap handler is running on; the kernel reclaims it on the next
//! trap instead.

use core::ptr::NonNull;

use crate::config::PROC_STACK_SIZE;
use crate::data_structures::CircularAllocator;
use crate::interrupts::trap::TrapFrame;
use crate::kernel::KernelError;
use crate::process::pcb::{truncate_name, Pid, Process, ProcessState, ProcessType, Stack};

/// Segment selectors and entry address for a fresh process frame.
#[derive(Debug, Clone, Copy)]
pub struct Launch {
    pub entry: u64,
    pub code_selector: u16,
    pub data_selector: u16,
}

pub struct ProcessTable<const N: usize> {
    next_pid: u32,
    procs: [Process; N],
    stacks: [Stack; N],
    free: CircularAllocator<usize, N>,
}

impl<const N: usize> ProcessTable<N> {
    /// An empty table with no free slots; call [`ProcessTable::init`].
    pub const fn new() -> Self {
        Self {
            next_pid: 0,
            procs: [const { Process::empty(0) }; N],
            stacks: [const { Stack::new() }; N],
            free: CircularAllocator::new(),
        }
    }

    pub fn init(&mut self) {
        self.next_pid = 0;
        for (slot, (pcb, stack)) in self.procs.iter_mut().zip(self.stacks.iter_mut()).enumerate() {
            *pcb = Process::empty(slot);
            stack.scrub();
        }
        self.free.fill();
    }

    /// Takes a free slot, stamps a new PCB into it, and plants an initial
    /// trap frame at the top of its stack so the first dispatch lands on
    /// `launch.entry` with interrupts enabled.
    pub fn allocate(
        &mut self,
        launch: Launch,
        name: &str,
        kind: ProcessType,
        now: u32,
    ) -> Result<Pid, KernelError> {
        let Some(next_pid) = self.next_pid.checked_add(1) else {
            return Err(KernelError::Exhausted);
        };
        let slot = self.free.dequeue()?;
        let pid = Pid::new(self.next_pid);
        self.next_pid = next_pid;

        let stack = &mut self.stacks[slot];
        stack.scrub();
        let context = Stack::initial_context();
        // Entry sees the stack as if `call` had just pushed a return address.
        let rsp = (stack.top() - 8) as u64;
        let frame = TrapFrame::initial(launch.entry, rsp, launch.code_selector, launch.data_selector);
        match stack.frame_at(context) {
            Some(ptr) => unsafe { ptr.as_ptr().write(frame) },
            None => panic!("initial frame does not fit in a {}-byte stack", PROC_STACK_SIZE),
        }

        self.procs[slot] = Process {
            pid,
            slot,
            state: ProcessState::Idle,
            kind,
            name: truncate_name(name),
            start_time: now,
            run_time: 0,
            cpu_time: 0,
            context,
        };
        Ok(pid)
    }

    /// Destroys `pid` outright: PCB, stack and slot.
    pub fn release(&mut self, pid: Pid) -> Result<(), KernelError> {
        let slot = self.retire(pid)?;
        self.reclaim(slot)
    }

    /// Scrubs the PCB of `pid` and hides it from lookups, keeping the slot
    /// and its stack out of the pool until [`ProcessTable::reclaim`].
    pub fn retire(&mut self, pid: Pid) -> Result<usize, KernelError> {
        let slot = self.lookup(pid).map(|pcb| pcb.slot).ok_or(KernelError::NotFound)?;
        self.procs[slot] = Process::empty(slot);
        Ok(slot)
    }

    /// Zeroes a retired slot's stack and returns the slot to the pool.
    pub fn reclaim(&mut self, slot: usize) -> Result<(), KernelError> {
        assert!(
            slot < N && !self.procs[slot].is_live(),
            "slot {} cannot be reclaimed",
            slot
        );
        self.stacks[slot].scrub();
        self.free.enqueue(slot)?;
        Ok(())
    }

    pub fn lookup(&self, pid: Pid) -> Option<&Process> {
        self.iter().find(|pcb| pcb.pid == pid)
    }

    pub fn lookup_mut(&mut self, pid: Pid) -> Option<&mut Process> {
        self.procs.iter_mut().find(|pcb| pcb.is_live() && pcb.pid == pid)
    }

    /// Live PCBs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Process> + '_ {
        self.procs.iter().filter(|pcb| pcb.is_live())
    }

    pub fn free_slots(&self) -> usize {
        self.free.len()
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Where the saved context of `pid` currently lives.
    pub fn frame(&self, pid: Pid) -> Option<NonNull<TrapFrame>> {
        let pcb = self.lookup(pid)?;
        self.stacks[pcb.slot].frame_at(pcb.context)
    }

    /// Whether `frame` lies inside the stack of `slot`, live or retired.
    pub fn stack_holds(&self, slot: usize, frame: *const TrapFrame) -> bool {
        self.stacks.get(slot).is_some_and(|stack| stack.holds_frame(frame as usize))
    }

    /// Records `frame` as the saved context of `pid`.
    ///
    /// A frame outside that process's own stack means the trap arrived on
    /// a stack the kernel does not own, which is unrecoverable.
    pub fn attach(&mut self, pid: Pid, frame: *mut TrapFrame) {
        let Some(slot) = self.lookup(pid).map(|pcb| pcb.slot) else {
            panic!("trap frame for unknown pid {}", pid);
        };
        let stack = &self.stacks[slot];
        let addr = frame as usize;
        if !stack.holds_frame(addr) {
            panic!(
                "trap frame {:#x} outside the stack of pid {} ({:#x}..{:#x})",
                addr,
                pid,
                stack.base(),
                stack.top()
            );
        }
        self.procs[slot].context = addr - stack.base();
    }
}

impl<const N: usize> Default for ProcessTable<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    extern "C" fn parked() -> ! {
        loop {
            core::hint::spin_loop();
        }
    }

    fn launch() -> Launch {
        Launch {
            entry: parked as usize as u64,
            code_selector: 0x08,
            data_selector: 0x10,
        }
    }

    fn table() -> ProcessTable<3> {
        let mut table = ProcessTable::new();
        table.init();
        table
    }

    #[test]
    fn test_capacity_exhaustion() {
        let mut table = table();
        for name in ["a", "b", "c"] {
            table.allocate(launch(), name, ProcessType::User, 0).unwrap();
        }
        assert_eq!(
            table.allocate(launch(), "d", ProcessType::User, 0),
            Err(KernelError::Exhausted)
        );
        assert_eq!(table.iter().count(), 3);
    }

    #[test]
    fn test_release_frees_slot_for_reuse() {
        let mut table = table();
        let a = table.allocate(launch(), "a", ProcessType::User, 0).unwrap();
        table.allocate(launch(), "b", ProcessType::User, 0).unwrap();
        table.allocate(launch(), "c", ProcessType::User, 0).unwrap();
        let slot = table.lookup(a).unwrap().slot;

        table.release(a).unwrap();
        assert!(table.lookup(a).is_none());
        assert_eq!(table.release(a), Err(KernelError::NotFound));

        let d = table.allocate(launch(), "d", ProcessType::User, 7).unwrap();
        let pcb = table.lookup(d).unwrap();
        assert_eq!(pcb.slot, slot);
        assert_eq!(pcb.start_time, 7);
        assert_eq!(pcb.name(), "d");
    }

    #[test]
    fn test_pids_unique_and_increasing() {
        let mut table = table();
        let mut last = None;
        for round in 0..10 {
            let pid = table.allocate(launch(), "p", ProcessType::User, round).unwrap();
            if let Some(previous) = last {
                assert!(pid > previous);
            }
            last = Some(pid);
            table.release(pid).unwrap();
        }
    }

    #[test]
    fn test_initial_frame() {
        let mut table = table();
        let pid = table.allocate(launch(), "a", ProcessType::Kernel, 0).unwrap();
        let frame = unsafe { *table.frame(pid).unwrap().as_ptr() };
        assert_eq!(frame.rip, launch().entry);
        assert_eq!(frame.cs, 0x08);
        assert_eq!(frame.ss, 0x10);
        assert!(frame.interrupts_enabled());
        assert_eq!(frame.rsp % 16, 8);
        assert_eq!(table.lookup(pid).unwrap().state, ProcessState::Idle);
    }

    #[test]
    fn test_retire_defers_slot_return() {
        let mut table = table();
        let pid = table.allocate(launch(), "a", ProcessType::User, 0).unwrap();
        let frame = table.frame(pid).unwrap().as_ptr();
        let slot = table.retire(pid).unwrap();
        assert!(table.lookup(pid).is_none());
        assert_eq!(table.free_slots(), 2);
        assert!(table.stack_holds(slot, frame));
        assert!(!table.stack_holds(slot + 1, frame));
        assert!(!table.stack_holds(3, frame));

        table.reclaim(slot).unwrap();
        assert_eq!(table.free_slots(), 3);
    }

    #[test]
    fn test_attach_records_context() {
        let mut table = table();
        let pid = table.allocate(launch(), "a", ProcessType::User, 0).unwrap();
        let frame = table.frame(pid).unwrap().as_ptr();
        let lower = unsafe { frame.sub(2) };
        table.attach(pid, lower);
        assert_eq!(table.frame(pid).unwrap().as_ptr(), lower);
    }

    #[test]
    #[should_panic(expected = "outside the stack")]
    fn test_attach_foreign_frame_is_fatal() {
        let mut table = table();
        let a = table.allocate(launch(), "a", ProcessType::User, 0).unwrap();
        let b = table.allocate(launch(), "b", ProcessType::User, 0).unwrap();
        let foreign = table.frame(b).unwrap().as_ptr();
        table.attach(a, foreign);
    }
}
