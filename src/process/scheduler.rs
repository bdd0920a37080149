//! # Round-Robin Scheduler
//!
//! Owns the ready queue and the notion of "current". Every process gets the
//! same fixed timeslice; a switch only ever happens once the running process
//! has used all of it.
//!
//! ## State Transitions
//!
//! ```text
//!               add                 run (dequeued)
//!   Unused ───────────▶ Idle ─────────────────────▶ Running
//!                        ▲                             │
//!                        └─── run (slice expired) ─────┤
//!                        └─── remove ──────────────────┘
//! ```
//!
//! The idle process (pid 0) is never queued. It runs only when the queue is
//! empty at a decision point.

use crate::data_structures::CircularAllocator;
use crate::kernel::KernelError;
use crate::process::pcb::{Pid, ProcessState};
use crate::process::table::ProcessTable;

pub struct Scheduler<const N: usize> {
    ready: CircularAllocator<Pid, N>,
    current: Option<Pid>,
    timeslice: u32,
    switches: u64,
}

impl<const N: usize> Scheduler<N> {
    pub const fn new(timeslice: u32) -> Self {
        Self {
            ready: CircularAllocator::new(),
            current: None,
            timeslice,
            switches: 0,
        }
    }

    pub fn init(&mut self, timeslice: u32) {
        self.ready.init();
        self.current = None;
        self.timeslice = timeslice;
        self.switches = 0;
    }

    /// Admits `pid` as eligible to run.
    pub fn add(&mut self, table: &mut ProcessTable<N>, pid: Pid) -> Result<(), KernelError> {
        let pcb = table.lookup_mut(pid).ok_or(KernelError::NotFound)?;
        pcb.state = ProcessState::Idle;
        if !pid.is_idle() {
            self.ready.enqueue(pid)?;
        }
        Ok(())
    }

    /// Charges one tick to the current process.
    pub fn tick(&mut self, table: &mut ProcessTable<N>) {
        let Some(pid) = self.current else {
            return;
        };
        if let Some(pcb) = table.lookup_mut(pid) {
            pcb.run_time = pcb.run_time.wrapping_add(1);
            pcb.cpu_time = pcb.cpu_time.wrapping_add(1);
        }
    }

    /// One scheduling decision. Returns the pid that should run next.
    pub fn run(&mut self, table: &mut ProcessTable<N>) -> Pid {
        if let Some(pid) = self.current {
            let Some(pcb) = table.lookup_mut(pid) else {
                panic!("current process {} is not in the process table", pid);
            };
            if pcb.cpu_time < self.timeslice {
                return pid;
            }

            pcb.cpu_time = 0;
            pcb.state = ProcessState::Idle;
            if !pid.is_idle() && self.ready.enqueue(pid).is_err() {
                panic!("ready queue overflow requeueing pid {}", pid);
            }
        }

        let next = self.ready.dequeue().unwrap_or(Pid::IDLE);
        let Some(pcb) = table.lookup_mut(next) else {
            panic!("scheduler cannot resolve pid {}", next);
        };
        pcb.state = ProcessState::Running;

        if self.current != Some(next) {
            self.switches += 1;
        }
        self.current = Some(next);
        next
    }

    /// Takes `pid` out of the rotation.
    ///
    /// A running target is demoted and current is cleared; the idle process
    /// is left alone. A queued target is dropped by rotating the whole queue
    /// once, which keeps everyone else in order. Unknown pids are ignored.
    pub fn remove(&mut self, table: &mut ProcessTable<N>, pid: Pid) {
        if self.current == Some(pid) {
            if pid.is_idle() {
                return;
            }
            if let Some(pcb) = table.lookup_mut(pid) {
                pcb.state = ProcessState::Idle;
            }
            self.current = None;
            return;
        }

        for _ in 0..self.ready.len() {
            let Ok(queued) = self.ready.dequeue() else {
                break;
            };
            if queued != pid {
                let requeued = self.ready.enqueue(queued);
                debug_assert!(requeued.is_ok(), "ready queue lost pid {}", queued);
            }
        }
    }

    pub fn current(&self) -> Option<Pid> {
        self.current
    }

    /// Queued pids from head to tail.
    pub fn ready(&self) -> impl Iterator<Item = Pid> + '_ {
        self.ready.iter()
    }

    /// Decisions that changed the current process.
    pub fn switches(&self) -> u64 {
        self.switches
    }
}
