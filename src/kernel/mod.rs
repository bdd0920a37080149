//! # Kernel Core
//!
//! [`Kernel`] owns every piece of mutable kernel state: the vector table,
//! the timers, the process table and the scheduler. Nothing else in the
//! crate keeps global state of its own, so the whole core can be driven
//! from a unit test with a mock interrupt controller.
//!
//! ## One Trap, Start to Finish
//!
//! ```text
//!  IRQ ─▶ stub saves frame ─▶ handle_trap
//!                               ├─ attach frame to current PCB
//!                               ├─ dispatch(vector) ─▶ handler ─▶ EOI
//!                               │     (timer: tick, fire due timers)
//!                               ├─ scheduler.run()
//!                               └─ return current PCB's frame ─▶ iretq
//! ```

pub mod debug;
pub mod error;
#[cfg(target_os = "none")]
pub mod global;
#[cfg(target_os = "none")]
pub mod init;
pub mod logger;
#[cfg(target_os = "none")]
pub mod programs;
pub mod status;

use core::ptr::NonNull;

use log::{debug, info, warn};

use crate::config::{KernelConfig, PROC_MAX, TIMERS_MAX};
use crate::interrupts::dispatch::{Dispatcher, FIRST_DEVICE_VECTOR};
use crate::interrupts::pic::{InterruptController, IrqLine};
use crate::interrupts::trap::{TrapEntry, TrapFrame};
use crate::process::{Launch, Pid, Process, ProcessEntry, ProcessState, ProcessTable, ProcessType, Scheduler};
use crate::timer::{Repeat, TimerId, Timers};

pub use error::KernelError;
pub use status::StatusReport;

/// Interrupt handlers and timer callbacks both run with the kernel borrowed.
pub type Handler<C> = fn(&mut Kernel<C>);

pub struct Kernel<C: InterruptController> {
    config: KernelConfig,
    controller: C,
    dispatcher: Dispatcher<Handler<C>>,
    timers: Timers<Handler<C>, TIMERS_MAX>,
    processes: ProcessTable<PROC_MAX>,
    scheduler: Scheduler<PROC_MAX>,
    /// Process whose stack the trap in progress is running on.
    trap_owner: Option<Pid>,
    /// Retired slot whose stack could not be scrubbed while in use.
    reap: Option<usize>,
}

impl<C: InterruptController> Kernel<C> {
    pub const fn new(controller: C, config: KernelConfig) -> Self {
        Self {
            config,
            controller,
            dispatcher: Dispatcher::new(),
            timers: Timers::new(),
            processes: ProcessTable::new(),
            scheduler: Scheduler::new(config.timeslice),
            trap_owner: None,
            reap: None,
        }
    }

    /// Resets every subsystem, hooks the timer IRQ, and creates the idle
    /// process. Interrupts must stay disabled until the first dispatch.
    pub fn init(&mut self, timer_entry: TrapEntry, idle: ProcessEntry) -> Result<Pid, KernelError> {
        self.dispatcher.init();
        self.timers.init();
        self.processes.init();
        self.scheduler.init(self.config.timeslice);
        self.trap_owner = None;
        self.reap = None;

        self.register_interrupt(IrqLine::TIMER.vector(), timer_entry, Self::timer_interrupt);
        self.register_timer(Self::scheduler_tick, 1, Repeat::Forever)?;

        let pid = self.create(idle, "idle", ProcessType::Kernel)?;
        assert!(pid.is_idle(), "idle process must be pid {}, got {}", Pid::IDLE, pid);
        info!(
            "kernel core ready: {} process slots, {} timer slots, timeslice {} ticks",
            self.processes.capacity(),
            TIMERS_MAX,
            self.config.timeslice
        );
        Ok(pid)
    }

    /// Swaps the configuration; takes effect on the next [`Kernel::init`].
    pub fn reconfigure(&mut self, config: KernelConfig) {
        self.config = config;
    }

    pub fn controller(&self) -> &C {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut C {
        &mut self.controller
    }

    // ---------------------------------------------------------------
    // Interrupts
    // ---------------------------------------------------------------

    /// Installs `entry` in the IDT and routes `vector` to `handler`.
    ///
    /// A vector backed by a PIC line gets that line unmasked.
    pub fn register_interrupt(&mut self, vector: u8, entry: TrapEntry, handler: Handler<C>) {
        assert!(!entry.is_null(), "null trap entry for vector {}", vector);
        assert!(
            vector >= FIRST_DEVICE_VECTOR,
            "vector {} is reserved for CPU exceptions",
            vector
        );

        self.controller.install_gate(vector, entry);
        self.dispatcher.register(vector, handler);

        match IrqLine::from_vector(vector) {
            Some(line) => self.controller.unmask_line(line),
            None => debug!("vector {} has no PIC line to unmask", vector),
        }
        debug!("interrupt vector {} registered at {:#x}", vector, entry.addr());
    }

    /// Runs the handler for `vector`, then acknowledges it at the PIC.
    pub fn dispatch(&mut self, vector: u8) {
        let handler = self.dispatcher.route(vector);
        handler(self);

        if let Some(line) = IrqLine::from_vector(vector) {
            self.controller.dismiss(line);
        }
    }

    fn timer_interrupt(kernel: &mut Self) {
        kernel.timers.advance();
        for id in 0..TIMERS_MAX {
            if let Some(callback) = kernel.timers.fire(id) {
                callback(kernel);
            }
        }
    }

    fn scheduler_tick(kernel: &mut Self) {
        kernel.scheduler.tick(&mut kernel.processes);
    }

    // ---------------------------------------------------------------
    // Timers
    // ---------------------------------------------------------------

    pub fn register_timer(
        &mut self,
        callback: Handler<C>,
        interval: u32,
        repeat: impl Into<Repeat>,
    ) -> Result<TimerId, KernelError> {
        let id = self.timers.register(callback, interval, repeat)?;
        debug!("timer {} registered, every {} ticks", id, interval);
        Ok(id)
    }

    pub fn unregister_timer(&mut self, id: TimerId) -> Result<(), KernelError> {
        self.timers.unregister(id)
    }

    pub fn system_time(&self) -> u32 {
        self.timers.system_time()
    }

    pub fn active_timers(&self) -> usize {
        self.timers.active()
    }

    // ---------------------------------------------------------------
    // Processes
    // ---------------------------------------------------------------

    pub fn create(&mut self, entry: ProcessEntry, name: &str, kind: ProcessType) -> Result<Pid, KernelError> {
        let launch = Launch {
            entry: entry as usize as u64,
            code_selector: self.config.code_selector,
            data_selector: self.config.data_selector,
        };
        let now = self.system_time();
        let pid = match self.processes.allocate(launch, name, kind, now) {
            Ok(pid) => pid,
            Err(err) => {
                warn!("cannot create process '{}': {}", name, err);
                return Err(err);
            }
        };

        if let Err(err) = self.scheduler.add(&mut self.processes, pid) {
            self.processes.release(pid)?;
            return Err(err);
        }
        debug!("process {} '{}' created", pid, name);
        Ok(pid)
    }

    /// Tears `pid` down. The idle process refuses.
    ///
    /// When `pid` owns the stack the caller runs on (the trap in progress,
    /// or the running process itself outside a trap), its slot is kept
    /// aside and scrubbed on the next trap, after the switch away from it.
    pub fn destroy(&mut self, pid: Pid) -> Result<(), KernelError> {
        if pid.is_idle() {
            return Err(KernelError::IdleProcess);
        }
        if self.processes.lookup(pid).is_none() {
            return Err(KernelError::NotFound);
        }

        let on_stack = self.trap_owner == Some(pid) || self.scheduler.current() == Some(pid);
        self.scheduler.remove(&mut self.processes, pid);
        if on_stack {
            let slot = self.processes.retire(pid)?;
            // Whatever was parked before belongs to a stack we have left.
            if let Some(stale) = self.reap.replace(slot) {
                self.processes.reclaim(stale)?;
            }
        } else {
            self.processes.release(pid)?;
        }
        debug!("process {} destroyed", pid);
        Ok(())
    }

    pub fn lookup(&self, pid: Pid) -> Option<&Process> {
        self.processes.lookup(pid)
    }

    pub fn processes(&self) -> &ProcessTable<PROC_MAX> {
        &self.processes
    }

    // ---------------------------------------------------------------
    // Scheduling & context switch
    // ---------------------------------------------------------------

    pub fn current(&self) -> Option<Pid> {
        self.scheduler.current()
    }

    pub fn scheduler(&self) -> &Scheduler<PROC_MAX> {
        &self.scheduler
    }

    /// One scheduling decision outside of a trap.
    pub fn schedule(&mut self) -> Pid {
        self.scheduler.run(&mut self.processes)
    }

    /// Picks the first process and returns the frame to resume into.
    pub fn start(&mut self) -> NonNull<TrapFrame> {
        let pid = self.schedule();
        info!("dispatching first process {}", pid);
        self.current_frame()
    }

    /// Saved context of the current process, which must be running.
    pub fn current_frame(&self) -> NonNull<TrapFrame> {
        let Some(pid) = self.scheduler.current() else {
            panic!("no current process to resume");
        };
        let Some(pcb) = self.processes.lookup(pid) else {
            panic!("current process {} is not in the process table", pid);
        };
        if pcb.state != ProcessState::Running {
            panic!("current process {} is {:?}, not running", pid, pcb.state);
        }
        match self.processes.frame(pid) {
            Some(frame) => frame,
            None => panic!("current process {} has no saved context", pid),
        }
    }

    /// The context-switch boundary.
    ///
    /// `frame` was just pushed onto the current process's stack by a trap
    /// stub. It is recorded as that process's context, the trap is
    /// serviced, the scheduler gets one decision, and the frame of whoever
    /// is current afterwards is handed back for the stub to restore.
    ///
    /// A trap can also land on the stack of a process that was destroyed
    /// while running. Its frame is dropped and the slot stays parked until
    /// a later trap arrives on another stack.
    pub fn handle_trap(&mut self, frame: *mut TrapFrame) -> NonNull<TrapFrame> {
        let owner = match self.scheduler.current() {
            Some(pid) => {
                if let Some(slot) = self.reap.take() {
                    self.processes.reclaim(slot).unwrap_or_else(|err| {
                        panic!("cannot reclaim slot {}: {}", slot, err);
                    });
                }
                self.processes.attach(pid, frame);
                Some(pid)
            }
            None if self.reap.is_some_and(|slot| self.processes.stack_holds(slot, frame)) => {
                debug!("dropping the frame of a destroyed process");
                None
            }
            None => panic!("trap with no current process"),
        };
        // Both arms have checked that the frame lies inside a kernel stack.
        let vector = unsafe { (*frame).vector } as u8;

        self.trap_owner = owner;
        self.dispatch(vector);
        self.scheduler.run(&mut self.processes);
        self.trap_owner = None;

        self.current_frame()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interrupts::pic::Bank;
    use crate::testing::{self, MockController};

    const SLICE: u32 = 4;

    fn kernel() -> Kernel<MockController> {
        let config = KernelConfig::DEFAULT.with_timeslice(SLICE);
        let mut kernel = Kernel::new(MockController::new(), config);
        kernel.init(testing::entry(), testing::parked).unwrap();
        kernel
    }

    #[test]
    fn test_init_creates_idle_and_hooks_timer() {
        let kernel = kernel();
        let idle = kernel.lookup(Pid::IDLE).unwrap();
        assert_eq!(idle.name(), "idle");
        assert_eq!(idle.kind, ProcessType::Kernel);
        assert_eq!(kernel.scheduler().ready().count(), 0);
        assert_eq!(kernel.active_timers(), 1);

        let pic = kernel.controller();
        assert!(pic.gates[32].is_some());
        assert_eq!(pic.masks[Bank::Primary.index()] & 1, 0);
    }

    #[test]
    fn test_three_processes_share_time_fairly() {
        let mut kernel = kernel();
        let pids: Vec<Pid> = ["one", "two", "three"]
            .iter()
            .map(|name| kernel.create(testing::parked, name, ProcessType::User).unwrap())
            .collect();
        kernel.start();

        let mut held: Vec<Pid> = Vec::new();
        for _ in 0..SLICE * 3 {
            held.push(kernel.current().unwrap());
            testing::trap(&mut kernel, IrqLine::TIMER.vector());
        }

        for (index, pid) in pids.iter().enumerate() {
            let start = index * SLICE as usize;
            assert!(held[start..start + SLICE as usize].iter().all(|p| p == pid));
            assert_eq!(kernel.lookup(*pid).unwrap().run_time, SLICE);
        }
        assert!(!held.contains(&Pid::IDLE));
        assert_eq!(kernel.lookup(Pid::IDLE).unwrap().run_time, 0);
        assert_eq!(kernel.current(), Some(pids[0]));
        assert_eq!(kernel.system_time(), SLICE * 3);
    }

    #[test]
    fn test_every_timer_trap_is_acknowledged() {
        let mut kernel = kernel();
        kernel.start();
        for _ in 0..5 {
            testing::trap(&mut kernel, IrqLine::TIMER.vector());
        }
        assert_eq!(kernel.controller().eoi, [5, 0]);
    }

    #[test]
    fn test_secondary_line_registration() {
        fn noop(_: &mut Kernel<MockController>) {}

        let mut kernel = kernel();
        let line = IrqLine::new(12).unwrap();
        kernel.register_interrupt(line.vector(), testing::entry(), noop);
        assert!(kernel.controller_mut().line_enabled(line));
        assert!(kernel.controller_mut().line_enabled(IrqLine::CASCADE));

        kernel.start();
        testing::trap(&mut kernel, line.vector());
        assert_eq!(kernel.controller().eoi, [1, 1]);
    }

    #[test]
    fn test_non_pic_vector_is_not_acknowledged() {
        fn noop(_: &mut Kernel<MockController>) {}

        let mut kernel = kernel();
        kernel.register_interrupt(0x80, testing::entry(), noop);
        kernel.start();
        testing::trap(&mut kernel, 0x80);
        assert_eq!(kernel.controller().eoi, [0, 0]);
    }

    #[test]
    fn test_destroy_rules() {
        let mut kernel = kernel();
        assert_eq!(kernel.destroy(Pid::IDLE), Err(KernelError::IdleProcess));
        assert_eq!(kernel.destroy(Pid::new(42)), Err(KernelError::NotFound));

        let pid = kernel.create(testing::parked, "victim", ProcessType::User).unwrap();
        let free = kernel.processes().free_slots();
        kernel.destroy(pid).unwrap();
        assert!(kernel.lookup(pid).is_none());
        assert_eq!(kernel.processes().free_slots(), free + 1);
        assert_eq!(kernel.scheduler().ready().count(), 0);
    }

    #[test]
    fn test_create_fails_when_table_full() {
        let mut kernel = kernel();
        // Idle already holds one slot.
        for _ in 1..PROC_MAX {
            kernel.create(testing::parked, "filler", ProcessType::User).unwrap();
        }
        assert_eq!(
            kernel.create(testing::parked, "overflow", ProcessType::User),
            Err(KernelError::Exhausted)
        );
    }

    #[test]
    fn test_destroying_trap_owner_defers_reclaim() {
        fn kill_current(kernel: &mut Kernel<MockController>) {
            if let Some(pid) = kernel.current() {
                kernel.destroy(pid).unwrap();
            }
        }

        let mut kernel = kernel();
        kernel.register_interrupt(IrqLine::COM1.vector(), testing::entry(), kill_current);
        let victim = kernel.create(testing::parked, "victim", ProcessType::User).unwrap();
        let survivor = kernel.create(testing::parked, "survivor", ProcessType::User).unwrap();
        kernel.start();

        let free = kernel.processes().free_slots();
        testing::trap(&mut kernel, IrqLine::COM1.vector());
        assert!(kernel.lookup(victim).is_none());
        assert_eq!(kernel.current(), Some(survivor));
        // Still parked until the next trap runs on another stack.
        assert_eq!(kernel.processes().free_slots(), free);

        testing::trap(&mut kernel, IrqLine::TIMER.vector());
        assert_eq!(kernel.processes().free_slots(), free + 1);
    }

    #[test]
    fn test_destroying_running_process_outside_trap() {
        let mut kernel = kernel();
        let a = kernel.create(testing::parked, "a", ProcessType::User).unwrap();
        let b = kernel.create(testing::parked, "b", ProcessType::User).unwrap();
        kernel.start();
        assert_eq!(kernel.current(), Some(a));

        let stale = kernel.processes().frame(a).unwrap();
        let free = kernel.processes().free_slots();
        kernel.destroy(a).unwrap();
        assert!(kernel.lookup(a).is_none());
        assert_eq!(kernel.current(), None);
        assert_eq!(kernel.processes().free_slots(), free);

        // The next tick still arrives on a's stack.
        testing::deliver(&mut kernel, stale, IrqLine::TIMER.vector());
        assert_eq!(kernel.current(), Some(b));
        assert_eq!(kernel.processes().free_slots(), free);
        assert_eq!(kernel.controller().eoi, [1, 0]);

        testing::trap(&mut kernel, IrqLine::TIMER.vector());
        assert_eq!(kernel.processes().free_slots(), free + 1);
        assert_eq!(kernel.current(), Some(b));
    }

    #[test]
    fn test_second_deferred_destroy_reclaims_the_first() {
        fn kill_current(kernel: &mut Kernel<MockController>) {
            if let Some(pid) = kernel.current() {
                kernel.destroy(pid).unwrap();
            }
        }

        let mut kernel = kernel();
        kernel.register_interrupt(IrqLine::COM1.vector(), testing::entry(), kill_current);
        let first = kernel.create(testing::parked, "first", ProcessType::User).unwrap();
        let second = kernel.create(testing::parked, "second", ProcessType::User).unwrap();
        kernel.start();

        let free = kernel.processes().free_slots();
        testing::trap(&mut kernel, IrqLine::COM1.vector());
        assert!(kernel.lookup(first).is_none());
        assert_eq!(kernel.current(), Some(second));

        // Running on second's stack now, so first's slot can go back.
        kernel.destroy(second).unwrap();
        assert_eq!(kernel.processes().free_slots(), free + 1);
    }

    #[test]
    #[should_panic(expected = "trap with no current process")]
    fn test_trap_on_live_stack_without_current_is_fatal() {
        let mut kernel = kernel();
        let a = kernel.create(testing::parked, "a", ProcessType::User).unwrap();
        let b = kernel.create(testing::parked, "b", ProcessType::User).unwrap();
        kernel.start();
        let foreign = kernel.processes().frame(b).unwrap();
        kernel.destroy(a).unwrap();
        testing::deliver(&mut kernel, foreign, IrqLine::TIMER.vector());
    }

    #[test]
    fn test_timers_run_inside_timer_trap() {
        fn spawn(kernel: &mut Kernel<MockController>) {
            let _ = kernel.create(testing::parked, "spawned", ProcessType::User);
        }

        let mut kernel = kernel();
        kernel.register_timer(spawn, 2, 2).unwrap();
        kernel.start();
        for _ in 0..10 {
            testing::trap(&mut kernel, IrqLine::TIMER.vector());
        }
        assert_eq!(kernel.processes().iter().count(), 3);
        assert_eq!(kernel.lookup(Pid::new(1)).unwrap().start_time, 2);
        assert_eq!(kernel.lookup(Pid::new(2)).unwrap().start_time, 4);
        assert_eq!(kernel.active_timers(), 1);
    }

    #[test]
    #[should_panic(expected = "no handler registered for interrupt vector 40")]
    fn test_unhandled_vector_is_fatal() {
        let mut kernel = kernel();
        kernel.start();
        testing::trap(&mut kernel, 40);
    }

    #[test]
    #[should_panic(expected = "trap with no current process")]
    fn test_trap_before_start_is_fatal() {
        let mut kernel = kernel();
        let frame = kernel.processes().frame(Pid::IDLE).unwrap();
        kernel.handle_trap(frame.as_ptr());
    }

    #[test]
    #[should_panic(expected = "null trap entry")]
    fn test_null_entry_is_fatal() {
        fn noop(_: &mut Kernel<MockController>) {}

        let mut kernel = kernel();
        kernel.register_interrupt(33, TrapEntry::new(0), noop);
    }

    #[test]
    #[should_panic(expected = "reserved for CPU exceptions")]
    fn test_exception_vector_is_rejected() {
        fn noop(_: &mut Kernel<MockController>) {}

        let mut kernel = kernel();
        kernel.register_interrupt(14, testing::entry(), noop);
    }
}
