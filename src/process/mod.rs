//! Processes: control blocks, the table that owns them, and the scheduler
//! that decides which one runs.

pub mod pcb;
pub mod scheduler;
pub mod table;

pub use pcb::{Pid, Process, ProcessEntry, ProcessState, ProcessType};
pub use scheduler::Scheduler;
pub use table::{Launch, ProcessTable};
