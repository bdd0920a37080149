//! # Debug Console
//!
//! Single-key commands typed on the serial line.
//!
//! | Key | Command                               |
//! |-----|---------------------------------------|
//! | `b` | break into an attached debugger       |
//! | `p` | spawn a user test process             |
//! | `x` | destroy the current process           |
//! | `-` | lower the log level by one step       |
//! | `=` | raise the log level by one step       |
//! | `q` | leave the emulator                    |
//!
//! The kernel handles everything that only touches its own state. Breaking
//! and exiting need the CPU or the emulator and are handed back to the
//! caller as a [`Followup`].

use log::{error, info, trace, warn, Level, LevelFilter};

use crate::interrupts::pic::InterruptController;
use crate::kernel::logger;
use crate::kernel::{Kernel, KernelError};
use crate::process::{Pid, ProcessEntry, ProcessType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugCommand {
    Breakpoint,
    Spawn,
    KillCurrent,
    Quieter,
    Louder,
    Exit,
}

impl DebugCommand {
    pub fn parse(key: u8) -> Option<Self> {
        match key {
            b'b' => Some(DebugCommand::Breakpoint),
            b'p' => Some(DebugCommand::Spawn),
            b'x' => Some(DebugCommand::KillCurrent),
            b'-' => Some(DebugCommand::Quieter),
            b'=' => Some(DebugCommand::Louder),
            b'q' => Some(DebugCommand::Exit),
            _ => None,
        }
    }
}

/// Work left for the platform after the kernel ran a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Followup {
    None,
    Breakpoint,
    Exit,
}

/// Announces a new level at that level, so it only shows if it is enabled.
fn announce(level: LevelFilter) {
    match level.to_level() {
        Some(Level::Error) => error!("log level set to error"),
        Some(Level::Warn) => warn!("log level set to warn"),
        Some(Level::Info) => info!("log level set to info"),
        Some(Level::Debug) => log::debug!("log level set to debug"),
        Some(Level::Trace) => trace!("log level set to trace"),
        None => {}
    }
}

impl<C: InterruptController> Kernel<C> {
    /// Runs `command`; `spawn` is the entry point for `p`.
    pub fn run_command(&mut self, command: DebugCommand, spawn: ProcessEntry) -> Followup {
        match command {
            DebugCommand::Breakpoint => {
                trace!("breakpoint requested");
                Followup::Breakpoint
            }
            DebugCommand::Spawn => {
                match self.create(spawn, "Test", ProcessType::User) {
                    Ok(pid) => trace!("process {} created", pid),
                    Err(err) => warn!("spawn failed: {}", err),
                }
                Followup::None
            }
            DebugCommand::KillCurrent => {
                let target = self.current().unwrap_or(Pid::IDLE);
                match self.destroy(target) {
                    Ok(()) => trace!("process {} destroyed", target),
                    Err(KernelError::IdleProcess) => warn!("the idle process cannot be destroyed"),
                    Err(err) => warn!("destroy {} failed: {}", target, err),
                }
                Followup::None
            }
            DebugCommand::Quieter => {
                let level = logger::quieter(log::max_level());
                log::set_max_level(level);
                announce(level);
                Followup::None
            }
            DebugCommand::Louder => {
                let level = logger::louder(log::max_level());
                log::set_max_level(level);
                announce(level);
                Followup::None
            }
            DebugCommand::Exit => {
                info!("exit requested");
                Followup::Exit
            }
        }
    }
}
