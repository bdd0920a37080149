use core::fmt;

use crate::config::TIMER_HZ;
use crate::interrupts::pic::InterruptController;
use crate::kernel::Kernel;

/// Kernel initialization status tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStatus {
    InProgress,
    Completed,
    Failed(&'static str),
}

impl fmt::Display for InitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitStatus::InProgress => write!(f, "In Progress"),
            InitStatus::Completed => write!(f, "Completed"),
            InitStatus::Failed(err) => write!(f, "Failed: {}", err),
        }
    }
}

/// Snapshot of the process table, rendered one process per line.
///
/// Walks whatever processes are live; the layout does not depend on the
/// table's capacity.
pub struct StatusReport<'a, C: InterruptController> {
    kernel: &'a Kernel<C>,
}

impl<'a, C: InterruptController> StatusReport<'a, C> {
    pub fn new(kernel: &'a Kernel<C>) -> Self {
        Self { kernel }
    }
}

impl<C: InterruptController> fmt::Display for StatusReport<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kernel = self.kernel;
        let ticks = kernel.system_time();
        let seconds = ticks / TIMER_HZ;

        writeln!(
            f,
            "uptime {:02}:{:02}:{:02} ({} ticks), {} switches, {} timers",
            seconds / 3600,
            seconds / 60 % 60,
            seconds % 60,
            ticks,
            kernel.scheduler().switches(),
            kernel.active_timers()
        )?;
        write!(f, "slot   pid st  run_time name")?;
        for pcb in kernel.processes().iter() {
            write!(
                f,
                "\n{:>4} {:>5} {:>2} {:>9} {}",
                pcb.slot,
                pcb.pid,
                pcb.state.code(),
                pcb.run_time,
                pcb.name()
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KernelConfig;
    use crate::interrupts::pic::IrqLine;
    use crate::process::ProcessType;
    use crate::testing::{self, MockController};

    #[test]
    fn test_report_lists_live_processes() {
        let mut kernel = Kernel::new(MockController::new(), KernelConfig::DEFAULT);
        kernel.init(testing::entry(), testing::parked).unwrap();
        let worker = kernel.create(testing::parked, "worker", ProcessType::User).unwrap();
        let gone = kernel.create(testing::parked, "gone", ProcessType::User).unwrap();
        kernel.destroy(gone).unwrap();
        kernel.start();
        for _ in 0..TIMER_HZ * 2 {
            testing::trap(&mut kernel, IrqLine::TIMER.vector());
        }

        let report = StatusReport::new(&kernel).to_string();
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("uptime 00:00:02 (200 ticks)"));
        assert!(lines[2].ends_with(" I         0 idle"));
        assert!(lines[3].contains(&format!(" {} ", worker)));
        assert!(lines[3].ends_with(" R       200 worker"));
        assert!(!report.contains("gone"));
    }

    #[test]
    fn test_init_status_display() {
        assert_eq!(InitStatus::Completed.to_string(), "Completed");
        assert_eq!(InitStatus::Failed("no pit").to_string(), "Failed: no pit");
    }
}
