//! Kernel initialization phases
use log::{error, info};
use x86_64::instructions::port::Port;

use crate::config::{KernelConfig, TIMER_HZ};
use crate::interrupts::{self, gdt, pic::IrqLine, trap};
use crate::kernel::debug::{DebugCommand, Followup};
use crate::kernel::global::{with_kernel, MachineKernel};
use crate::kernel::status::{InitStatus, StatusReport};
use crate::kernel::{logger, programs};
use crate::process::ProcessType;
use crate::timer::{pit, Repeat};

const QEMU_EXIT_PORT: u16 = 0xf4;

/// Brings the machine up to the point where the first process can be
/// dispatched. Interrupts stay disabled throughout.
pub fn init_kernel(config: KernelConfig) -> Result<(), &'static str> {
    logger::init(config.log_level)?;
    info!("pulse kernel initialization");

    init_phase("Interrupt System", || {
        with_kernel(|kernel| interrupts::init(kernel.controller_mut()));
        Ok(())
    })?;
    init_phase("Interval Timer", || pit::init_pit(TIMER_HZ))?;
    init_phase("Kernel Core", || init_core(config))?;
    init_phase("Debug Console", init_console)?;
    init_phase("Processes", spawn_initial)?;

    info!("kernel initialization complete");
    Ok(())
}

fn init_phase(name: &'static str, init_fn: impl FnOnce() -> Result<(), &'static str>) -> Result<(), &'static str> {
    info!("{}: {}", name, InitStatus::InProgress);

    match init_fn() {
        Ok(()) => {
            info!("{}: {}", name, InitStatus::Completed);
            Ok(())
        }
        Err(e) => {
            error!("{}: {}", name, InitStatus::Failed(e));
            Err(e)
        }
    }
}

fn init_core(config: KernelConfig) -> Result<(), &'static str> {
    let (code, data) = gdt::kernel_selectors();
    let config = config.with_selectors(code, data);

    with_kernel(|kernel| {
        kernel.reconfigure(config);
        kernel
            .init(trap::irq_entry(IrqLine::TIMER), programs::idle)
            .map_err(|_| "cannot create the idle process")?;

        if config.status_interval > 0 {
            kernel
                .register_timer(report_status, config.status_interval, Repeat::Forever)
                .map_err(|_| "no timer slot for the status report")?;
        }
        Ok(())
    })
}

fn init_console() -> Result<(), &'static str> {
    with_kernel(|kernel| {
        kernel.register_interrupt(IrqLine::COM1.vector(), trap::irq_entry(IrqLine::COM1), serial_interrupt);
    });
    info!("debug keys: b=break p=spawn x=kill -/= log level q=quit");
    Ok(())
}

fn spawn_initial() -> Result<(), &'static str> {
    with_kernel(|kernel| {
        kernel
            .create(programs::busy_worker, "worker", ProcessType::User)
            .and_then(|_| kernel.create(programs::user_test, "Test", ProcessType::User))
            .map(|_| ())
            .map_err(|_| "cannot create initial processes")
    })
}

fn report_status(kernel: &mut MachineKernel) {
    info!("{}", StatusReport::new(kernel));
}

fn serial_interrupt(kernel: &mut MachineKernel) {
    let key = logger::read_byte();
    let Some(command) = DebugCommand::parse(key) else {
        return;
    };

    match kernel.run_command(command, programs::user_test) {
        Followup::None => {}
        Followup::Breakpoint => x86_64::instructions::interrupts::int3(),
        Followup::Exit => exit_qemu(),
    }
}

/// Leaves QEMU through isa-debug-exit; halts when no such device exists.
pub fn exit_qemu() -> ! {
    unsafe { Port::<u32>::new(QEMU_EXIT_PORT).write(0x10) };
    halt()
}

pub fn halt() -> ! {
    x86_64::instructions::interrupts::disable();
    loop {
        x86_64::instructions::hlt();
    }
}
