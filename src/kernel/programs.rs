//! Built-in process bodies.

use log::info;
use x86_64::instructions::{self, interrupts};

/// Body of pid 0: sleep until the next interrupt, forever.
pub extern "C" fn idle() -> ! {
    loop {
        interrupts::enable_and_hlt();
    }
}

/// Spawned from the debug console with `p`.
pub extern "C" fn user_test() -> ! {
    info!("Test process is running...");
    loop {
        instructions::hlt();
    }
}

/// Spins while keeping the status line's tick counts moving.
pub extern "C" fn busy_worker() -> ! {
    let mut rounds: u64 = 0;
    loop {
        rounds = rounds.wrapping_add(1);
        if rounds % 50_000_000 == 0 {
            info!("busy worker: {} rounds", rounds);
        }
        core::hint::spin_loop();
    }
}
