//! Pulse: a small preemptive kernel core for x86_64.
//!
//! The scheduling, timer and interrupt-routing logic is plain Rust over a
//! narrow hardware seam ([`interrupts::InterruptController`]) and builds and
//! tests on any host. Descriptor tables, port I/O, trap stubs and the serial
//! console are compiled only for the bare-metal target.

#![cfg_attr(not(test), no_std)]
#![cfg_attr(target_os = "none", feature(abi_x86_interrupt))]

pub mod config;
pub mod data_structures;
pub mod interrupts;
pub mod kernel;
pub mod process;
pub mod timer;

#[cfg(test)]
mod testing;
