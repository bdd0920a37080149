//! # Data Structures Module
//!
//! Fixed-capacity containers shared by the rest of the kernel.
//!
//! ## Modules
//!
//! - `circular`: bounded FIFO ring used for id pools and the ready queue
//!
//! ## Overview
//!
//! The kernel runs without a heap, so every container here is sized at
//! compile time and never grows. Exhaustion is reported through `Result`
//! and left for the caller to handle.

pub mod circular;

pub use circular::{CircularAllocator, QueueError};
