use core::fmt;

use crate::data_structures::QueueError;

/// Recoverable kernel failures. Broken invariants panic instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// A bounded queue refused another token.
    Full,
    /// Every slot of a fixed pool is in use.
    Exhausted,
    /// No live process carries the requested pid.
    NotFound,
    /// The timer slot is not currently registered.
    NotRegistered,
    /// The idle process cannot be destroyed.
    IdleProcess,
}

impl From<QueueError> for KernelError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::Full => KernelError::Full,
            // Only the free-slot pools are ever drained.
            QueueError::Empty => KernelError::Exhausted,
        }
    }
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelError::Full => write!(f, "queue full"),
            KernelError::Exhausted => write!(f, "no free slot"),
            KernelError::NotFound => write!(f, "no such process"),
            KernelError::NotRegistered => write!(f, "timer not registered"),
            KernelError::IdleProcess => write!(f, "refusing to touch the idle process"),
        }
    }
}
