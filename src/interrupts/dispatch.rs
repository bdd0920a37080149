//! Vector → handler table.

/// First vector available to devices; 0-31 belong to CPU exceptions.
pub const FIRST_DEVICE_VECTOR: u8 = 32;

const VECTORS: usize = 256;

/// Logical handlers keyed by interrupt vector.
pub struct Dispatcher<H: Copy> {
    handlers: [Option<H>; VECTORS],
}

impl<H: Copy> Dispatcher<H> {
    pub const fn new() -> Self {
        Self {
            handlers: [None; VECTORS],
        }
    }

    pub fn init(&mut self) {
        self.handlers = [None; VECTORS];
    }

    /// Replaces whatever was registered for `vector`.
    pub fn register(&mut self, vector: u8, handler: H) {
        self.handlers[vector as usize] = Some(handler);
    }

    pub fn handler(&self, vector: u8) -> Option<H> {
        self.handlers[vector as usize]
    }

    pub fn is_registered(&self, vector: u8) -> bool {
        self.handlers[vector as usize].is_some()
    }

    /// Handler for a vector that just fired. An unrouted vector leaves the
    /// trap unserviced, so it is fatal.
    pub fn route(&self, vector: u8) -> H {
        match self.handlers[vector as usize] {
            Some(handler) => handler,
            None => panic!("no handler registered for interrupt vector {}", vector),
        }
    }
}

impl<H: Copy> Default for Dispatcher<H> {
    fn default() -> Self {
        Self::new()
    }
}
