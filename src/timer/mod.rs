//! # Timer Subsystem
//!
//! One hardware tick source multiplexed into a fixed number of software
//! timers.
//!
//! ## Firing Rule
//!
//! On every tick the counter is advanced first, then each registered slot is
//! visited in index order. A slot fires when `ticks % interval == 0`, so the
//! schedule is anchored to absolute time rather than to the moment the timer
//! was registered:
//!
//! ```text
//! interval = 5, repeat = 3
//! tick   1 2 3 4 5 6 7 8 9 10 .. 15 .. 20
//! fires          ●          ●     ●     (slot already returned)
//! ```
//!
//! Callbacks run inside the timer interrupt and must return promptly.

#[cfg(target_os = "none")]
pub mod pit;

use crate::data_structures::CircularAllocator;
use crate::kernel::KernelError;

pub type TimerId = usize;

/// How many more times a timer fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repeat {
    Forever,
    Times(u32),
}

impl From<i32> for Repeat {
    /// Negative counts repeat forever.
    fn from(count: i32) -> Self {
        if count < 0 {
            Repeat::Forever
        } else {
            Repeat::Times(count as u32)
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Timer<Cb: Copy> {
    pub callback: Cb,
    pub interval: u32,
    pub repeat: Repeat,
}

pub struct Timers<Cb: Copy, const N: usize> {
    ticks: u32,
    slots: [Option<Timer<Cb>>; N],
    free: CircularAllocator<TimerId, N>,
}

impl<Cb: Copy, const N: usize> Timers<Cb, N> {
    /// An empty table with no free slots; call [`Timers::init`] before use.
    pub const fn new() -> Self {
        Self {
            ticks: 0,
            slots: [None; N],
            free: CircularAllocator::new(),
        }
    }

    /// Clears every timer and rewinds the clock.
    pub fn init(&mut self) {
        self.ticks = 0;
        self.slots = [None; N];
        self.free.fill();
    }

    /// Registers `callback` to fire every `interval` ticks.
    ///
    /// A zero interval is a caller bug and panics.
    pub fn register(
        &mut self,
        callback: Cb,
        interval: u32,
        repeat: impl Into<Repeat>,
    ) -> Result<TimerId, KernelError> {
        assert!(interval > 0, "timer interval must be non-zero");

        let id = self.free.dequeue()?;
        self.slots[id] = Some(Timer {
            callback,
            interval,
            repeat: repeat.into(),
        });
        Ok(id)
    }

    /// Frees the slot of timer `id`. An id outside the table panics.
    pub fn unregister(&mut self, id: TimerId) -> Result<(), KernelError> {
        assert!(id < N, "timer id {} out of range (max {})", id, N);

        if self.slots[id].take().is_none() {
            return Err(KernelError::NotRegistered);
        }
        self.free.enqueue(id)?;
        Ok(())
    }

    pub fn get(&self, id: TimerId) -> Option<&Timer<Cb>> {
        self.slots.get(id).and_then(Option::as_ref)
    }

    pub fn active(&self) -> usize {
        N - self.free.len()
    }

    pub fn system_time(&self) -> u32 {
        self.ticks
    }

    /// Counts one tick; the counter wraps silently.
    pub fn advance(&mut self) -> u32 {
        self.ticks = self.ticks.wrapping_add(1);
        self.ticks
    }

    /// Settles a due timer and hands back its callback.
    ///
    /// The repeat count is charged before the callback runs, so a timer on
    /// its last fire has already given its slot back by the time the
    /// callback sees the table.
    pub fn fire(&mut self, id: TimerId) -> Option<Cb> {
        let ticks = self.ticks;
        let timer = self.slots.get_mut(id)?.as_mut()?;
        if ticks % timer.interval != 0 {
            return None;
        }

        let callback = timer.callback;
        let repeat = timer.repeat;
        match repeat {
            Repeat::Forever => {}
            Repeat::Times(count) if count > 1 => timer.repeat = Repeat::Times(count - 1),
            Repeat::Times(_) => {
                // Last (or only) fire.
                self.slots[id] = None;
                let returned = self.free.enqueue(id);
                debug_assert!(returned.is_ok(), "timer slot {} returned twice", id);
            }
        }
        Some(callback)
    }
}

impl<Cb: Copy, const N: usize> Default for Timers<Cb, N> {
    fn default() -> Self {
        Self::new()
    }
}
