//! Fixed-capacity FIFO ring.
//!
//! The same structure serves as the free list of every id pool (tokens are
//! free slot indices) and as the scheduler's ready queue (tokens are pids).

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    Full,
    Empty,
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueError::Full => write!(f, "queue is full"),
            QueueError::Empty => write!(f, "queue is empty"),
        }
    }
}

pub struct CircularAllocator<T: Copy, const N: usize> {
    items: [Option<T>; N],
    head: usize,
    tail: usize,
    len: usize,
}

impl<T: Copy, const N: usize> CircularAllocator<T, N> {
    pub const fn new() -> Self {
        Self {
            items: [None; N],
            head: 0,
            tail: 0,
            len: 0,
        }
    }

    /// Drops every token and rewinds the ring.
    pub fn init(&mut self) {
        self.items = [None; N];
        self.head = 0;
        self.tail = 0;
        self.len = 0;
    }

    pub fn enqueue(&mut self, token: T) -> Result<(), QueueError> {
        if self.len == N {
            return Err(QueueError::Full);
        }
        self.items[self.tail] = Some(token);
        self.tail = (self.tail + 1) % N;
        self.len += 1;
        Ok(())
    }

    pub fn dequeue(&mut self) -> Result<T, QueueError> {
        if self.len == 0 {
            return Err(QueueError::Empty);
        }
        let token = self.items[self.head].take().ok_or(QueueError::Empty)?;
        self.head = (self.head + 1) % N;
        self.len -= 1;
        Ok(token)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == N
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Tokens from head to tail without consuming them.
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        (0..self.len).filter_map(move |i| self.items[(self.head + i) % N])
    }
}

impl<const N: usize> CircularAllocator<usize, N> {
    /// Resets the ring to hold every index `0..N`, lowest first.
    pub fn fill(&mut self) {
        self.init();
        for index in 0..N {
            self.items[index] = Some(index);
        }
        self.len = N;
    }
}

impl<T: Copy, const N: usize> Default for CircularAllocator<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let mut queue: CircularAllocator<u32, 4> = CircularAllocator::new();
        for token in [7, 3, 9] {
            queue.enqueue(token).unwrap();
        }
        assert_eq!(queue.dequeue(), Ok(7));
        queue.enqueue(1).unwrap();
        queue.enqueue(5).unwrap();
        assert_eq!(queue.iter().collect::<Vec<_>>(), [3, 9, 1, 5]);
        assert_eq!(queue.dequeue(), Ok(3));
        assert_eq!(queue.dequeue(), Ok(9));
        assert_eq!(queue.dequeue(), Ok(1));
        assert_eq!(queue.dequeue(), Ok(5));
    }

    #[test]
    fn test_full_and_empty() {
        let mut queue: CircularAllocator<u8, 2> = CircularAllocator::new();
        assert_eq!(queue.dequeue(), Err(QueueError::Empty));
        queue.enqueue(1).unwrap();
        queue.enqueue(2).unwrap();
        assert!(queue.is_full());
        assert_eq!(queue.enqueue(3), Err(QueueError::Full));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_len_tracks_operations() {
        let mut queue: CircularAllocator<u16, 5> = CircularAllocator::new();
        let mut expected = 0usize;
        // Interleave so head and tail wrap several times.
        for round in 0..20u16 {
            if round % 3 == 2 {
                queue.dequeue().unwrap();
                expected -= 1;
            } else if queue.enqueue(round).is_ok() {
                expected += 1;
            }
            assert_eq!(queue.len(), expected);
        }
    }

    #[test]
    fn test_fill_and_init() {
        let mut pool: CircularAllocator<usize, 3> = CircularAllocator::new();
        pool.fill();
        assert!(pool.is_full());
        assert_eq!(pool.dequeue(), Ok(0));
        pool.enqueue(0).unwrap();
        assert_eq!(pool.iter().collect::<Vec<_>>(), [1, 2, 0]);
        pool.init();
        assert!(pool.is_empty());
        assert_eq!(pool.capacity(), 3);
    }
}
