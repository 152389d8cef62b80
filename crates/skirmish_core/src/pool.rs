//! Free-list of reusable `Vec` buffers bucketed by power-of-two capacity.
//!
//! Zone buckets grow and shrink constantly as units walk across zone
//! borders. Recycling their backing storage through a pool keeps the
//! steady state allocation-free.

/// Maximum idle buffers kept per size class.
const MAX_IDLE_PER_CLASS: usize = 64;

/// Pool of empty `Vec<T>` buffers.
#[derive(Debug, Clone)]
pub struct BufferPool<T> {
    /// `free[c]` holds buffers with capacity of at least `1 << c`.
    free: Vec<Vec<Vec<T>>>,
}

impl<T> Default for BufferPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> BufferPool<T> {
    /// Create an empty pool.
    #[must_use]
    pub const fn new() -> Self {
        Self { free: Vec::new() }
    }

    /// Take an empty buffer able to hold at least `min_capacity` items
    /// without reallocating.
    pub fn take(&mut self, min_capacity: usize) -> Vec<T> {
        let class = size_class(min_capacity);
        // Any larger class satisfies the request too.
        for free in self.free.iter_mut().skip(class) {
            if let Some(buffer) = free.pop() {
                return buffer;
            }
        }
        Vec::with_capacity(1 << class)
    }

    /// Return a buffer to the pool. Its contents are dropped.
    pub fn give(&mut self, mut buffer: Vec<T>) {
        buffer.clear();
        let capacity = buffer.capacity();
        if capacity == 0 {
            return;
        }
        let class = (usize::BITS - 1 - capacity.leading_zeros()) as usize;
        if self.free.len() <= class {
            self.free.resize_with(class + 1, Vec::new);
        }
        if self.free[class].len() < MAX_IDLE_PER_CLASS {
            self.free[class].push(buffer);
        }
    }

    /// Push onto a pooled buffer, swapping it for one twice as large when
    /// full.
    pub fn push(&mut self, buffer: &mut Vec<T>, item: T) {
        if buffer.len() == buffer.capacity() {
            let mut larger = self.take((buffer.len() * 2).max(1));
            larger.append(buffer);
            let old = std::mem::replace(buffer, larger);
            self.give(old);
        }
        buffer.push(item);
    }

    /// Release a buffer's storage to the pool once it is empty.
    pub fn release_if_empty(&mut self, buffer: &mut Vec<T>) {
        if buffer.is_empty() && buffer.capacity() > 0 {
            self.give(std::mem::take(buffer));
        }
    }

    /// Number of idle buffers held.
    #[must_use]
    pub fn idle(&self) -> usize {
        self.free.iter().map(Vec::len).sum()
    }
}

/// Smallest `c` such that `1 << c >= n` (with `n` at least 1).
fn size_class(n: usize) -> usize {
    n.max(1).next_power_of_two().trailing_zeros() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_class() {
        assert_eq!(size_class(0), 0);
        assert_eq!(size_class(1), 0);
        assert_eq!(size_class(2), 1);
        assert_eq!(size_class(3), 2);
        assert_eq!(size_class(64), 6);
        assert_eq!(size_class(65), 7);
    }

    #[test]
    fn test_take_reuses_returned_buffer() {
        let mut pool: BufferPool<u32> = BufferPool::new();
        let mut buffer = pool.take(8);
        buffer.extend([1, 2, 3]);
        let ptr = buffer.as_ptr();
        pool.give(buffer);
        assert_eq!(pool.idle(), 1);

        let again = pool.take(5);
        assert!(again.is_empty());
        assert_eq!(again.as_ptr(), ptr);
        assert_eq!(pool.idle(), 0);
    }

    #[test]
    fn test_take_never_returns_too_small() {
        let mut pool: BufferPool<u32> = BufferPool::new();
        pool.give(Vec::with_capacity(4));
        let buffer = pool.take(16);
        assert!(buffer.capacity() >= 16);
        // The small buffer stays pooled.
        assert_eq!(pool.idle(), 1);
    }

    #[test]
    fn test_push_grows_through_pool() {
        let mut pool: BufferPool<u32> = BufferPool::new();
        let mut buffer = Vec::new();
        for i in 0..10 {
            pool.push(&mut buffer, i);
        }
        assert_eq!(buffer, (0..10).collect::<Vec<_>>());
        assert!(buffer.capacity() >= 10);
        // Every outgrown buffer was recycled.
        assert!(pool.idle() >= 3);
    }

    #[test]
    fn test_release_if_empty() {
        let mut pool: BufferPool<u32> = BufferPool::new();
        let mut buffer = pool.take(4);
        buffer.push(1);
        pool.release_if_empty(&mut buffer);
        assert_eq!(pool.idle(), 0);

        buffer.clear();
        pool.release_if_empty(&mut buffer);
        assert_eq!(pool.idle(), 1);
        assert_eq!(buffer.capacity(), 0);
    }

    #[test]
    fn test_zero_capacity_not_pooled() {
        let mut pool: BufferPool<u32> = BufferPool::new();
        pool.give(Vec::new());
        assert_eq!(pool.idle(), 0);
    }
}
