//! Buffer pool for reusing buffers across connections.

use std::sync::{Arc, LazyLock};

use crossbeam_queue::ArrayQueue;

use crate::buffer_set::BufferSet;

const POOL_CAPACITY: usize = 128;

/// Global buffer pool used by the drivers.
pub static GLOBAL_BUFFER_POOL: LazyLock<Arc<BufferPool>> =
    LazyLock::new(|| Arc::new(BufferPool::default()));

/// Buffer pool for reusing `BufferSet` instances across connections.
///
/// A driver takes a buffer set when it creates its connection state and
/// hands it back when the connection is dropped.
#[derive(Debug)]
pub struct BufferPool {
    buffer_sets: ArrayQueue<BufferSet>,
}

impl BufferPool {
    /// Create a new buffer pool with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer_sets: ArrayQueue::new(capacity),
        }
    }

    /// Get a buffer set from the pool, or create a new one if empty.
    pub fn get_buffer_set(&self) -> BufferSet {
        self.buffer_sets.pop().unwrap_or_default()
    }

    /// Return a buffer set to the pool.
    pub fn return_buffer_set(&self, mut buffer_set: BufferSet) {
        buffer_set.reset();

        // Ignore if pool is full
        let _ = self.buffer_sets.push(buffer_set);
    }

    /// Number of idle buffer sets.
    pub fn len(&self) -> usize {
        self.buffer_sets.len()
    }

    /// Returns true if no buffer set is idle.
    pub fn is_empty(&self) -> bool {
        self.buffer_sets.is_empty()
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(POOL_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returned_buffers_are_reset_and_reused() {
        let pool = BufferPool::new(1);
        let mut set = pool.get_buffer_set();
        set.write_buffer.extend_from_slice(b"abc");
        set.sequence_id = 7;
        pool.return_buffer_set(set);
        assert_eq!(pool.len(), 1);

        let set = pool.get_buffer_set();
        assert!(set.write_buffer.is_empty());
        assert_eq!(set.sequence_id, 0);
        assert!(pool.is_empty());
    }

    #[test]
    fn full_pool_drops_extra_buffers() {
        let pool = BufferPool::new(1);
        pool.return_buffer_set(BufferSet::new());
        pool.return_buffer_set(BufferSet::new());
        assert_eq!(pool.len(), 1);
    }
}
