//! Reusable output buffers for template execution.
//!
//! HTML rendering executes into an intermediate buffer so headers are only
//! written once execution has succeeded. [`SizedBufferPool`] keeps a bounded
//! number of those buffers around instead of allocating one per request.
//!
//! Buffers are handed out inside a [`PooledBuffer`] guard that returns them
//! to the pool when dropped, so release happens on every exit path.
//!
//! ```rust
//! use layout_render::pool::{BufferPool, PooledBuffer, SizedBufferPool};
//! use std::io::Write;
//!
//! let pool = SizedBufferPool::new(4, 1024);
//! {
//!     let mut buf = PooledBuffer::acquire(&pool);
//!     buf.write_all(b"hello").unwrap();
//!     assert_eq!(buf.as_slice(), b"hello");
//! }
//! assert_eq!(pool.available(), 1);
//! ```

use std::io;
use std::ops::{Deref, DerefMut};

use crossbeam::queue::ArrayQueue;

/// Default number of pooled buffers.
pub const DEFAULT_POOL_SIZE: usize = 32;

/// Default buffer capacity ceiling (512KiB).
pub const DEFAULT_BUFFER_CAPACITY: usize = 1 << 19;

/// A source of reusable byte buffers.
///
/// Implementations must never block: when no buffer is available a new one
/// is allocated, and when the pool is full a returned buffer is dropped.
pub trait BufferPool: Send + Sync + std::fmt::Debug {
    /// Takes a cleared buffer from the pool, allocating if the pool is empty.
    fn get(&self) -> Vec<u8>;

    /// Returns a buffer to the pool.
    fn put(&self, buf: Vec<u8>);
}

/// A bounded pool of byte buffers with a per-buffer capacity ceiling.
///
/// Buffers that grew past the ceiling while in use are replaced by a fresh
/// buffer of the ceiling size when returned, so one oversized response does
/// not pin a large allocation in the pool.
#[derive(Debug)]
pub struct SizedBufferPool {
    queue: ArrayQueue<Vec<u8>>,
    alloc: usize,
}

impl SizedBufferPool {
    /// Creates a pool holding at most `size` buffers of `alloc` bytes each.
    ///
    /// A `size` of zero is treated as one.
    pub fn new(size: usize, alloc: usize) -> Self {
        Self {
            queue: ArrayQueue::new(size.max(1)),
            alloc,
        }
    }

    /// Number of idle buffers currently held by the pool.
    pub fn available(&self) -> usize {
        self.queue.len()
    }

    /// Maximum number of idle buffers the pool keeps.
    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    /// Capacity every pooled buffer is allocated with.
    pub fn buffer_capacity(&self) -> usize {
        self.alloc
    }
}

impl Default for SizedBufferPool {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_SIZE, DEFAULT_BUFFER_CAPACITY)
    }
}

impl BufferPool for SizedBufferPool {
    fn get(&self) -> Vec<u8> {
        self.queue
            .pop()
            .unwrap_or_else(|| Vec::with_capacity(self.alloc))
    }

    fn put(&self, mut buf: Vec<u8>) {
        buf.clear();
        if buf.capacity() > self.alloc {
            buf = Vec::with_capacity(self.alloc);
        }
        // Full pool: the buffer is dropped.
        let _ = self.queue.push(buf);
    }
}

/// A buffer on loan from a [`BufferPool`].
///
/// Dereferences to `Vec<u8>` and implements [`io::Write`]. The buffer goes
/// back to its pool exactly once, when the guard is dropped.
pub struct PooledBuffer<'a> {
    buf: Vec<u8>,
    pool: &'a dyn BufferPool,
}

impl<'a> PooledBuffer<'a> {
    /// Takes a buffer from `pool`.
    pub fn acquire(pool: &'a dyn BufferPool) -> Self {
        Self {
            buf: pool.get(),
            pool,
        }
    }
}

impl Deref for PooledBuffer<'_> {
    type Target = Vec<u8>;

    fn deref(&self) -> &Vec<u8> {
        &self.buf
    }
}

impl DerefMut for PooledBuffer<'_> {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        &mut self.buf
    }
}

impl io::Write for PooledBuffer<'_> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for PooledBuffer<'_> {
    fn drop(&mut self) {
        self.pool.put(std::mem::take(&mut self.buf));
    }
}

impl std::fmt::Debug for PooledBuffer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledBuffer")
            .field("len", &self.buf.len())
            .finish()
    }
}
