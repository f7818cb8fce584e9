//! Reusable envelope buffers.
//!
//! Every outbound call needs a scratch buffer for its envelope. Instead of
//! allocating one per call, handles borrow a buffer from a [`BufferPool`]
//! and the [`PooledBuffer`] guard hands it back when it goes out of scope,
//! whatever became of the send.
//!
//! ```text
//! acquire() ──→ PooledBuffer ──(write envelope, hand to transport)──→ drop
//!     ↑                                                               │
//!     └──────────────────── cleared, returned to pool ───────────────┘
//! ```

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, PoisonError};

/// Default number of idle buffers kept around.
pub const DEFAULT_MAX_IDLE: usize = 16;

/// Default capacity of a freshly allocated buffer.
pub const DEFAULT_BUFFER_CAPACITY: usize = 256;

struct PoolInner {
    idle: Mutex<Vec<Vec<u8>>>,
    max_idle: usize,
    buffer_capacity: usize,
}

/// A shared pool of byte buffers.
///
/// Cloning the pool is cheap (`Arc`) and every clone hands out buffers from
/// the same free list.
#[derive(Clone)]
pub struct BufferPool {
    inner: Arc<PoolInner>,
}

impl BufferPool {
    /// Creates a pool that keeps at most `max_idle` returned buffers.
    pub fn new(max_idle: usize, buffer_capacity: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                idle: Mutex::new(Vec::with_capacity(max_idle)),
                max_idle,
                buffer_capacity,
            }),
        }
    }

    /// Takes an empty buffer from the pool, allocating if none is idle.
    pub fn acquire(&self) -> PooledBuffer {
        let reused = self
            .inner
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();
        let buf = reused
            .unwrap_or_else(|| Vec::with_capacity(self.inner.buffer_capacity));
        PooledBuffer {
            buf,
            pool: Arc::clone(&self.inner),
        }
    }

    /// Number of buffers currently waiting to be reused.
    pub fn idle(&self) -> usize {
        self.inner
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_IDLE, DEFAULT_BUFFER_CAPACITY)
    }
}

impl std::fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferPool")
            .field("idle", &self.idle())
            .field("max_idle", &self.inner.max_idle)
            .finish()
    }
}

/// A buffer on loan from a [`BufferPool`].
///
/// Derefs to `Vec<u8>`. Returned to the pool on drop.
pub struct PooledBuffer {
    buf: Vec<u8>,
    pool: Arc<PoolInner>,
}

impl Deref for PooledBuffer {
    type Target = Vec<u8>;

    fn deref(&self) -> &Vec<u8> {
        &self.buf
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        &mut self.buf
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        let mut buf = std::mem::take(&mut self.buf);
        buf.clear();
        let mut idle = self
            .pool
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if idle.len() < self.pool.max_idle {
            idle.push(buf);
        }
    }
}
