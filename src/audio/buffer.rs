//! Fixed-capacity circular (ring) buffer for `f32` audio samples.
//!
//! When the buffer is full, new samples **overwrite** the oldest data so that
//! the most-recent `capacity` samples are always available.  That is the
//! analysis window the spectrum analyser reads.
//!
//! # Example
//!
//! ```rust
//! use breath_coach::audio::RingBuffer;
//!
//! let mut buf = RingBuffer::new(4);
//! buf.push_slice(&[1.0, 2.0, 3.0, 4.0, 5.0]); // 5 items → capacity 4 → oldest dropped
//! assert_eq!(buf.latest(4), vec![2.0, 3.0, 4.0, 5.0]);
//! assert_eq!(buf.latest(2), vec![4.0, 5.0]);
//! ```

// ---------------------------------------------------------------------------
// RingBuffer
// ---------------------------------------------------------------------------

/// A fixed-capacity circular buffer.
///
/// ## Overflow behaviour
///
/// When [`push_slice`](Self::push_slice) would exceed `capacity`, the oldest
/// samples are silently overwritten.  The buffer never allocates beyond its
/// initial capacity.
#[derive(Debug)]
pub struct RingBuffer<T> {
    buf: Vec<T>,
    capacity: usize,
    /// Index of the *next* write position (wraps around `capacity`).
    write_pos: usize,
    /// Number of valid samples currently stored (≤ `capacity`).
    len: usize,
}

impl<T: Copy + Default> RingBuffer<T> {
    /// Create a new ring buffer with the given `capacity`.
    ///
    /// # Panics
    ///
    /// Panics if `capacity == 0`.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "RingBuffer capacity must be > 0");
        Self {
            buf: vec![T::default(); capacity],
            capacity,
            write_pos: 0,
            len: 0,
        }
    }

    /// Append `data`, overwriting the oldest samples once full.
    pub fn push_slice(&mut self, data: &[T]) {
        for &item in data {
            self.buf[self.write_pos] = item;
            self.write_pos = (self.write_pos + 1) % self.capacity;
            if self.len < self.capacity {
                self.len += 1;
            }
        }
    }

    /// Copy the newest `n` samples in chronological order without consuming
    /// them.
    ///
    /// The result always has exactly `n` elements: when fewer samples are
    /// stored the front is padded with `T::default()`, as if the stream had
    /// been silent before it started.  `n` larger than the capacity is padded
    /// the same way.
    pub fn latest(&self, n: usize) -> Vec<T> {
        let available = self.len.min(n);
        let mut out = Vec::with_capacity(n);
        out.resize(n - available, T::default());

        // The newest sample sits just behind `write_pos`.
        let start = (self.write_pos + self.capacity - available) % self.capacity;
        out.extend((0..available).map(|i| self.buf[(start + i) % self.capacity]));
        out
    }

    /// Discard all samples and reset the write position.
    pub fn clear(&mut self) {
        self.write_pos = 0;
        self.len = 0;
    }

    /// Number of valid samples currently stored.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` when the buffer contains no samples.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
