//! Fixed-length rolling window of signed 16-bit samples.
//!
//! The window is always full: it starts as `capacity` zeros and every push
//! overwrites the oldest samples, so the newest `capacity` samples are always
//! available in arrival order.
//!
//! # Example
//!
//! ```rust
//! use pitch_relay::audio::SampleBuffer;
//!
//! let mut buf = SampleBuffer::new(4);
//! buf.push(&[1, 2, 3, 4, 5]); // 5 items → capacity 4 → oldest dropped
//! assert_eq!(buf.snapshot(4), vec![2, 3, 4, 5]);
//! assert_eq!(buf.len(), 4);
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

// ---------------------------------------------------------------------------
// SampleBuffer
// ---------------------------------------------------------------------------

/// A fixed-length circular sample window.
///
/// ## Overflow behaviour
///
/// A push of `M` samples evicts the oldest `M`.  When `M > capacity` only the
/// trailing `capacity` samples of the push survive.  The buffer never
/// allocates beyond its initial capacity.
pub struct SampleBuffer {
    buf: Vec<i16>,
    /// Index of the *next* write position, which is also the oldest sample.
    write_pos: usize,
}

impl SampleBuffer {
    /// Create a window of `capacity` zero samples.
    ///
    /// # Panics
    ///
    /// Panics if `capacity == 0`.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "SampleBuffer capacity must be > 0");
        Self {
            buf: vec![0; capacity],
            write_pos: 0,
        }
    }

    /// Append `data`, evicting the same number of oldest samples.
    pub fn push(&mut self, data: &[i16]) {
        let capacity = self.buf.len();
        let data = if data.len() > capacity {
            &data[data.len() - capacity..]
        } else {
            data
        };

        // At most two contiguous copies: up to the end, then from the start.
        let first = data.len().min(capacity - self.write_pos);
        self.buf[self.write_pos..self.write_pos + first].copy_from_slice(&data[..first]);
        let rest = &data[first..];
        self.buf[..rest.len()].copy_from_slice(rest);

        self.write_pos = (self.write_pos + data.len()) % capacity;
    }

    /// Owned copy of the newest `k` samples in chronological order.
    ///
    /// `k` is clamped to the capacity.
    pub fn snapshot(&self, k: usize) -> Vec<i16> {
        let capacity = self.buf.len();
        let k = k.min(capacity);
        let start = (self.write_pos + capacity - k) % capacity;

        let mut out = Vec::with_capacity(k);
        if start + k <= capacity {
            out.extend_from_slice(&self.buf[start..start + k]);
        } else {
            out.extend_from_slice(&self.buf[start..]);
            out.extend_from_slice(&self.buf[..k - (capacity - start)]);
        }
        out
    }

    /// Reset every sample to silence.
    pub fn clear(&mut self) {
        self.buf.iter_mut().for_each(|s| *s = 0);
        self.write_pos = 0;
    }

    /// Number of samples held, always equal to [`capacity`](Self::capacity).
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Always `false`; the window never shrinks below its capacity.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Maximum number of samples the window holds.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }
}

// ---------------------------------------------------------------------------
// SharedSampleBuffer
// ---------------------------------------------------------------------------

/// Thread-safe handle to a [`SampleBuffer`].
///
/// Each [`push`](Self::push) and [`snapshot`](Self::snapshot) holds the lock
/// for exactly one copy, so a snapshot sees every concurrent push either
/// completely or not at all.
#[derive(Clone)]
pub struct SharedSampleBuffer {
    inner: Arc<Mutex<SampleBuffer>>,
}

impl SharedSampleBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SampleBuffer::new(capacity))),
        }
    }

    pub fn push(&self, data: &[i16]) {
        self.lock().push(data);
    }

    pub fn snapshot(&self, k: usize) -> Vec<i16> {
        self.lock().snapshot(k)
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    // A panic elsewhere must not stop ingestion; the window is always in a
    // consistent state between pushes.
    fn lock(&self) -> MutexGuard<'_, SampleBuffer> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
