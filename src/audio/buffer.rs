//! Fixed-capacity circular frame store shared by the producer and consumer.
//!
//! The buffer itself is not synchronized; the playback engine keeps it behind
//! the same lock as the resampler so that both cursors and the full check are
//! always observed together.

use crate::audio::frame::Frame;
use crate::error::EngineError;

/// Circular store of [`Frame`]s with one slot kept empty.
///
/// `write_cursor == read_cursor` means empty; the buffer is full when
/// advancing the write cursor would land on the read cursor. A buffer of
/// capacity `N` therefore holds at most `N - 1` unread frames.
#[derive(Debug, Clone, Default)]
pub struct RingBuffer {
    frames: Vec<Frame>,
    write_cursor: usize,
    read_cursor: usize,
}

impl RingBuffer {
    /// Create an empty buffer with no backing store.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Allocate a zero-filled buffer of `capacity` frames.
    ///
    /// Allocation failure is reported instead of aborting so a resize can be
    /// abandoned while the previous buffer stays in use.
    pub fn try_with_capacity(capacity: usize) -> Result<Self, EngineError> {
        let mut frames = Vec::new();
        frames
            .try_reserve_exact(capacity)
            .map_err(|_| EngineError::Allocation { frames: capacity })?;
        frames.resize(capacity, Frame::SILENCE);
        Ok(Self {
            frames,
            write_cursor: 0,
            read_cursor: 0,
        })
    }

    /// Total number of slots, including the one that is always kept empty.
    pub fn capacity(&self) -> usize {
        self.frames.len()
    }

    pub fn write_cursor(&self) -> usize {
        self.write_cursor
    }

    pub fn read_cursor(&self) -> usize {
        self.read_cursor
    }

    /// Number of unread frames.
    pub fn len(&self) -> usize {
        if self.write_cursor >= self.read_cursor {
            self.write_cursor - self.read_cursor
        } else {
            self.capacity() - self.read_cursor + self.write_cursor
        }
    }

    pub fn is_empty(&self) -> bool {
        self.write_cursor == self.read_cursor
    }

    /// Return `true` when the next write would collide with the read cursor.
    ///
    /// A buffer without backing store is always full.
    pub fn is_full(&self) -> bool {
        let capacity = self.capacity();
        if capacity == 0 {
            return true;
        }
        self.advance(self.write_cursor) == self.read_cursor
    }

    /// Number of frames that can be written before the buffer is full.
    pub fn free(&self) -> usize {
        self.capacity().saturating_sub(self.len() + 1)
    }

    /// Unread frames as a fraction of the capacity, in `[0.0, 1.0)`.
    pub fn fill_fraction(&self) -> f32 {
        let capacity = self.capacity();
        if capacity == 0 {
            return 0.0;
        }
        self.len() as f32 / capacity as f32
    }

    /// Store a frame at the write cursor and advance it.
    ///
    /// The caller must have checked [`RingBuffer::is_full`] first.
    #[inline]
    pub fn write(&mut self, frame: Frame) {
        debug_assert!(!self.is_full(), "write into a full ring buffer");
        self.frames[self.write_cursor] = frame;
        self.write_cursor = self.advance(self.write_cursor);
    }

    /// Pop the frame at the read cursor, or `None` when empty.
    #[inline]
    pub fn read_one(&mut self) -> Option<Frame> {
        if self.is_empty() {
            return None;
        }
        let frame = self.frames[self.read_cursor];
        self.read_cursor = self.advance(self.read_cursor);
        Some(frame)
    }

    /// Discard unread frames and rewind both cursors, keeping the allocation.
    pub fn clear(&mut self) {
        self.frames.fill(Frame::SILENCE);
        self.write_cursor = 0;
        self.read_cursor = 0;
    }

    #[inline]
    fn advance(&self, cursor: usize) -> usize {
        let next = cursor + 1;
        if next >= self.capacity() {
            0
        } else {
            next
        }
    }
}
