use crate::Range;

/// Represents the result of attempting to take the next identifier from a
/// [`RangeBuffer`].
///
/// - [`BufferStatus::Ready`] indicates an identifier was handed out.
/// - [`BufferStatus::Exhausted`] means the cursor has reached the ceiling and
///   the buffer must be refilled with a fresh [`Range`] before retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferStatus {
    /// An identifier was reserved and is ready to use.
    Ready {
        /// The reserved identifier.
        id: i64,
    },
    /// Every identifier of the current range has been handed out.
    Exhausted,
}

/// The in-memory slice of one tag's identifier space currently owned by this
/// process.
///
/// A buffer hands out identifiers by advancing `cursor` towards `ceiling`.
/// It is a plain value and not safe for concurrent use on its own; the
/// [`SegmentGenerator`] wraps each buffer in its own lock.
///
/// ## Invariants
/// - `cursor <= ceiling`
/// - `cursor` never decreases while the buffer serves one range, and a
///   refill always moves it forward because ranges for a tag only grow
///
/// [`SegmentGenerator`]: crate::SegmentGenerator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeBuffer {
    tag: String,
    cursor: i64,
    ceiling: i64,
    step: i64,
}

impl RangeBuffer {
    /// Creates a buffer positioned just before the first identifier of
    /// `range`.
    ///
    /// # Example
    /// ```
    /// use segid::{BufferStatus, Range, RangeBuffer};
    ///
    /// let range = Range::extend("order", 100, 10).unwrap();
    /// let mut buffer = RangeBuffer::new("order", range);
    /// assert_eq!(buffer.try_next(), BufferStatus::Ready { id: 101 });
    /// assert_eq!(buffer.remaining(), 9);
    /// ```
    pub fn new(tag: impl Into<String>, range: Range) -> Self {
        Self {
            tag: tag.into(),
            cursor: range.floor() - 1,
            ceiling: range.ceiling(),
            step: range.step(),
        }
    }

    /// Hands out the next identifier, or reports exhaustion.
    pub const fn try_next(&mut self) -> BufferStatus {
        if self.cursor < self.ceiling {
            self.cursor += 1;
            BufferStatus::Ready { id: self.cursor }
        } else {
            BufferStatus::Exhausted
        }
    }

    /// Replaces the served range.
    ///
    /// The cursor moves to `range.floor() - 1` so the next
    /// [`Self::try_next`] yields `range.floor()`.
    pub const fn refill(&mut self, range: Range) {
        debug_assert!(range.ceiling() > self.ceiling);
        self.cursor = range.floor() - 1;
        self.ceiling = range.ceiling();
        self.step = range.step();
    }

    /// The tag whose identifiers this buffer serves.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The last identifier handed out.
    pub const fn cursor(&self) -> i64 {
        self.cursor
    }

    /// The highest identifier this buffer may hand out.
    pub const fn ceiling(&self) -> i64 {
        self.ceiling
    }

    /// Step of the most recent extension.
    pub const fn step(&self) -> i64 {
        self.step
    }

    /// Identifiers left before the buffer is exhausted.
    pub const fn remaining(&self) -> i64 {
        self.ceiling - self.cursor
    }

    /// Whether every identifier of the current range has been handed out.
    pub const fn is_exhausted(&self) -> bool {
        self.cursor == self.ceiling
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(max: i64, step: i64) -> Range {
        Range::extend("order", max, step).unwrap()
    }

    fn buffer(max: i64, step: i64) -> RangeBuffer {
        RangeBuffer::new("order", range(max, step))
    }

    #[test]
    fn serves_whole_range_then_exhausts() {
        let mut buffer = buffer(100, 10);
        assert_eq!(buffer.cursor(), 100);
        assert_eq!(buffer.tag(), "order");

        for expected in 101..=110 {
            assert_eq!(buffer.try_next(), BufferStatus::Ready { id: expected });
        }
        assert!(buffer.is_exhausted());
        assert_eq!(buffer.try_next(), BufferStatus::Exhausted);
        assert_eq!(buffer.cursor(), 110);
    }

    #[test]
    fn refill_resumes_at_new_floor() {
        let mut buffer = buffer(0, 2);
        buffer.try_next();
        buffer.try_next();
        assert_eq!(buffer.try_next(), BufferStatus::Exhausted);

        // another process consumed [3, 7]
        buffer.refill(range(7, 5));
        assert_eq!(buffer.step(), 5);
        assert_eq!(buffer.remaining(), 5);
        assert_eq!(buffer.try_next(), BufferStatus::Ready { id: 8 });
        assert_eq!(buffer.ceiling(), 12);
    }

    #[test]
    fn single_id_ranges() {
        let mut buffer = buffer(41, 1);
        assert_eq!(buffer.try_next(), BufferStatus::Ready { id: 42 });
        assert_eq!(buffer.try_next(), BufferStatus::Exhausted);
    }
}
