//! Half-open offset ranges.

use std::fmt;

use stride_core::Offset;

use crate::error::{TrackerError, TrackerResult};

/// A half-open interval `[start, stop)` of offsets.
///
/// A stop of [`Offset::MAX`] marks the range as unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OffsetRange {
    start: Offset,
    stop: Offset,
}

impl OffsetRange {
    /// Creates a range.
    ///
    /// # Errors
    /// Returns `InvalidRange` if `start > stop`.
    pub const fn new(start: Offset, stop: Offset) -> TrackerResult<Self> {
        if start.get() > stop.get() {
            return Err(TrackerError::InvalidRange { start, stop });
        }
        Ok(Self { start, stop })
    }

    /// Creates the range `[start, ∞)`.
    #[must_use]
    pub const fn unbounded(start: Offset) -> Self {
        Self {
            start,
            stop: Offset::MAX,
        }
    }

    /// First offset of the range.
    #[must_use]
    pub const fn start(&self) -> Offset {
        self.start
    }

    /// First offset past the range.
    #[must_use]
    pub const fn stop(&self) -> Offset {
        self.stop
    }

    /// Number of offsets in the range.
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.stop.distance_from(self.start)
    }

    /// Returns true if the range holds no offsets.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start.get() == self.stop.get()
    }

    /// Returns true if the range has no finite stop.
    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        self.stop.get() == Offset::MAX.get()
    }

    /// Returns true if `offset` lies in `[start, stop)`.
    #[must_use]
    pub const fn contains(&self, offset: Offset) -> bool {
        offset.get() >= self.start.get() && offset.get() < self.stop.get()
    }

    /// Splits the range into `[start, point)` and `[point, stop)`.
    ///
    /// # Errors
    /// Returns `InvalidRange` if `point` lies outside `[start, stop]`.
    pub const fn split_at(&self, point: Offset) -> TrackerResult<(Self, Self)> {
        if point.get() < self.start.get() || point.get() > self.stop.get() {
            return Err(TrackerError::InvalidRange {
                start: point,
                stop: self.stop,
            });
        }
        Ok((
            Self {
                start: self.start,
                stop: point,
            },
            Self {
                start: point,
                stop: self.stop,
            },
        ))
    }
}

impl fmt::Display for OffsetRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unbounded() {
            write!(f, "[{}, inf)", self.start)
        } else {
            write!(f, "[{}, {})", self.start, self.stop)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start: u64, stop: u64) -> OffsetRange {
        OffsetRange::new(Offset::new(start), Offset::new(stop)).unwrap()
    }

    #[test]
    fn test_inverted_range_rejected() {
        let result = OffsetRange::new(Offset::new(5), Offset::new(4));
        assert_eq!(
            result,
            Err(TrackerError::InvalidRange {
                start: Offset::new(5),
                stop: Offset::new(4),
            })
        );
    }

    #[test]
    fn test_empty_range() {
        let r = range(3, 3);
        assert!(r.is_empty());
        assert_eq!(r.len(), 0);
        assert!(!r.contains(Offset::new(3)));
    }

    #[test]
    fn test_contains_is_half_open() {
        let r = range(2, 5);
        assert!(!r.contains(Offset::new(1)));
        assert!(r.contains(Offset::new(2)));
        assert!(r.contains(Offset::new(4)));
        assert!(!r.contains(Offset::new(5)));
    }

    #[test]
    fn test_split_at() {
        let (left, right) = range(2, 10).split_at(Offset::new(6)).unwrap();
        assert_eq!(left, range(2, 6));
        assert_eq!(right, range(6, 10));

        // Both edges are valid split points.
        let (left, right) = range(2, 10).split_at(Offset::new(2)).unwrap();
        assert!(left.is_empty());
        assert_eq!(right, range(2, 10));
        let (left, right) = range(2, 10).split_at(Offset::new(10)).unwrap();
        assert_eq!(left, range(2, 10));
        assert!(right.is_empty());

        assert!(range(2, 10).split_at(Offset::new(11)).is_err());
        assert!(range(2, 10).split_at(Offset::new(1)).is_err());
    }

    #[test]
    fn test_unbounded() {
        let r = OffsetRange::unbounded(Offset::new(7));
        assert!(r.is_unbounded());
        assert_eq!(r.len(), u64::MAX - 7);
        assert_eq!(r.to_string(), "[7, inf)");

        let (left, right) = r.split_at(Offset::new(9)).unwrap();
        assert!(!left.is_unbounded());
        assert!(right.is_unbounded());
        assert_eq!(left.to_string(), "[7, 9)");
    }
}
