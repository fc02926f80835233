use crate::{Error, Result};

/// A contiguous block of identifiers `[floor, ceiling]` leased from a
/// [`RangeStore`] in one extension.
///
/// `ceiling` is the record's `max_id` after the extension and
/// `floor = ceiling - step + 1`, so a range always holds exactly `step`
/// identifiers.
///
/// [`RangeStore`]: crate::RangeStore
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Range {
    floor: i64,
    ceiling: i64,
    step: i64,
}

impl Range {
    /// Computes the range produced by extending a record whose current
    /// `max_id` is `allocated_max`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRecord`] if `step` is not positive or if
    /// `allocated_max + step` overflows an `i64`.
    ///
    /// # Example
    /// ```
    /// use segid::Range;
    ///
    /// let range = Range::extend("order", 100, 10).unwrap();
    /// assert_eq!((range.floor(), range.ceiling(), range.step()), (101, 110, 10));
    /// ```
    pub fn extend(tag: &str, allocated_max: i64, step: i64) -> Result<Self> {
        if step <= 0 {
            return Err(Error::invalid_record(
                tag,
                format!("step must be positive, found {step}"),
            ));
        }
        let ceiling = allocated_max.checked_add(step).ok_or_else(|| {
            Error::invalid_record(
                tag,
                format!("max_id {allocated_max} + step {step} overflows"),
            )
        })?;
        Ok(Self {
            floor: ceiling - step + 1,
            ceiling,
            step,
        })
    }

    /// Rebuilds a range from a ceiling already written to the store.
    ///
    /// Used by stores that compute `max_id + step` inside the database.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRecord`] if `step` is not positive or the
    /// floor would underflow.
    pub fn from_ceiling(tag: &str, ceiling: i64, step: i64) -> Result<Self> {
        if step <= 0 {
            return Err(Error::invalid_record(
                tag,
                format!("step must be positive, found {step}"),
            ));
        }
        let floor = ceiling
            .checked_sub(step)
            .and_then(|v| v.checked_add(1))
            .ok_or_else(|| {
                Error::invalid_record(tag, format!("ceiling {ceiling} - step {step} underflows"))
            })?;
        Ok(Self {
            floor,
            ceiling,
            step,
        })
    }

    /// First identifier of the range.
    pub const fn floor(&self) -> i64 {
        self.floor
    }

    /// Last identifier of the range.
    pub const fn ceiling(&self) -> i64 {
        self.ceiling
    }

    /// Number of identifiers in the range.
    pub const fn step(&self) -> i64 {
        self.step
    }

    /// Whether `self` and `other` share at least one identifier.
    pub const fn overlaps(&self, other: &Self) -> bool {
        self.floor <= other.ceiling && other.floor <= self.ceiling
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extend_computes_bounds() {
        let range = Range::extend("order", 0, 1).unwrap();
        assert_eq!((range.floor(), range.ceiling()), (1, 1));

        let range = Range::extend("order", 110, 10).unwrap();
        assert_eq!((range.floor(), range.ceiling(), range.step()), (111, 120, 10));
    }

    #[test]
    fn extend_rejects_bad_records() {
        assert!(matches!(
            Range::extend("order", 10, 0),
            Err(Error::InvalidRecord { .. })
        ));
        assert!(matches!(
            Range::extend("order", 10, -5),
            Err(Error::InvalidRecord { .. })
        ));
        assert!(matches!(
            Range::extend("order", i64::MAX - 3, 4),
            Err(Error::InvalidRecord { .. })
        ));
        assert!(Range::extend("order", i64::MAX - 4, 4).is_ok());
    }

    #[test]
    fn from_ceiling_matches_extend() {
        let a = Range::extend("order", 1_000, 250).unwrap();
        let b = Range::from_ceiling("order", 1_250, 250).unwrap();
        assert_eq!(a, b);
        assert!(Range::from_ceiling("order", i64::MIN, 2).is_err());
    }

    #[test]
    fn consecutive_extensions_do_not_overlap() {
        let first = Range::extend("order", 100, 10).unwrap();
        let second = Range::extend("order", first.ceiling(), 10).unwrap();
        assert!(!first.overlaps(&second));
        assert!(first.overlaps(&first));
        assert_eq!(second.floor(), first.ceiling() + 1);
    }
}
