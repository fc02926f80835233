use core::time::Duration;

/// A result type defaulting to the crate's [`enum@Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All errors that `segid` can produce while serving identifiers.
///
/// Every variant carries the tag it was raised for so callers can log or
/// report it without threading the tag through separately. Storage drivers
/// report their failures as text in [`Error::TransactionFailure`]; the
/// variant itself is the classification, the `reason` is for operators.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The tag has no allocation record.
    ///
    /// Tags are provisioned out-of-band and the store never creates them
    /// implicitly. Retrying will not help until the record exists.
    #[error("tag `{tag}` has no allocation record")]
    TagNotFound { tag: String },

    /// The allocation record exists but cannot be extended.
    ///
    /// Raised for a non-positive `step` or when `max_id + step` would
    /// overflow. Nothing is written in either case.
    #[error("allocation record for `{tag}` is invalid: {reason}")]
    InvalidRecord { tag: String, reason: String },

    /// The storage unit (lock, read, write or commit) failed or timed out.
    ///
    /// The extension was rolled back and the tag's buffer, if any, is left
    /// exhausted but valid. The whole call may be retried.
    #[error("range extension for `{tag}` failed: {reason}")]
    TransactionFailure { tag: String, reason: String },

    /// Waiting for the tag's buffer lock exceeded the configured bound.
    #[error("timed out after {waited:?} waiting for the `{tag}` range buffer")]
    LockContentionTimeout { tag: String, waited: Duration },
}

impl Error {
    pub(crate) fn tag_not_found(tag: &str) -> Self {
        Self::TagNotFound {
            tag: tag.to_owned(),
        }
    }

    pub(crate) fn invalid_record(tag: &str, reason: impl Into<String>) -> Self {
        Self::InvalidRecord {
            tag: tag.to_owned(),
            reason: reason.into(),
        }
    }

    pub(crate) fn transaction(tag: &str, reason: impl core::fmt::Display) -> Self {
        Self::TransactionFailure {
            tag: tag.to_owned(),
            reason: reason.to_string(),
        }
    }

    /// The tag this error was raised for.
    pub fn tag(&self) -> &str {
        match self {
            Self::TagNotFound { tag }
            | Self::InvalidRecord { tag, .. }
            | Self::TransactionFailure { tag, .. }
            | Self::LockContentionTimeout { tag, .. } => tag,
        }
    }

    /// Whether retrying the same call may succeed without operator action.
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::TransactionFailure { .. } | Self::LockContentionTimeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert!(!Error::tag_not_found("order").is_retryable());
        assert!(!Error::invalid_record("order", "step is 0").is_retryable());
        assert!(Error::transaction("order", "deadlock").is_retryable());
        assert!(
            Error::LockContentionTimeout {
                tag: "order".into(),
                waited: Duration::from_millis(5),
            }
            .is_retryable()
        );
    }

    #[test]
    fn carries_tag() {
        let err = Error::transaction("invoice", "commit failed");
        assert_eq!(err.tag(), "invoice");
        assert_eq!(
            err.to_string(),
            "range extension for `invoice` failed: commit failed"
        );
    }
}
