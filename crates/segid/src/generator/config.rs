use core::time::Duration;

/// Default bound on a single range extension.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(3);

/// Tuning knobs for a [`SegmentGenerator`].
///
/// [`SegmentGenerator`]: crate::SegmentGenerator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Upper bound on each [`RangeStore::extend_range`] call. An extension
    /// that exceeds it is abandoned and reported as
    /// [`Error::TransactionFailure`].
    ///
    /// [`RangeStore::extend_range`]: crate::RangeStore::extend_range
    /// [`Error::TransactionFailure`]: crate::Error::TransactionFailure
    pub store_timeout: Duration,

    /// Upper bound on waiting for a tag's buffer lock, typically while
    /// another caller refills it. `None` waits indefinitely.
    pub lock_timeout: Option<Duration>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            store_timeout: DEFAULT_STORE_TIMEOUT,
            lock_timeout: None,
        }
    }
}

impl GeneratorConfig {
    #[must_use]
    pub const fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = Some(timeout);
        self
    }
}
