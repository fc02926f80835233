use crate::{Error, Range, RangeStore, Result};
use parking_lot::Mutex;
use std::{
    collections::HashMap,
    sync::atomic::{AtomicU64, Ordering},
    time::SystemTime,
};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// The durable state of one tag, as held by a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationRecord {
    /// Unique key of the identifier stream.
    pub tag: String,
    /// Highest identifier ever leased to any process.
    pub allocated_max: i64,
    /// Size of each leased range.
    pub step: i64,
    /// Time of the last extension (or provisioning).
    pub updated_at: SystemTime,
}

/// A process-local [`RangeStore`].
///
/// Every extension runs under one mutex, so it is trivially atomic within the
/// process. Ranges are *not* shared with other processes, which makes this
/// store suitable for tests, benchmarks and single-instance development only.
///
/// # Example
/// ```
/// # tokio_test_block_on(async {
/// use segid::{MemoryRangeStore, RangeStore};
///
/// let store = MemoryRangeStore::new();
/// store.provision("order", 100, 10);
///
/// let range = store.extend_range("order").await.unwrap();
/// assert_eq!((range.floor(), range.ceiling()), (101, 110));
/// assert_eq!(store.record("order").unwrap().allocated_max, 110);
/// # });
/// # fn tokio_test_block_on<F: core::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MemoryRangeStore {
    records: Mutex<HashMap<String, AllocationRecord>>,
    extensions: AtomicU64,
}

impl MemoryRangeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates or overwrites the allocation record for `tag`.
    ///
    /// This is the out-of-band provisioning path; the store itself never
    /// creates records while serving extensions.
    pub fn provision(&self, tag: impl Into<String>, allocated_max: i64, step: i64) {
        let tag = tag.into();
        self.records.lock().insert(
            tag.clone(),
            AllocationRecord {
                tag,
                allocated_max,
                step,
                updated_at: SystemTime::now(),
            },
        );
    }

    /// Returns a copy of the record for `tag`, if provisioned.
    pub fn record(&self, tag: &str) -> Option<AllocationRecord> {
        self.records.lock().get(tag).cloned()
    }

    /// Number of successful extensions served so far.
    pub fn extensions(&self) -> u64 {
        self.extensions.load(Ordering::Relaxed)
    }
}

impl RangeStore for MemoryRangeStore {
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    async fn extend_range(&self, tag: &str) -> Result<Range> {
        let mut records = self.records.lock();
        let record = records
            .get_mut(tag)
            .ok_or_else(|| Error::tag_not_found(tag))?;

        let range = Range::extend(tag, record.allocated_max, record.step)?;
        record.allocated_max = range.ceiling();
        record.updated_at = SystemTime::now();
        drop(records);

        self.extensions.fetch_add(1, Ordering::Relaxed);
        Ok(range)
    }
}
