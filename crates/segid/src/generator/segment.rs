use crate::{BufferStatus, Error, GeneratorConfig, Range, RangeBuffer, RangeStore, Result};
use parking_lot::RwLock;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{Mutex, MutexGuard};

#[cfg(feature = "tracing")]
use tracing::instrument;

type Slot = Arc<Mutex<RangeBuffer>>;

// Upper bound on the up-front allocation of a batch; larger batches grow.
const BATCH_PREALLOC: usize = 1024;

/// A point-in-time view of one tag's buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferState {
    /// Last identifier handed out, or `floor - 1` before the first one.
    pub cursor: i64,
    /// Last identifier of the leased range.
    pub ceiling: i64,
    /// Size of the leased range.
    pub step: i64,
    /// Identifiers left before the next refill.
    pub remaining: i64,
}

impl From<&RangeBuffer> for BufferState {
    fn from(buffer: &RangeBuffer) -> Self {
        Self {
            cursor: buffer.cursor(),
            ceiling: buffer.ceiling(),
            step: buffer.step(),
            remaining: buffer.remaining(),
        }
    }
}

/// A segment-based ID generator serving many tags from leased ranges.
///
/// Each tag gets a [`RangeBuffer`] the first time it is requested. Requests
/// are answered from the buffer in memory; only when it is exhausted does the
/// generator go back to the [`RangeStore`] for the next range.
///
/// ## Locking
///
/// - The tag map sits behind a read/write lock. Lookups of known tags take
///   the shared side and never contend with each other; the exclusive side is
///   only taken to insert a tag's first buffer.
/// - Every buffer has its own async mutex. A refill holds it across the store
///   round trip, so callers of the *same* tag wait for the refill while other
///   tags are served freely.
///
/// ## Features
/// - ✅ Unique across processes sharing the store
/// - ✅ Strictly increasing per tag within this process
/// - ✅ Bounded store calls ([`GeneratorConfig::store_timeout`])
///
/// ## See Also
/// - [`MemoryRangeStore`]
///
/// [`MemoryRangeStore`]: crate::MemoryRangeStore
pub struct SegmentGenerator<S>
where
    S: RangeStore,
{
    store: S,
    buffers: RwLock<HashMap<String, Slot>>,
    config: GeneratorConfig,
}

impl<S> SegmentGenerator<S>
where
    S: RangeStore,
{
    /// Creates a generator over `store` with the default
    /// [`GeneratorConfig`].
    ///
    /// # Example
    /// ```
    /// # tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(async {
    /// use segid::{MemoryRangeStore, SegmentGenerator};
    ///
    /// let store = MemoryRangeStore::new();
    /// store.provision("order", 100, 10);
    ///
    /// let generator = SegmentGenerator::new(store);
    /// assert_eq!(generator.get_id("order").await.unwrap(), 101);
    /// assert_eq!(generator.get_id("order").await.unwrap(), 102);
    /// # });
    /// ```
    pub fn new(store: S) -> Self {
        Self::with_config(store, GeneratorConfig::default())
    }

    pub fn with_config(store: S, config: GeneratorConfig) -> Self {
        Self {
            store,
            buffers: RwLock::new(HashMap::new()),
            config,
        }
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub const fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Returns the next identifier for `tag`.
    ///
    /// Served from memory while the tag's buffer has room. When it is
    /// exhausted, the range is extended through the store while holding the
    /// tag's buffer lock and the first identifier of the new range is
    /// returned.
    ///
    /// # Errors
    /// - [`Error::TagNotFound`] if the tag is not provisioned. No buffer is
    ///   cached, so the next call asks the store again.
    /// - [`Error::InvalidRecord`] if the tag's record cannot be extended.
    /// - [`Error::TransactionFailure`] if the extension failed or timed out.
    ///   The buffer stays exhausted and the next caller retries the refill.
    /// - [`Error::LockContentionTimeout`] if
    ///   [`GeneratorConfig::lock_timeout`] elapsed first.
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub async fn get_id(&self, tag: &str) -> Result<i64> {
        let slot = match self.lookup(tag) {
            Some(slot) => slot,
            None => self.load(tag).await?,
        };

        let mut buffer = self.lock(tag, &slot).await?;
        self.next_from(tag, &mut buffer).await
    }

    /// Returns `count` identifiers for `tag` in allocation order.
    ///
    /// The batch is all-or-nothing: if any underlying step fails, the
    /// identifiers gathered so far are dropped and only the error is
    /// returned. Identifiers are not reserved contiguously; other callers of
    /// the same tag may interleave. No upper bound is placed on `count`.
    ///
    /// # Errors
    /// Same as [`Self::get_id`].
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub async fn get_id_batch(&self, tag: &str, count: usize) -> Result<Vec<i64>> {
        let mut ids = Vec::with_capacity(count.min(BATCH_PREALLOC));
        for _ in 0..count {
            ids.push(self.get_id(tag).await?);
        }
        Ok(ids)
    }

    /// Whether a buffer has been created for `tag`.
    pub fn contains_tag(&self, tag: &str) -> bool {
        self.buffers.read().contains_key(tag)
    }

    /// Tags with a live buffer, in no particular order.
    pub fn tags(&self) -> Vec<String> {
        self.buffers.read().keys().cloned().collect()
    }

    /// Snapshot of `tag`'s buffer, waiting for any in-flight refill.
    pub async fn buffer_state(&self, tag: &str) -> Option<BufferState> {
        let slot = self.lookup(tag)?;
        let buffer = slot.lock().await;
        Some(BufferState::from(&*buffer))
    }

    fn lookup(&self, tag: &str) -> Option<Slot> {
        self.buffers.read().get(tag).cloned()
    }

    /// Leases the first range for `tag` and publishes its buffer.
    ///
    /// Two callers may race here. Both extend the range, but only the first
    /// to take the write lock inserts its buffer; the loser drops its own
    /// buffer and the range it held stays consumed in the store.
    async fn load(&self, tag: &str) -> Result<Slot> {
        let range = self.extend(tag).await?;

        let mut buffers = self.buffers.write();
        if let Some(existing) = buffers.get(tag) {
            #[cfg(feature = "tracing")]
            tracing::debug!(
                tag,
                floor = range.floor(),
                ceiling = range.ceiling(),
                "buffer already published, discarding freshly leased range"
            );
            return Ok(Arc::clone(existing));
        }

        let slot = Arc::new(Mutex::new(RangeBuffer::new(tag, range)));
        buffers.insert(tag.to_owned(), Arc::clone(&slot));
        Ok(slot)
    }

    async fn lock<'a>(&self, tag: &str, slot: &'a Slot) -> Result<MutexGuard<'a, RangeBuffer>> {
        match self.config.lock_timeout {
            None => Ok(slot.lock().await),
            Some(waited) => tokio::time::timeout(waited, slot.lock())
                .await
                .map_err(|_| Error::LockContentionTimeout {
                    tag: tag.to_owned(),
                    waited,
                }),
        }
    }

    async fn next_from(&self, tag: &str, buffer: &mut RangeBuffer) -> Result<i64> {
        if let BufferStatus::Ready { id } = buffer.try_next() {
            return Ok(id);
        }

        let range = self.extend(tag).await?;
        buffer.refill(range);
        match buffer.try_next() {
            BufferStatus::Ready { id } => Ok(id),
            BufferStatus::Exhausted => Err(Self::cold_empty_range(tag)),
        }
    }

    async fn extend(&self, tag: &str) -> Result<Range> {
        let timeout = self.config.store_timeout;
        let result = tokio::time::timeout(timeout, self.store.extend_range(tag))
            .await
            .unwrap_or_else(|_| {
                Err(Error::transaction(
                    tag,
                    format_args!("timed out after {timeout:?}"),
                ))
            });

        #[cfg(feature = "tracing")]
        match &result {
            Ok(range) => tracing::info!(
                tag,
                floor = range.floor(),
                ceiling = range.ceiling(),
                step = range.step(),
                "leased new range"
            ),
            Err(e) => tracing::error!(tag, error = %e, "range extension failed"),
        }

        result
    }

    #[cold]
    #[inline(never)]
    fn cold_empty_range(tag: &str) -> Error {
        Error::invalid_record(tag, "store returned an empty range")
    }
}
