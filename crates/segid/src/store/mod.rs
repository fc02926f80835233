//! Range stores: the durable ledger that serializes range handouts for a tag
//! across every process sharing it.
//!
//! A store exposes a single operation, [`RangeStore::extend_range`], which
//! must read the tag's allocation record, add `step` to `max_id`, persist the
//! result and return the new [`Range`] as one indivisible unit. Two calls for
//! the same tag, from any process, never return overlapping ranges.
//!
//! ## Implementations
//!
//! - [`MemoryRangeStore`] - process-local ledger for tests and development.
//! - `MySqlRangeStore` (feature `mysql`) - row lock held by `SELECT ... FOR
//!   UPDATE` inside a transaction.
//! - `SqliteRangeStore` (feature `sqlite`) - single-statement conditional
//!   `UPDATE ... RETURNING`.

mod memory;
#[cfg(feature = "mysql")]
mod mysql;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use memory::*;
#[cfg_attr(docsrs, doc(cfg(feature = "mysql")))]
#[cfg(feature = "mysql")]
pub use mysql::*;
#[cfg_attr(docsrs, doc(cfg(feature = "sqlite")))]
#[cfg(feature = "sqlite")]
pub use sqlite::*;

use crate::{Range, Result};
use core::future::Future;
use std::sync::Arc;

/// A minimal interface for atomically leasing identifier ranges.
///
/// Implementations must make `extend_range` externally indivisible and
/// mutually exclusive per tag across all processes sharing the backend. No
/// partial extension may ever become visible.
pub trait RangeStore: Send + Sync {
    /// Grows `tag`'s `max_id` by its `step` and returns the freshly reserved
    /// range.
    ///
    /// # Errors
    ///
    /// - [`Error::TagNotFound`] if the tag has no allocation record
    /// - [`Error::InvalidRecord`] if the record cannot be extended
    /// - [`Error::TransactionFailure`] if locking, writing or committing
    ///   failed; nothing was persisted
    ///
    /// [`Error::TagNotFound`]: crate::Error::TagNotFound
    /// [`Error::InvalidRecord`]: crate::Error::InvalidRecord
    /// [`Error::TransactionFailure`]: crate::Error::TransactionFailure
    fn extend_range(&self, tag: &str) -> impl Future<Output = Result<Range>> + Send;
}

impl<S: RangeStore> RangeStore for Arc<S> {
    fn extend_range(&self, tag: &str) -> impl Future<Output = Result<Range>> + Send {
        (**self).extend_range(tag)
    }
}

impl<S: RangeStore> RangeStore for &S {
    fn extend_range(&self, tag: &str) -> impl Future<Output = Result<Range>> + Send {
        (**self).extend_range(tag)
    }
}
