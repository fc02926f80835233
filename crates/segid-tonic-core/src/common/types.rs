//! Shared limits and aliases for the segid gRPC service.
//!
//! Both the server and clients read these so that request validation agrees
//! on both ends of the wire.

/// The identifier type handed out by the service.
pub type Id = i64;

/// Default upper bound on the `count` of a single `GetIdBatch` request.
///
/// The generator itself places no bound on batch size; the service enforces
/// this (configurable) limit before calling it.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 1000;

/// Longest accepted `biz_tag`, matching the `VARCHAR(128)` key column.
pub const MAX_TAG_LEN: usize = 128;
