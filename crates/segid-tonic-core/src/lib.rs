#![doc = include_str!("../README.md")]

mod common;
pub use common::*;
// Public re-export so downstream crates can access `segid` via
// `segid_tonic_core::segid`
pub use segid;

/// gRPC service and message definitions generated from `proto/segid.proto`.
///
/// ## Services
///
/// - `IdGenerator` - `GetId` and `GetIdBatch`
/// - `Admin` - `SetLogLevel`
///
/// See `proto/segid.proto` for the full schema.
pub mod proto {
    tonic::include_proto!("segid");

    /// Encoded file descriptor set for gRPC reflection.
    pub const FILE_DESCRIPTOR_SET: &[u8] = tonic::include_file_descriptor_set!("segid_descriptor");
}
