//! gRPC service implementations.
//!
//! ## Structure
//!
//! - [`handler`] - `IdGenerator` entry point (`IdService`), request
//!   validation and shutdown coordination.
//! - [`admin`] - `Admin` entry point (`AdminService`) for runtime log level
//!   changes.

pub mod admin;
pub mod handler;
