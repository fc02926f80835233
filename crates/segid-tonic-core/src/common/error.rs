//! Error types for the ID service.
//!
//! This module defines the central `Error` enum, which captures every
//! reportable failure of a request. It implements `From<Error>` for
//! `tonic::Status` so handlers can propagate errors with `?`.
//!
//! Only a classification string crosses the wire for generator failures.
//! The full error, including driver text, is meant for server-side logs.
//!
//! ## Error Cases
//! - `Generator`: The segment generator failed (unknown tag, storage failure,
//!   lock timeout, misconfigured record).
//! - `InvalidRequest`: The client request was malformed or exceeded bounds.
//! - `ServiceShutdown`: A request arrived while the service was shutting down.

use segid::Error as GeneratorError;
use tonic::Status;

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the ID service.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// The segment generator failed to produce an identifier.
    #[error(transparent)]
    Generator(#[from] GeneratorError),

    /// The client request was invalid or exceeded constraints.
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// The service is in the process of shutting down.
    #[error("Service is shutting down")]
    ServiceShutdown,
}

impl From<Error> for Status {
    fn from(err: Error) -> Self {
        match err {
            Error::Generator(e) => match e {
                GeneratorError::TagNotFound { .. } => Status::not_found("tag not found"),
                GeneratorError::InvalidRecord { .. } => {
                    Status::failed_precondition("tag misconfigured")
                }
                GeneratorError::LockContentionTimeout { .. } => {
                    Status::unavailable("range allocation busy")
                }
                GeneratorError::TransactionFailure { .. } => {
                    Status::unavailable("range allocation failed")
                }
                _ => Status::internal("id generation failed"),
            },
            Error::InvalidRequest { reason } => Status::invalid_argument(reason),
            Error::ServiceShutdown => Status::unavailable("service is shutting down"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::time::Duration;
    use tonic::Code;

    fn status(err: GeneratorError) -> Status {
        Error::from(err).into()
    }

    #[test]
    fn generator_errors_are_classified() {
        let s = status(GeneratorError::TagNotFound {
            tag: "order".into(),
        });
        assert_eq!(s.code(), Code::NotFound);

        let s = status(GeneratorError::InvalidRecord {
            tag: "order".into(),
            reason: "step must be positive, found 0".into(),
        });
        assert_eq!(s.code(), Code::FailedPrecondition);

        let s = status(GeneratorError::LockContentionTimeout {
            tag: "order".into(),
            waited: Duration::from_millis(10),
        });
        assert_eq!(s.code(), Code::Unavailable);
    }

    #[test]
    fn storage_text_is_not_exposed() {
        let s = status(GeneratorError::TransactionFailure {
            tag: "order".into(),
            reason: "commit: Lock wait timeout exceeded; try restarting transaction".into(),
        });
        assert_eq!(s.code(), Code::Unavailable);
        assert_eq!(s.message(), "range allocation failed");
    }

    #[test]
    fn request_errors() {
        let s: Status = Error::InvalidRequest {
            reason: "biz_tag must not be empty".into(),
        }
        .into();
        assert_eq!(s.code(), Code::InvalidArgument);
        assert_eq!(s.message(), "biz_tag must not be empty");

        let s: Status = Error::ServiceShutdown.into();
        assert_eq!(s.code(), Code::Unavailable);
    }
}
