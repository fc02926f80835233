use crate::server::telemetry::{LogLevelError, LogLevelHandle};
use segid_tonic_core::{
    Error,
    proto::{SetLogLevelRequest, SetLogLevelResponse, admin_server::Admin},
};
use tonic::{Request, Response, Status};

/// Operational controls exposed next to the ID service.
#[derive(Clone)]
pub struct AdminService {
    log_level: LogLevelHandle,
}

impl AdminService {
    pub const fn new(log_level: LogLevelHandle) -> Self {
        Self { log_level }
    }
}

#[tonic::async_trait]
impl Admin for AdminService {
    /// Replaces the active log filter and echoes the one now in effect.
    #[tracing::instrument(skip_all, fields(level = %req.get_ref().level))]
    async fn set_log_level(
        &self,
        req: Request<SetLogLevelRequest>,
    ) -> Result<Response<SetLogLevelResponse>, Status> {
        let raw = req.into_inner().level;
        let requested = raw.trim();
        if requested.is_empty() {
            return Err(Error::InvalidRequest {
                reason: "level must not be empty".to_string(),
            }
            .into());
        }

        let level = match self.log_level.set(requested) {
            Ok(level) => level,
            Err(LogLevelError::Parse(e)) => {
                return Err(Error::InvalidRequest {
                    reason: format!("invalid log filter `{requested}`: {e}"),
                }
                .into());
            }
            Err(e @ LogLevelError::Reload(_)) => {
                tracing::error!(error = %e, "failed to swap log filter");
                return Err(Status::internal("log filter unavailable"));
            }
        };

        tracing::info!(%level, "log level changed");
        Ok(Response::new(SetLogLevelResponse { level }))
    }
}
