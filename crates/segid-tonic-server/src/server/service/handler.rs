//! gRPC service implementation for segment-allocated ID generation.
//!
//! This module defines [`IdService`], the concrete implementation of the
//! [`IdGenerator`] gRPC service. Every request is answered from the shared
//! [`SegmentGenerator`]; a request only waits on the store when its tag's
//! buffer has run dry.
//!
//! ## Responsibilities
//!
//! - Validate incoming `GetId` and `GetIdBatch` requests and enforce limits.
//! - Translate generator failures into classified `tonic::Status` codes.
//! - Refuse new requests once shutdown has begun and release the store.

use crate::server::{
    store::BackendStore,
    telemetry::{
        increment_ids_generated, increment_request_errors, increment_requests,
        record_ids_per_request, record_request_duration,
    },
};
use segid_tonic_core::{
    Error,
    proto::{
        GetIdBatchRequest, GetIdBatchResponse, GetIdRequest, GetIdResponse,
        id_generator_server::IdGenerator,
    },
    types::{Id, MAX_TAG_LEN},
};
use segid::SegmentGenerator;
use std::{sync::Arc, time::Instant};
use tokio_util::sync::CancellationToken;
use tonic::{Request, Response, Status};

/// gRPC service handing out per-tag monotonic identifiers.
///
/// Clones share one generator, so every connection draws from the same
/// buffers.
#[derive(Clone)]
pub struct IdService {
    generator: Arc<SegmentGenerator<BackendStore>>,
    max_batch_size: usize,
    shutdown: CancellationToken,
}

impl IdService {
    pub fn new(generator: Arc<SegmentGenerator<BackendStore>>, max_batch_size: usize) -> Self {
        Self {
            generator,
            max_batch_size,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn generator(&self) -> &SegmentGenerator<BackendStore> {
        &self.generator
    }

    /// Stops accepting requests and closes the store's connection pool.
    ///
    /// Extensions already holding a connection run to completion. Anything
    /// arriving afterwards is answered with `UNAVAILABLE`.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.generator.store().close().await;
        tracing::info!(tags = self.generator().tags().len(), "range store closed");
    }

    fn admit(&self, biz_tag: &str) -> Result<(), Error> {
        if self.shutdown.is_cancelled() {
            return Err(Error::ServiceShutdown);
        }
        if biz_tag.is_empty() {
            return Err(Error::InvalidRequest {
                reason: "biz_tag must not be empty".to_string(),
            });
        }
        if biz_tag.len() > MAX_TAG_LEN {
            return Err(Error::InvalidRequest {
                reason: format!("biz_tag exceeds {MAX_TAG_LEN} bytes"),
            });
        }
        Ok(())
    }

    fn check_count(&self, count: usize) -> Result<(), Error> {
        if count == 0 || count > self.max_batch_size {
            return Err(Error::InvalidRequest {
                reason: format!(
                    "count must be between 1 and {}, got {count}",
                    self.max_batch_size
                ),
            });
        }
        Ok(())
    }
}

/// Records the outcome of one request and converts it for the wire.
fn complete<T>(
    biz_tag: &str,
    start: Instant,
    result: Result<T, Error>,
    issued: impl FnOnce(&T) -> usize,
) -> Result<T, Status> {
    record_request_duration(start.elapsed().as_secs_f64() * 1_000.0);

    match result {
        Ok(value) => {
            let count = issued(&value);
            increment_ids_generated(count as u64);
            record_ids_per_request(count as f64);
            Ok(value)
        }
        Err(e) => {
            increment_request_errors();
            match &e {
                Error::InvalidRequest { .. }
                | Error::ServiceShutdown
                | Error::Generator(segid::Error::TagNotFound { .. }) => {
                    tracing::warn!(biz_tag, error = %e, "request rejected");
                }
                _ => tracing::error!(biz_tag, error = %e, "request failed"),
            }
            Err(e.into())
        }
    }
}

#[tonic::async_trait]
impl IdGenerator for IdService {
    /// Returns the next identifier for `biz_tag`.
    #[tracing::instrument(skip_all, fields(biz_tag = %req.get_ref().biz_tag))]
    async fn get_id(&self, req: Request<GetIdRequest>) -> Result<Response<GetIdResponse>, Status> {
        let start = Instant::now();
        increment_requests();
        let GetIdRequest { biz_tag } = req.into_inner();

        let result: Result<Id, Error> = match self.admit(&biz_tag) {
            Ok(()) => self.generator.get_id(&biz_tag).await.map_err(Error::from),
            Err(e) => Err(e),
        };

        let id = complete(&biz_tag, start, result, |_| 1)?;
        Ok(Response::new(GetIdResponse { id }))
    }

    /// Returns `count` identifiers for `biz_tag` in allocation order, or an
    /// error and no identifiers at all.
    #[tracing::instrument(
        skip_all,
        fields(biz_tag = %req.get_ref().biz_tag, count = req.get_ref().count)
    )]
    async fn get_id_batch(
        &self,
        req: Request<GetIdBatchRequest>,
    ) -> Result<Response<GetIdBatchResponse>, Status> {
        let start = Instant::now();
        increment_requests();
        let GetIdBatchRequest { biz_tag, count } = req.into_inner();
        let count = count as usize;

        let result: Result<Vec<Id>, Error> = match self
            .admit(&biz_tag)
            .and_then(|()| self.check_count(count))
        {
            Ok(()) => self
                .generator
                .get_id_batch(&biz_tag, count)
                .await
                .map_err(Error::from),
            Err(e) => Err(e),
        };

        let ids = complete(&biz_tag, start, result, Vec::len)?;
        Ok(Response::new(GetIdBatchResponse { ids }))
    }
}
