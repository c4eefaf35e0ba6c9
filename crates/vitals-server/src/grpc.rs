use crate::state::AppState;
use tonic::{Request, Response, Status};
use vitals_common::metric::Metric;
use vitals_common::proto::metrics_server::Metrics;
use vitals_common::proto::{
    UpdateBatchRequest, UpdateBatchResponse, ValueCounterRequest, ValueCounterResponse,
    ValueGaugeRequest, ValueGaugeResponse,
};
use vitals_storage::StorageError;

pub struct MetricsService {
    state: AppState,
}

impl MetricsService {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

fn storage_status(e: StorageError) -> Status {
    match e {
        StorageError::NotFound { .. } => Status::not_found(e.to_string()),
        StorageError::MissingPayload { .. } => Status::invalid_argument(e.to_string()),
        e => {
            tracing::error!(error = %e, "storage operation failed");
            Status::internal("storage failure")
        }
    }
}

#[tonic::async_trait]
impl Metrics for MetricsService {
    async fn update_batch(
        &self,
        request: Request<UpdateBatchRequest>,
    ) -> Result<Response<UpdateBatchResponse>, Status> {
        let metrics = request
            .into_inner()
            .metrics
            .into_iter()
            .map(Metric::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(Status::invalid_argument)?;

        self.state.storage.set_batch(&metrics).map_err(storage_status)?;
        tracing::debug!(count = metrics.len(), "batch ingested");
        Ok(Response::new(UpdateBatchResponse {}))
    }

    async fn value_gauge(
        &self,
        request: Request<ValueGaugeRequest>,
    ) -> Result<Response<ValueGaugeResponse>, Status> {
        let id = request.into_inner().id;
        let value = self.state.storage.get_gauge(&id).map_err(storage_status)?;
        Ok(Response::new(ValueGaugeResponse { value }))
    }

    async fn value_counter(
        &self,
        request: Request<ValueCounterRequest>,
    ) -> Result<Response<ValueCounterResponse>, Status> {
        let id = request.into_inner().id;
        let delta = self.state.storage.get_counter(&id).map_err(storage_status)?;
        Ok(Response::new(ValueCounterResponse { delta }))
    }
}
