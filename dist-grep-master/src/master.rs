use std::{num::NonZeroUsize, sync::Arc};

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use dist_grep_core::{
    reducer::FirstValueReducer,
    wire::{
        DebugResponse, ErrorBody, RegisterWorkerRequest, RunJobRequest, RunJobResponse,
        DEBUG_ROUTE, REGISTER_ROUTE, RUN_ROUTE,
    },
};
use tracing::{error, info, warn};

use crate::{
    invoker::MapInvoker,
    job::{Job, JobError},
    registry::WorkerRegistry,
    task::{ExpandError, TaskGenerator},
};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("Enter the pattern to grep")]
    EmptyPattern,

    #[error("no files to search")]
    NoFiles,

    #[error("no workers available")]
    NoWorkers,

    #[error(transparent)]
    Expand(#[from] ExpandError),

    #[error("no regular files found under the given paths")]
    NoTasks,

    #[error(transparent)]
    Job(#[from] JobError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_)
            | ApiError::EmptyPattern
            | ApiError::NoFiles
            | ApiError::Expand(_)
            | ApiError::NoTasks => StatusCode::BAD_REQUEST,
            ApiError::NoWorkers => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Job(JobError::EmptyPattern | JobError::NoTasks) => StatusCode::BAD_REQUEST,
            ApiError::Job(JobError::NoWorkers) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Job(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub struct MasterImpl<I> {
    registry: WorkerRegistry,
    invoker: Arc<I>,
    task_generator: TaskGenerator,
    max_in_flight: NonZeroUsize,
}

// Manual impl: `I` itself does not need to be `Clone`.
impl<I> Clone for MasterImpl<I> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            invoker: self.invoker.clone(),
            task_generator: self.task_generator,
            max_in_flight: self.max_in_flight,
        }
    }
}

impl<I: MapInvoker> MasterImpl<I> {
    pub fn new(
        registry: WorkerRegistry,
        invoker: Arc<I>,
        task_generator: TaskGenerator,
        max_in_flight: NonZeroUsize,
    ) -> Self {
        Self {
            registry,
            invoker,
            task_generator,
            max_in_flight,
        }
    }

    pub fn router(self) -> Router {
        Router::new()
            .route(REGISTER_ROUTE, post(register_worker::<I>))
            .route(RUN_ROUTE, post(run_job::<I>))
            .route(DEBUG_ROUTE, get(debug::<I>))
            .with_state(self)
    }
}

async fn register_worker<I: MapInvoker>(
    State(master): State<MasterImpl<I>>,
    payload: Result<Json<RegisterWorkerRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(request) = payload?;
    master.registry.register(request.address).await;
    Ok(StatusCode::OK)
}

async fn run_job<I: MapInvoker>(
    State(master): State<MasterImpl<I>>,
    payload: Result<Json<RunJobRequest>, JsonRejection>,
) -> Result<Json<RunJobResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!("Rejected job request: {}", rejection.body_text());
        ApiError::from(rejection)
    })?;

    if request.pattern.is_empty() {
        return Err(ApiError::EmptyPattern);
    }
    if request.files.is_empty() {
        return Err(ApiError::NoFiles);
    }
    let workers = master.registry.list().await;
    if workers.is_empty() {
        return Err(ApiError::NoWorkers);
    }

    let tasks = master.task_generator.expand(&request.files).await?;
    if tasks.is_empty() {
        return Err(ApiError::NoTasks);
    }

    let task_count = tasks.len();
    let worker_count = workers.len();
    let mut job = Job::new(request.pattern, Arc::new(FirstValueReducer), tasks, workers)?
        .with_max_in_flight(master.max_in_flight);
    info!(
        "Running job {}: {} tasks on {} workers",
        job.id(),
        task_count,
        worker_count
    );

    match job.execute(master.invoker.clone()).await {
        Ok(results) => {
            info!("Job {} {}: {} results", job.id(), job.phase(), results.len());
            Ok(Json(RunJobResponse { results }))
        }
        Err(err) => {
            error!("Job {} failed: {}", job.id(), err);
            Err(err.into())
        }
    }
}

async fn debug<I: MapInvoker>(State(master): State<MasterImpl<I>>) -> Json<DebugResponse> {
    Json(DebugResponse {
        workers: master.registry.list().await,
    })
}
