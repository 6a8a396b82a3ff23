use std::{future::Future, time::Duration};

use dist_grep_core::{
    grep::run_map,
    mapper::MapError,
    wire::{ErrorBody, MapRequest, MapResponse, MAP_ROUTE},
    Address, KeyValue,
};

#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    #[error("worker {worker} unreachable: {source}")]
    Unreachable {
        worker: Address,
        #[source]
        source: reqwest::Error,
    },

    #[error("worker {worker} returned status {status}: {message}")]
    Status {
        worker: Address,
        status: u16,
        message: String,
    },

    #[error("decode error from worker {worker}: {source}")]
    Decode {
        worker: Address,
        #[source]
        source: reqwest::Error,
    },

    #[error(transparent)]
    Map(#[from] MapError),
}

/// Runs one map task for `pattern` over `path` on `worker`.
pub trait MapInvoker: Send + Sync + 'static {
    fn invoke(
        &self,
        worker: &Address,
        pattern: &str,
        path: &str,
    ) -> impl Future<Output = Result<Vec<KeyValue>, InvokeError>> + Send;
}

/// Calls a worker's `/map` endpoint over HTTP. No retries.
#[derive(Debug, Clone)]
pub struct HttpInvoker {
    client: reqwest::Client,
}

impl HttpInvoker {
    pub fn new(timeout: Option<Duration>) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

impl MapInvoker for HttpInvoker {
    async fn invoke(
        &self,
        worker: &Address,
        pattern: &str,
        path: &str,
    ) -> Result<Vec<KeyValue>, InvokeError> {
        let url = format!("{}{}", worker.as_str().trim_end_matches('/'), MAP_ROUTE);
        let request = MapRequest {
            pattern: pattern.to_string(),
            path: path.to_string(),
        };

        let response = self
            .client
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|source| InvokeError::Unreachable {
                worker: worker.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|body| body.error)
                .unwrap_or_else(|_| body.trim().to_string());
            return Err(InvokeError::Status {
                worker: worker.clone(),
                status: status.as_u16(),
                message,
            });
        }

        // The client timeout also covers reading the body.
        let response: MapResponse = response.json().await.map_err(|source| {
            if source.is_timeout() {
                InvokeError::Unreachable {
                    worker: worker.clone(),
                    source,
                }
            } else {
                InvokeError::Decode {
                    worker: worker.clone(),
                    source,
                }
            }
        })?;

        Ok(response.kvs)
    }
}

/// Runs the grep map in this process, ignoring the worker address.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalInvoker;

impl MapInvoker for LocalInvoker {
    async fn invoke(
        &self,
        _worker: &Address,
        pattern: &str,
        path: &str,
    ) -> Result<Vec<KeyValue>, InvokeError> {
        let request = MapRequest {
            pattern: pattern.to_string(),
            path: path.to_string(),
        };
        Ok(run_map(&request).await?.kvs)
    }
}
