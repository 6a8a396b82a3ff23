use std::{
    collections::HashMap,
    num::NonZeroUsize,
    sync::{Arc, OnceLock},
};

use dist_grep_core::{
    reducer::{ReduceError, Reducer},
    Address,
};
use tokio::{
    sync::{Mutex, Semaphore},
    task::JoinSet,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::{
    invoker::{InvokeError, MapInvoker},
    journal,
    state::JobPhase,
    task::Task,
};

/// Final results: one reduced value per intermediate key.
pub type Results = HashMap<String, String>;

type Intermediates = HashMap<String, Vec<String>>;

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("search pattern is empty")]
    EmptyPattern,

    #[error("no files to search")]
    NoTasks,

    #[error("no workers available")]
    NoWorkers,

    #[error("job {0} has already been executed")]
    AlreadyExecuted(Uuid),

    #[error("error mapping {path} on {worker}: {source}")]
    Map {
        path: String,
        worker: Address,
        #[source]
        source: InvokeError,
    },

    #[error("map task did not finish: {0}")]
    Aborted(String),

    #[error("error reducing key {key}: {source}")]
    Reduce {
        key: String,
        #[source]
        source: ReduceError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub task: Task,
    pub worker: Address,
}

/// Task `i` goes to worker `i mod workers.len()`.
pub fn assign_round_robin(tasks: &[Task], workers: &[Address]) -> Vec<Assignment> {
    if workers.is_empty() {
        return vec![];
    }
    tasks
        .iter()
        .enumerate()
        .map(|(index, task)| Assignment {
            task: task.clone(),
            worker: workers[index % workers.len()].clone(),
        })
        .collect()
}

/// One search request across a fixed set of workers.
pub struct Job {
    id: Uuid,
    pattern: String,
    reducer: Arc<dyn Reducer>,
    tasks: Vec<Task>,
    workers: Vec<Address>,
    max_in_flight: NonZeroUsize,
    phase: JobPhase,
}

impl Job {
    pub fn new(
        pattern: impl Into<String>,
        reducer: Arc<dyn Reducer>,
        tasks: Vec<Task>,
        workers: Vec<Address>,
    ) -> Result<Self, JobError> {
        let pattern = pattern.into();
        if pattern.is_empty() {
            return Err(JobError::EmptyPattern);
        }
        if tasks.is_empty() {
            return Err(JobError::NoTasks);
        }
        if workers.is_empty() {
            return Err(JobError::NoWorkers);
        }

        Ok(Self {
            id: Uuid::new_v4(),
            pattern,
            reducer,
            tasks,
            workers,
            max_in_flight: NonZeroUsize::MAX,
            phase: JobPhase::Created,
        })
    }

    pub fn with_max_in_flight(mut self, max_in_flight: NonZeroUsize) -> Self {
        self.max_in_flight = max_in_flight;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn phase(&self) -> JobPhase {
        self.phase
    }

    pub fn assignments(&self) -> Vec<Assignment> {
        assign_round_robin(&self.tasks, &self.workers)
    }

    /// Runs the map phase on the workers, waits for every dispatched invocation,
    /// then reduces. The first map failure fails the whole job and whatever the
    /// other tasks produced is dropped. Tasks not yet dispatched when a failure
    /// lands are never sent.
    pub async fn execute<I: MapInvoker>(&mut self, invoker: Arc<I>) -> Result<Results, JobError> {
        if self.phase != JobPhase::Created {
            return Err(JobError::AlreadyExecuted(self.id));
        }
        info!(
            target: journal::TARGET,
            job = %self.id,
            "Starting MapReduce job: pattern={:?} tasks={} workers={}",
            self.pattern,
            self.tasks.len(),
            self.workers.len()
        );

        let intermediates = match self.map_phase(invoker).await {
            Ok(intermediates) => intermediates,
            Err(error) => {
                error!(target: journal::TARGET, job = %self.id, "Map phase failed: {}", error);
                self.transition(JobPhase::Failed);
                return Err(error);
            }
        };

        match self.reduce_phase(intermediates) {
            Ok(results) => {
                self.transition(JobPhase::Completed);
                info!(
                    target: journal::TARGET,
                    job = %self.id,
                    "MapReduce job completed successfully: {} results",
                    results.len()
                );
                Ok(results)
            }
            Err(error) => {
                error!(target: journal::TARGET, job = %self.id, "Reduce phase failed: {}", error);
                self.transition(JobPhase::Failed);
                Err(error)
            }
        }
    }

    async fn map_phase<I: MapInvoker>(&mut self, invoker: Arc<I>) -> Result<Intermediates, JobError> {
        self.transition(JobPhase::MapPhase);

        let intermediates = Arc::new(Mutex::new(Intermediates::new()));
        let first_error = Arc::new(OnceLock::<JobError>::new());
        let failed = CancellationToken::new();
        let permits = Arc::new(Semaphore::new(
            self.max_in_flight.get().min(Semaphore::MAX_PERMITS),
        ));
        let pattern: Arc<str> = Arc::from(self.pattern.as_str());

        let mut units = JoinSet::new();
        for Assignment { task, worker } in self.assignments() {
            let job_id = self.id;
            let invoker = invoker.clone();
            let intermediates = intermediates.clone();
            let first_error = first_error.clone();
            let failed = failed.clone();
            let permits = permits.clone();
            let pattern = pattern.clone();

            units.spawn(async move {
                let _permit = tokio::select! {
                    biased;
                    _ = failed.cancelled() => {
                        debug!(job = %job_id, "Not dispatching {}: job already failed", task.path);
                        return;
                    }
                    permit = permits.acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => return,
                    },
                };
                if failed.is_cancelled() {
                    return;
                }

                info!(
                    target: journal::TARGET,
                    job = %job_id,
                    task = task.id.0,
                    "Assigning {} to {}",
                    task.path,
                    worker
                );

                match invoker.invoke(&worker, &pattern, &task.path).await {
                    Ok(kvs) => {
                        info!(
                            target: journal::TARGET,
                            job = %job_id,
                            "Completed mapping {}. {} matches found",
                            task.path,
                            kvs.len()
                        );
                        let mut intermediates = intermediates.lock().await;
                        for kv in kvs {
                            debug!(job = %job_id, "Intermediate emit -> key: {}", kv.key);
                            intermediates.entry(kv.key).or_default().push(kv.value);
                        }
                    }
                    Err(source) => {
                        error!(
                            target: journal::TARGET,
                            job = %job_id,
                            "Error mapping {} on {}: {}",
                            task.path,
                            worker,
                            source
                        );
                        // Only the first failure is kept.
                        let _ = first_error.set(JobError::Map {
                            path: task.path,
                            worker,
                            source,
                        });
                        failed.cancel();
                    }
                }
            });
        }

        self.transition(JobPhase::Barrier);
        while let Some(joined) = units.join_next().await {
            if let Err(join_error) = joined {
                let _ = first_error.set(JobError::Aborted(join_error.to_string()));
                failed.cancel();
            }
        }

        // Every unit has been joined, so these are the last handles.
        if let Some(error) = Arc::into_inner(first_error).and_then(OnceLock::into_inner) {
            return Err(error);
        }
        let intermediates = std::mem::take(&mut *intermediates.lock().await);
        Ok(intermediates)
    }

    fn reduce_phase(&mut self, intermediates: Intermediates) -> Result<Results, JobError> {
        self.transition(JobPhase::ReducePhase);

        let mut results = Results::with_capacity(intermediates.len());
        for (key, values) in intermediates {
            info!(target: journal::TARGET, job = %self.id, "Reducing key: {}", key);
            let value = self
                .reducer
                .reduce(&key, &values)
                .map_err(|source| JobError::Reduce {
                    key: key.clone(),
                    source,
                })?;
            debug!(job = %self.id, "Reduced result: {} -> {}", key, value);
            results.insert(key, value);
        }
        Ok(results)
    }

    fn transition(&mut self, next: JobPhase) {
        debug_assert!(!self.phase.is_terminal(), "job {} already finished", self.id);
        info!(
            target: journal::TARGET,
            job = %self.id,
            "Job phase {} -> {}",
            self.phase,
            next
        );
        self.phase = next;
    }
}
