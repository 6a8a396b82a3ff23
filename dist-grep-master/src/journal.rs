//! Logging setup. Console output follows `RUST_LOG` (default `info`); events
//! logged with `target: journal::TARGET` are also appended to the job journal.

use std::{
    fs::{File, OpenOptions},
    path::Path,
    sync::Mutex,
};

use tracing_subscriber::{
    filter::filter_fn, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
    Registry,
};

pub const TARGET: &str = "journal";

pub fn open_journal(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Plain-text layer that writes only journal events to `file`.
pub fn journal_layer(file: File) -> impl Layer<Registry> {
    fmt::layer()
        .with_ansi(false)
        .with_target(false)
        .with_writer(Mutex::new(file))
        .with_filter(filter_fn(|metadata| metadata.target() == TARGET))
}

pub fn init_tracing(journal: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let journal = match journal {
        Some(path) => Some(journal_layer(open_journal(path)?)),
        None => None,
    };

    let console = fmt::layer().with_filter(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    );

    tracing_subscriber::registry()
        .with(journal)
        .with(console)
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        invoker::LocalInvoker,
        job::Job,
        task::{ExpandPolicy, TaskGenerator},
    };
    use dist_grep_core::{reducer::FirstValueReducer, Address};
    use std::sync::Arc;
    use tempfile::TempDir;
    use tracing::info;

    #[tokio::test]
    async fn test_journal_records_job_events_only() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("a.log");
        std::fs::write(&log, "INFO start\nERROR disk full\nINFO end\n").unwrap();
        let missing = dir.path().join("gone.log");
        let journal_path = dir.path().join("distgrep.log");

        let subscriber = tracing_subscriber::registry()
            .with(journal_layer(open_journal(&journal_path).unwrap()));
        let guard = tracing::subscriber::set_default(subscriber);

        info!("console only");
        let tasks = TaskGenerator::new(ExpandPolicy::Skip)
            .expand(&[
                log.to_str().unwrap().to_string(),
                missing.to_str().unwrap().to_string(),
            ])
            .await
            .unwrap();
        let mut job = Job::new(
            "ERROR",
            Arc::new(FirstValueReducer),
            tasks,
            vec![Address::new("local")],
        )
        .unwrap();
        job.execute(Arc::new(LocalInvoker)).await.unwrap();

        drop(guard);
        let journal = std::fs::read_to_string(&journal_path).unwrap();
        let log = log.to_str().unwrap();

        for expected in [
            format!("Skipping path: cannot read {:?}", missing.to_str().unwrap()),
            "Starting MapReduce job".to_string(),
            "Job phase created -> map".to_string(),
            format!("Assigning {} to local", log),
            format!("Completed mapping {}. 1 matches found", log),
            format!("Reducing key: {}:2", log),
            "MapReduce job completed successfully: 1 results".to_string(),
        ] {
            assert!(journal.contains(&expected), "missing {:?} in:\n{}", expected, journal);
        }
        assert!(!journal.contains("console only"));
        assert!(!journal.contains("Intermediate emit"));
        assert!(journal.lines().all(|line| !line.contains('\u{1b}')));
    }
}
