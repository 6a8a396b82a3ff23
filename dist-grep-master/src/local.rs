use std::sync::Arc;

use dist_grep_core::{reducer::FirstValueReducer, Address};

use crate::{
    config::LocalConfig,
    invoker::LocalInvoker,
    job::{Job, Results},
    task::{ExpandPolicy, TaskGenerator},
};

/// Runs a whole job in this process and returns `path:line: text` lines.
pub async fn run_local(config: &LocalConfig) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let tasks = TaskGenerator::new(ExpandPolicy::from_skip_flag(config.skip_unreadable))
        .expand(&config.paths)
        .await?;
    if tasks.is_empty() {
        return Ok(vec![]);
    }

    let mut job = Job::new(
        config.pattern.clone(),
        Arc::new(FirstValueReducer),
        tasks,
        vec![Address::new("local")],
    )?
    .with_max_in_flight(config.max_in_flight);

    let results = job.execute(Arc::new(LocalInvoker)).await?;
    Ok(format_matches(results))
}

/// Sorted by path, then numerically by line.
pub fn format_matches(results: Results) -> Vec<String> {
    let mut matches: Vec<(String, usize, String)> = results
        .into_iter()
        .map(|(key, text)| match key.rsplit_once(':') {
            Some((path, line)) => match line.parse::<usize>() {
                Ok(line) => (path.to_string(), line, text),
                Err(_) => (key, 0, text),
            },
            None => (key, 0, text),
        })
        .collect();
    matches.sort();

    matches
        .into_iter()
        .map(|(path, line, text)| format!("{}:{}: {}", path, line, text))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroUsize;
    use tempfile::TempDir;

    #[test]
    fn test_format_sorts_lines_numerically() {
        let results = Results::from([
            ("b.log:1".to_string(), "b one".to_string()),
            ("a.log:10".to_string(), "a ten".to_string()),
            ("a.log:9".to_string(), "a nine".to_string()),
        ]);

        assert_eq!(
            format_matches(results),
            vec!["a.log:9: a nine", "a.log:10: a ten", "b.log:1: b one"]
        );
    }

    #[tokio::test]
    async fn test_run_local_over_directory() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.log"), "INFO start\nERROR disk full\nINFO end\n").unwrap();
        std::fs::create_dir_all(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub/b.log"), "ERROR again\n").unwrap();
        let root = dir.path().to_str().unwrap().to_string();

        let config = LocalConfig {
            pattern: "ERROR".to_string(),
            paths: vec![root.clone()],
            journal: None,
            max_in_flight: NonZeroUsize::new(2).unwrap(),
            skip_unreadable: false,
        };

        let lines = run_local(&config).await.unwrap();

        assert_eq!(
            lines,
            vec![
                format!("{}/a.log:2: ERROR disk full", root),
                format!("{}/sub/b.log:1: ERROR again", root),
            ]
        );
    }
}
