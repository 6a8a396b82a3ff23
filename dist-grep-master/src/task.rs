use std::path::PathBuf;

use tokio::fs;
use tracing::{debug, warn};

use crate::journal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(pub usize);

/// One file to scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    pub path: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ExpandError {
    #[error("cannot read {path:?}: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0:?} is neither a regular file nor a directory")]
    NotAFile(String),

    #[error("{0:?} is not valid UTF-8")]
    NotUtf8(String),
}

/// What to do with a path that cannot be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpandPolicy {
    /// Reject the whole request.
    #[default]
    Abort,
    /// Log a warning and carry on with the remaining paths.
    Skip,
}

impl ExpandPolicy {
    pub fn from_skip_flag(skip_unreadable: bool) -> Self {
        if skip_unreadable {
            ExpandPolicy::Skip
        } else {
            ExpandPolicy::Abort
        }
    }
}

/// Turns a mix of file and directory paths into one task per regular file.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskGenerator {
    policy: ExpandPolicy,
}

impl TaskGenerator {
    pub fn new(policy: ExpandPolicy) -> Self {
        Self { policy }
    }

    /// Directories are walked depth-first, in directory-listing order, and every
    /// regular file below them becomes a task named by its path from the given root.
    /// Symlinks to files are followed; symlinks to directories are not descended.
    pub async fn expand(&self, paths: &[String]) -> Result<Vec<Task>, ExpandError> {
        let mut files = vec![];
        for path in paths {
            self.expand_path(path, &mut files).await?;
        }

        Ok(files
            .into_iter()
            .enumerate()
            .map(|(index, path)| Task {
                id: TaskId(index),
                path,
            })
            .collect())
    }

    async fn expand_path(&self, root: &str, files: &mut Vec<String>) -> Result<(), ExpandError> {
        let metadata = match fs::metadata(root).await {
            Ok(metadata) => metadata,
            Err(source) => {
                return self.tolerate(ExpandError::Unreadable {
                    path: root.to_string(),
                    source,
                })
            }
        };

        if metadata.is_file() {
            files.push(root.to_string());
            return Ok(());
        }
        if !metadata.is_dir() {
            return self.tolerate(ExpandError::NotAFile(root.to_string()));
        }

        let mut pending = vec![PathBuf::from(root)];
        while let Some(dir) = pending.pop() {
            let mut read_dir = match fs::read_dir(&dir).await {
                Ok(read_dir) => read_dir,
                Err(source) => {
                    self.tolerate(ExpandError::Unreadable {
                        path: dir.display().to_string(),
                        source,
                    })?;
                    continue;
                }
            };

            let mut subdirs = vec![];
            loop {
                let entry = match read_dir.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => break,
                    Err(source) => {
                        self.tolerate(ExpandError::Unreadable {
                            path: dir.display().to_string(),
                            source,
                        })?;
                        break;
                    }
                };

                let path = entry.path();
                let file_type = match entry.file_type().await {
                    Ok(file_type) => file_type,
                    Err(source) => {
                        self.tolerate(ExpandError::Unreadable {
                            path: path.display().to_string(),
                            source,
                        })?;
                        continue;
                    }
                };

                if file_type.is_dir() {
                    subdirs.push(path);
                } else if file_type.is_file() {
                    self.push_file(path, files)?;
                } else if file_type.is_symlink() {
                    match fs::metadata(&path).await {
                        Ok(target) if target.is_file() => self.push_file(path, files)?,
                        _ => debug!("Skipping symlink {}", path.display()),
                    }
                } else {
                    debug!("Skipping special file {}", path.display());
                }
            }

            // Reversed so the stack pops them back in listing order.
            pending.extend(subdirs.into_iter().rev());
        }

        Ok(())
    }

    fn push_file(&self, path: PathBuf, files: &mut Vec<String>) -> Result<(), ExpandError> {
        match path.into_os_string().into_string() {
            Ok(path) => {
                files.push(path);
                Ok(())
            }
            Err(path) => self.tolerate(ExpandError::NotUtf8(path.to_string_lossy().into_owned())),
        }
    }

    fn tolerate(&self, error: ExpandError) -> Result<(), ExpandError> {
        match self.policy {
            ExpandPolicy::Abort => Err(error),
            ExpandPolicy::Skip => {
                warn!(target: journal::TARGET, "Skipping path: {}", error);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::TempDir;

    fn touch(root: &TempDir, relative: &str) -> String {
        let path = root.path().join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "line\n").unwrap();
        path.to_str().unwrap().to_string()
    }

    fn root_of(dir: &TempDir) -> String {
        dir.path().to_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_single_file_is_a_single_task() {
        let dir = TempDir::new().unwrap();
        let file = touch(&dir, "a.log");

        let tasks = TaskGenerator::default().expand(&[file.clone()]).await.unwrap();

        assert_eq!(
            tasks,
            vec![Task {
                id: TaskId(0),
                path: file
            }]
        );
    }

    #[tokio::test]
    async fn test_directory_expands_to_every_file_at_every_depth() {
        let dir = TempDir::new().unwrap();
        let expected: HashSet<String> = ["top.log", "a/one.log", "a/b/two.log", "a/b/c/three.log", "d/four.log"]
            .iter()
            .map(|relative| touch(&dir, relative))
            .collect();
        std::fs::create_dir_all(dir.path().join("empty/nested")).unwrap();

        let tasks = TaskGenerator::default().expand(&[root_of(&dir)]).await.unwrap();

        let found: HashSet<String> = tasks.iter().map(|task| task.path.clone()).collect();
        assert_eq!(found, expected);
        assert_eq!(tasks.len(), expected.len(), "no duplicates");
        let ids: Vec<usize> = tasks.iter().map(|task| task.id.0).collect();
        assert_eq!(ids, (0..tasks.len()).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_paths_keep_the_given_root_prefix() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "logs/app.log");
        let root = format!("{}/logs", root_of(&dir));

        let tasks = TaskGenerator::default().expand(&[root.clone()]).await.unwrap();

        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].path, format!("{}/app.log", root));
    }

    #[tokio::test]
    async fn test_files_and_directories_mix_in_request_order() {
        let dir = TempDir::new().unwrap();
        let first = touch(&dir, "first.log");
        touch(&dir, "sub/inner.log");
        let last = touch(&dir, "last.log");

        let tasks = TaskGenerator::default()
            .expand(&[first.clone(), format!("{}/sub", root_of(&dir)), last.clone()])
            .await
            .unwrap();

        let paths: Vec<_> = tasks.into_iter().map(|task| task.path).collect();
        assert_eq!(paths, vec![first, format!("{}/sub/inner.log", root_of(&dir)), last]);
    }

    #[tokio::test]
    async fn test_missing_path_aborts_by_default() {
        let dir = TempDir::new().unwrap();
        let present = touch(&dir, "present.log");
        let missing = format!("{}/missing.log", root_of(&dir));

        let err = TaskGenerator::default()
            .expand(&[present, missing.clone()])
            .await
            .unwrap_err();

        assert!(matches!(err, ExpandError::Unreadable { path, .. } if path == missing));
    }

    #[tokio::test]
    async fn test_missing_path_is_skipped_when_asked() {
        let dir = TempDir::new().unwrap();
        let present = touch(&dir, "present.log");
        let missing = format!("{}/missing.log", root_of(&dir));

        let tasks = TaskGenerator::new(ExpandPolicy::Skip)
            .expand(&[missing, present.clone()])
            .await
            .unwrap();

        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].path, present);
        assert_eq!(tasks[0].id, TaskId(0));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlinked_files_are_followed_but_directory_links_are_not() {
        let dir = TempDir::new().unwrap();
        let target = touch(&dir, "real/target.log");
        std::os::unix::fs::symlink(&target, dir.path().join("real/link.log")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("real"), dir.path().join("real/loop")).unwrap();

        let tasks = TaskGenerator::default()
            .expand(&[format!("{}/real", root_of(&dir))])
            .await
            .unwrap();

        let mut names: Vec<_> = tasks
            .iter()
            .map(|task| task.path.rsplit('/').next().unwrap().to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["link.log", "target.log"]);
    }
}
