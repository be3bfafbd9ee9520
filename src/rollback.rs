//! File snapshots and restore
//!
//! A snapshot holds the exact bytes and permissions of a unit's manifest and
//! lock files. Files missing at capture time are recorded as absent and are
//! removed again on restore. Restores write through a temporary file and a
//! rename so a file is never left half written.

use crate::config::ProjectConfig;
use crate::domain::ExecutionUnit;
use crate::error::RollbackError;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// Saved state of one file
#[derive(Debug, Clone)]
struct FileState {
    path: PathBuf,
    /// `None` when the file did not exist
    contents: Option<(Vec<u8>, fs::Permissions)>,
}

/// Saved state of a unit's files
#[derive(Debug, Clone)]
pub struct Snapshot {
    label: String,
    files: Vec<FileState>,
}

impl Snapshot {
    /// Captures the given files
    pub fn capture(
        label: impl Into<String>,
        paths: impl IntoIterator<Item = PathBuf>,
    ) -> Result<Self, RollbackError> {
        let mut files: Vec<FileState> = Vec::new();
        for path in paths {
            if files.iter().any(|f| f.path == path) {
                continue;
            }
            let contents = match fs::read(&path) {
                Ok(bytes) => {
                    let permissions = fs::metadata(&path)
                        .map_err(|source| RollbackError::Capture {
                            path: path.clone(),
                            source,
                        })?
                        .permissions();
                    Some((bytes, permissions))
                }
                Err(e) if e.kind() == ErrorKind::NotFound => None,
                Err(source) => return Err(RollbackError::Capture { path, source }),
            };
            files.push(FileState { path, contents });
        }
        let snapshot = Self {
            label: label.into(),
            files,
        };
        debug!(unit = %snapshot.label, files = snapshot.files.len(), "snapshot captured");
        Ok(snapshot)
    }

    /// Unit label the snapshot was taken for
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Paths covered by the snapshot
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().map(|f| f.path.as_path())
    }

    /// Writes every file back to its captured state
    ///
    /// All files are attempted; the first error is returned.
    pub fn restore(&self) -> Result<(), RollbackError> {
        let mut first_error = None;
        for file in &self.files {
            if let Err(e) = restore_file(file) {
                error!(path = %file.path.display(), error = %e, "restore failed");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => {
                info!(unit = %self.label, "files restored");
                Ok(())
            }
        }
    }
}

fn restore_file(file: &FileState) -> Result<(), RollbackError> {
    let restore_err = |source| RollbackError::Restore {
        path: file.path.clone(),
        source,
    };
    match &file.contents {
        None => match fs::remove_file(&file.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(restore_err(e)),
        },
        Some((bytes, permissions)) => {
            let temp = temp_path(&file.path);
            let written = fs::write(&temp, bytes)
                .and_then(|_| fs::set_permissions(&temp, permissions.clone()))
                .and_then(|_| fs::rename(&temp, &file.path));
            if let Err(e) = written {
                let _ = fs::remove_file(&temp);
                return Err(restore_err(e));
            }
            Ok(())
        }
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.depshift-restore", name))
}

/// Scoped snapshot that restores unless resolved
///
/// Call [`SnapshotGuard::commit`] to keep the changes or
/// [`SnapshotGuard::restore`] to revert them. A guard dropped without either
/// restores the files and logs the outcome.
#[derive(Debug)]
pub struct SnapshotGuard {
    snapshot: Option<Snapshot>,
}

impl SnapshotGuard {
    /// Wraps a captured snapshot
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            snapshot: Some(snapshot),
        }
    }

    /// Keeps the changes and hands the snapshot back for a later full rollback
    pub fn commit(mut self) -> Option<Snapshot> {
        self.snapshot.take()
    }

    /// Reverts the files now
    pub fn restore(mut self) -> Result<(), RollbackError> {
        match self.snapshot.take() {
            Some(snapshot) => snapshot.restore(),
            None => Ok(()),
        }
    }
}

impl Drop for SnapshotGuard {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            match snapshot.restore() {
                Ok(()) => error!(unit = %snapshot.label(), "unresolved snapshot restored on drop"),
                Err(e) => error!(
                    unit = %snapshot.label(),
                    error = %e,
                    "unresolved snapshot could not be restored"
                ),
            }
        }
    }
}

/// Decides which files a unit touches and snapshots them
#[derive(Debug, Clone)]
pub struct RollbackManager {
    working_dir: PathBuf,
    skip_lock: bool,
}

impl RollbackManager {
    /// Creates a manager for a project directory
    pub fn new(working_dir: impl Into<PathBuf>, skip_lock: bool) -> Self {
        Self {
            working_dir: working_dir.into(),
            skip_lock,
        }
    }

    /// Manifest files of the unit's packages plus lock files unless skip-lock
    pub fn snapshot_paths(&self, unit: &ExecutionUnit, config: &ProjectConfig) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = Vec::new();
        let mut add = |path: PathBuf| {
            if !paths.contains(&path) {
                paths.push(path);
            }
        };
        for action in &unit.actions {
            let package = &action.package;
            let rule = config.rule(&package.rule);
            if !package.manifest_path.as_os_str().is_empty() {
                add(package.manifest_path.clone());
            } else if let Some(rule) = rule {
                add(rule.manifest_path(&self.working_dir));
            }
            if !self.skip_lock {
                if let Some(rule) = rule {
                    rule.lock_file_paths(&self.working_dir)
                        .into_iter()
                        .for_each(&mut add);
                }
            }
        }
        paths
    }

    /// Snapshots a unit's files before any of its commands run
    pub fn capture(
        &self,
        unit: &ExecutionUnit,
        config: &ProjectConfig,
    ) -> Result<SnapshotGuard, RollbackError> {
        let snapshot = Snapshot::capture(unit.label(), self.snapshot_paths(unit, config))?;
        Ok(SnapshotGuard::new(snapshot))
    }
}

/// Restores committed snapshots newest first
///
/// Every snapshot is attempted; errors are returned together.
pub fn restore_all(snapshots: &[Snapshot]) -> Vec<(String, RollbackError)> {
    snapshots
        .iter()
        .rev()
        .filter_map(|snapshot| {
            snapshot
                .restore()
                .err()
                .map(|e| (snapshot.label().to_string(), e))
        })
        .collect()
}
