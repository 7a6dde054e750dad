//! Atomic, backup-protected persistence of [`WorkflowState`] to a per-user
//! directory (C6).
//!
//! The store does not provide cross-process locking: concurrent writers to
//! the same workflow name are an unsupported configuration. Serializing
//! access to a given workflow is the Workflow Engine's responsibility.

use std::path::{Path, PathBuf};

use crate::error::{CoreError, CoreResult};
use crate::paths::{default_workflow_store_dir, ensure_dir_exists};
use crate::workflow::state::WorkflowState;

/// Home of on-disk workflow snapshots.
#[derive(Debug, Clone)]
pub struct WorkflowStore {
    dir: PathBuf,
}

impl Default for WorkflowStore {
    fn default() -> Self {
        Self::new(default_workflow_store_dir())
    }
}

impl WorkflowStore {
    #[must_use]
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn target_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    fn backup_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.backup"))
    }

    fn tmp_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.tmp"))
    }

    #[must_use]
    pub fn exists(&self, name: &str) -> bool {
        self.target_path(name).exists()
    }

    #[must_use]
    pub fn list_names(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(Result::ok)
            .filter_map(|entry| {
                let path = entry.path();
                if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
                    path.file_stem()
                        .and_then(|stem| stem.to_str())
                        .map(str::to_string)
                } else {
                    None
                }
            })
            .collect();
        names.sort();
        names
    }

    /// Persist `state` atomically: backup the existing file, write a temp
    /// file, rename it into place, then drop the backup.
    ///
    /// On any failure while writing or renaming, the previous file (if any)
    /// is left intact via its backup and the temp file is removed.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::StateWrite`] if the backup, write, or rename step fails.
    pub fn save(&self, state: &WorkflowState) -> CoreResult<()> {
        ensure_dir_exists(&self.dir).map_err(|source| CoreError::StateWrite {
            path: self.dir.display().to_string(),
            source,
        })?;

        let target = self.target_path(&state.name);
        let backup = self.backup_path(&state.name);
        let tmp = self.tmp_path(&state.name);

        let had_previous = target.exists();
        if had_previous {
            std::fs::copy(&target, &backup).map_err(|source| CoreError::StateWrite {
                path: target.display().to_string(),
                source,
            })?;
        }

        let result = self.write_and_rename(state, &tmp, &target);

        match result {
            Ok(()) => {
                if had_previous && backup.exists() {
                    let _ = std::fs::remove_file(&backup);
                }
                Ok(())
            }
            Err(err) => {
                let _ = std::fs::remove_file(&tmp);
                Err(err)
            }
        }
    }

    fn write_and_rename(
        &self,
        state: &WorkflowState,
        tmp: &Path,
        target: &Path,
    ) -> CoreResult<()> {
        let json = serde_json::to_string_pretty(state).map_err(|source| CoreError::StateWrite {
            path: target.display().to_string(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, source),
        })?;
        std::fs::write(tmp, json).map_err(|source| CoreError::StateWrite {
            path: tmp.display().to_string(),
            source,
        })?;
        std::fs::rename(tmp, target).map_err(|source| CoreError::StateWrite {
            path: target.display().to_string(),
            source,
        })
    }

    /// Load a workflow, recovering from `<name>.backup` if the primary file
    /// is malformed or missing required fields. Never returns a default
    /// workflow when both copies are unusable.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownWorkflow`] if neither file exists, or
    /// [`CoreError::StateCorruption`] if neither parses.
    pub fn load(&self, name: &str) -> CoreResult<WorkflowState> {
        let target = self.target_path(name);
        let backup = self.backup_path(name);

        if !target.exists() && !backup.exists() {
            return Err(CoreError::UnknownWorkflow {
                name: name.to_string(),
            });
        }

        if target.exists() {
            if let Ok(state) = self.try_load(&target) {
                return Ok(state);
            }
        }

        if backup.exists() {
            if let Ok(state) = self.try_load(&backup) {
                tracing::warn!(workflow = name, "recovered workflow state from backup");
                return Ok(state);
            }
        }

        Err(CoreError::StateCorruption {
            path: target.display().to_string(),
        })
    }

    fn try_load(&self, path: &Path) -> CoreResult<WorkflowState> {
        let raw = std::fs::read_to_string(path).map_err(|_| CoreError::StateCorruption {
            path: path.display().to_string(),
        })?;
        serde_json::from_str(&raw).map_err(|_| CoreError::StateCorruption {
            path: path.display().to_string(),
        })
    }

    /// Remove a workflow's file and any stray backup. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::StateWrite`] if the file exists but cannot be removed.
    pub fn cleanup(&self, name: &str) -> CoreResult<()> {
        let target = self.target_path(name);
        let backup = self.backup_path(name);
        if target.exists() {
            std::fs::remove_file(&target).map_err(|source| CoreError::StateWrite {
                path: target.display().to_string(),
                source,
            })?;
        }
        if backup.exists() {
            let _ = std::fs::remove_file(&backup);
        }
        Ok(())
    }
}
