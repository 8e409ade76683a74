//! Persisted record of what was last successfully applied, per machine.
//!
//! All machines share one JSON file.  Reads are forgiving (anything
//! unreadable degrades to an empty snapshot, forcing a full apply); writes
//! go through a sibling temporary file and a rename so the file on disk is
//! always either the old or the new content.
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::SnapshotError;
use crate::hasher::{self, MachineDigest};
use crate::logging::Log;

/// Applied state of one task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    /// Task hash at the time it was applied; empty if only partially applied.
    pub task_hash: String,
    /// Hashes of the links that are in place.
    #[serde(default)]
    pub link_hashes: Vec<String>,
    /// Hashes of the commands that have run.
    #[serde(default)]
    pub command_hashes: Vec<String>,
}

impl TaskSnapshot {
    /// Whether `hash` is among the recorded link hashes.
    #[must_use]
    pub fn has_link(&self, hash: &str) -> bool {
        self.link_hashes.iter().any(|h| h == hash)
    }

    /// Whether `hash` is among the recorded command hashes.
    #[must_use]
    pub fn has_command(&self, hash: &str) -> bool {
        self.command_hashes.iter().any(|h| h == hash)
    }
}

/// Applied state of one machine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineSnapshot {
    /// Aggregate hash over every task entry.
    #[serde(default)]
    pub machine_hash: String,
    /// Task entries by name.
    #[serde(default)]
    pub tasks: BTreeMap<String, TaskSnapshot>,
}

impl MachineSnapshot {
    /// Build a snapshot from task entries, computing the aggregate hash.
    #[must_use]
    pub fn from_tasks(tasks: BTreeMap<String, TaskSnapshot>) -> Self {
        let machine_hash = hasher::digest(&MachineDigest::new(
            tasks
                .iter()
                .map(|(name, task)| (name.as_str(), task.task_hash.as_str())),
        ));
        Self {
            machine_hash,
            tasks,
        }
    }

    /// Whether nothing has been recorded for this machine.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty() && self.machine_hash.is_empty()
    }
}

type SnapshotFile = BTreeMap<String, MachineSnapshot>;

/// Reads and writes the snapshot file.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    /// Store backed by the file at `path`.
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Default location: `$XDG_CACHE_HOME/alter/snapshot.json`.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        Some(crate::logging::alter_cache_dir()?.join("snapshot.json"))
    }

    /// Path of the snapshot file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the snapshot for `machine`.
    ///
    /// Never fails: a missing, unreadable or malformed file, or one without
    /// an entry for `machine`, yields the empty snapshot.  Problems other than
    /// a missing file are logged as warnings.
    pub fn load(&self, machine: &str, log: &dyn Log) -> MachineSnapshot {
        match self.read_all() {
            Ok(mut all) => all.remove(machine).unwrap_or_default(),
            Err(reason) => {
                log.warn(&format!(
                    "ignoring snapshot {}: {reason}",
                    self.path.display()
                ));
                MachineSnapshot::default()
            }
        }
    }

    /// Replace the entry for `machine`, preserving every other machine.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError`] if the new file cannot be written.
    pub fn save(
        &self,
        machine: &str,
        snapshot: MachineSnapshot,
        log: &dyn Log,
    ) -> Result<(), SnapshotError> {
        let mut all = self.read_all_or_warn(log);
        all.insert(machine.to_string(), snapshot);
        self.write_atomic(&all)
    }

    /// Drop the entry for `machine`.  Returns whether an entry existed.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError`] if the new file cannot be written.
    pub fn remove(&self, machine: &str, log: &dyn Log) -> Result<bool, SnapshotError> {
        let mut all = self.read_all_or_warn(log);
        if all.remove(machine).is_none() {
            return Ok(false);
        }
        self.write_atomic(&all)?;
        Ok(true)
    }

    fn read_all_or_warn(&self, log: &dyn Log) -> SnapshotFile {
        self.read_all().unwrap_or_else(|reason| {
            log.warn(&format!(
                "discarding unreadable snapshot {}: {reason}",
                self.path.display()
            ));
            SnapshotFile::new()
        })
    }

    fn read_all(&self) -> Result<SnapshotFile, String> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(SnapshotFile::new()),
            Err(e) => return Err(e.to_string()),
        };
        if content.trim().is_empty() {
            return Ok(SnapshotFile::new());
        }
        serde_json::from_str(&content).map_err(|e| e.to_string())
    }

    /// Serialize `all` to a sibling temporary file, flush it, and rename it
    /// over the snapshot file.
    fn write_atomic(&self, all: &SnapshotFile) -> Result<(), SnapshotError> {
        let mut content = serde_json::to_string_pretty(all)?;
        content.push('\n');

        let write_err = |source| SnapshotError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        let tmp = temp_sibling(&self.path);
        let result = fs::File::create(&tmp)
            .and_then(|mut file| {
                file.write_all(content.as_bytes())?;
                file.sync_all()
            })
            .and_then(|()| fs::rename(&tmp, &self.path));

        if let Err(e) = result {
            let _ = fs::remove_file(&tmp);
            return Err(write_err(e));
        }
        Ok(())
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map_or_else(|| "snapshot".into(), |n| n.to_string_lossy().into_owned());
    path.with_file_name(format!(".{name}.tmp"))
}
