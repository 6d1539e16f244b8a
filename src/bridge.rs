//! Command façade and lifecycle policy
//!
//! High-level operations the editor glue calls into: each resolves a
//! file path to its owning project root, round-trips one command against
//! that root's worker, and unwraps the outcome into plain data. A path
//! that is `None` or that no registered root owns yields an empty answer
//! without touching the wire; the façade never creates a project for an
//! unrecognized path.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::warn;

use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::protocol::{Command, Position, ResponseEnvelope, Warning};
use crate::registry::ProcessRegistry;

pub struct Bridge {
    registry: ProcessRegistry,
}

impl Bridge {
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            registry: ProcessRegistry::new(config),
        }
    }

    pub fn registry(&self) -> &ProcessRegistry {
        &self.registry
    }

    /// Current warnings for a file.
    ///
    /// `Ok(None)` when there is no path or no registered root owns it;
    /// `Ok(Some(vec![]))` when the worker answers with a non-resolution
    /// kind. Only transport and decode faults surface as errors.
    pub fn get_warnings(&self, file: Option<&Path>) -> Result<Option<Vec<Warning>>, BridgeError> {
        let Some(envelope) = self.execute(file, |local_path| Command::GetWarningsFor {
            local_path,
        })?
        else {
            return Ok(None);
        };
        if !envelope.is_resolution() {
            return Ok(Some(Vec::new()));
        }
        let warnings = match envelope.value.resolution {
            Some(value) => serde_json::from_value(value)
                .map_err(|err| BridgeError::Decode(err.to_string()))?,
            None => Vec::new(),
        };
        Ok(Some(warnings))
    }

    /// Tell the owning worker a file changed. `contents: None` signals a
    /// clean editor buffer, letting the worker read from disk. Returns
    /// whether the worker acknowledged the change.
    pub fn notify_file_changed(
        &self,
        file: Option<&Path>,
        contents: Option<&str>,
    ) -> Result<bool, BridgeError> {
        let contents = contents.map(str::to_owned);
        let Some(envelope) = self.execute(file, |local_path| Command::FileChanged {
            local_path,
            contents,
        })?
        else {
            return Ok(false);
        };
        Ok(envelope.is_resolution())
    }

    /// Typeahead completions / definition info at a zero-based position.
    ///
    /// `Ok(None)` when no root owns the file (silent skip); an empty JSON
    /// object when the worker rejects the request. Consumers rely on
    /// that asymmetry to tell "not our file" from "worker had nothing".
    pub fn get_definition(
        &self,
        file: Option<&Path>,
        line: u32,
        column: u32,
    ) -> Result<Option<Value>, BridgeError> {
        let Some(envelope) = self.execute(file, |local_path| Command::GetTypeaheadCompletionsFor {
            local_path,
            position: Position::new(line, column),
        })?
        else {
            return Ok(None);
        };
        if envelope.is_resolution() {
            if let Some(value) = envelope.value.resolution {
                return Ok(Some(value));
            }
        }
        Ok(Some(Value::Object(Map::new())))
    }

    /// Spawn workers for open folders that have none yet. Stale entries
    /// are left alone; `sweep_orphans` handles those on its own trigger.
    /// Spawn and init faults are logged and skipped so one broken project
    /// never takes down the host's event handler.
    pub fn reconcile(&self, open_folders: &HashSet<PathBuf>) {
        for folder in open_folders {
            if self.registry.get(folder).is_some() {
                continue;
            }
            if let Err(err) = self.registry.get_or_create(folder) {
                warn!("failed to start analyzer for {}: {}", folder.display(), err);
            }
        }
    }

    /// Kill workers whose root is no longer among the open folders.
    pub fn sweep_orphans(&self, open_folders: &HashSet<PathBuf>) {
        for root in self.registry.active_roots() {
            if !open_folders.contains(&root) {
                self.registry.remove(&root);
            }
        }
    }

    /// Roots that currently have a live worker.
    pub fn active_projects(&self) -> Vec<PathBuf> {
        self.registry.active_roots()
    }

    /// Host shutdown: kill every worker.
    pub fn kill_all(&self) {
        self.registry.kill_all();
    }

    /// Resolve `file` to its owning root and round-trip one command built
    /// from the root-relative path. `Ok(None)` without any message sent
    /// when the path is absent or unowned.
    fn execute(
        &self,
        file: Option<&Path>,
        make: impl FnOnce(String) -> Command,
    ) -> Result<Option<ResponseEnvelope>, BridgeError> {
        let Some(file) = file else {
            return Ok(None);
        };
        let Some(root) = self.registry.lookup_root_for_path(file) else {
            return Ok(None);
        };
        let Some(worker) = self.registry.get(&root) else {
            return Ok(None);
        };
        let local_path = file
            .strip_prefix(&root)
            .unwrap_or(file)
            .to_string_lossy()
            .into_owned();
        let command = make(local_path);
        let id = self.registry.ids().next();
        let envelope = worker.lock().unwrap().request(id, &command)?;
        Ok(Some(envelope))
    }
}
