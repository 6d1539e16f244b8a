//! Process registry
//!
//! Maps each project root to exactly one live analyzer worker. The map
//! itself is guarded by a single mutex; each worker sits behind its own
//! mutex so the paired write/read of one request is atomic per root
//! while different roots proceed in parallel.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::info;

use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::protocol::{Command, CommandIds};
use crate::transport::Worker;

pub struct ProcessRegistry {
    config: BridgeConfig,
    /// Correlation ids, shared across every project's worker.
    ids: CommandIds,
    workers: Mutex<HashMap<PathBuf, Arc<Mutex<Worker>>>>,
}

impl ProcessRegistry {
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config,
            ids: CommandIds::new(),
            workers: Mutex::new(HashMap::new()),
        }
    }

    pub fn ids(&self) -> &CommandIds {
        &self.ids
    }

    /// Return the live worker for `root`, spawning and initializing one
    /// if none exists.
    ///
    /// A new worker is committed to the registry only after it resolves
    /// the `init` command; on a rejected init or a transport fault the
    /// process is killed before the error is returned, so a failed
    /// attempt leaves neither an entry nor a stray process behind.
    ///
    /// The map lock is not held across the spawn and init handshake, so
    /// lookups and requests for other roots keep flowing while a worker
    /// starts up. Two callers racing on the same root may both spawn;
    /// the insert re-checks the map and the loser's process is killed.
    pub fn get_or_create(&self, root: &Path) -> Result<Arc<Mutex<Worker>>, BridgeError> {
        if let Some(worker) = self.workers.lock().unwrap().get(root) {
            return Ok(Arc::clone(worker));
        }

        let (program, args) = self.config.worker_command()?;
        info!("starting analyzer for {}", root.display());
        let mut worker = Worker::spawn(
            &program,
            &args,
            self.config.request_timeout(),
            self.config.debugging,
        )?;

        let init = Command::Init {
            basedir: root.to_string_lossy().into_owned(),
        };
        let envelope = match worker.request(self.ids.next(), &init) {
            Ok(envelope) => envelope,
            Err(err) => {
                worker.kill();
                return Err(err);
            }
        };
        if !envelope.is_resolution() {
            worker.kill();
            return Err(BridgeError::InitRejected {
                kind: envelope.value.kind,
            });
        }

        let mut workers = self.workers.lock().unwrap();
        if let Some(existing) = workers.get(root) {
            // Another caller won the race while we were initializing.
            worker.kill();
            return Ok(Arc::clone(existing));
        }
        let handle = Arc::new(Mutex::new(worker));
        workers.insert(root.to_path_buf(), Arc::clone(&handle));
        Ok(handle)
    }

    /// The registered worker for `root`, if any. Never spawns.
    pub fn get(&self, root: &Path) -> Option<Arc<Mutex<Worker>>> {
        self.workers.lock().unwrap().get(root).map(Arc::clone)
    }

    /// The registered root that owns `path`.
    ///
    /// Longest prefix wins, matched by path components, so a file under a
    /// nested root is attributed to the nested project rather than
    /// whichever enclosing root happens to be found first.
    pub fn lookup_root_for_path(&self, path: &Path) -> Option<PathBuf> {
        let workers = self.workers.lock().unwrap();
        longest_prefix_root(workers.keys(), path).cloned()
    }

    /// Kill the worker for `root` and drop its entry. No-op for an
    /// unregistered root.
    pub fn remove(&self, root: &Path) {
        let removed = self.workers.lock().unwrap().remove(root);
        if let Some(worker) = removed {
            info!("stopping analyzer for {}", root.display());
            worker.lock().unwrap().kill();
        }
    }

    /// Snapshot of the currently registered roots.
    pub fn active_roots(&self) -> Vec<PathBuf> {
        self.workers.lock().unwrap().keys().cloned().collect()
    }

    /// Kill every worker and empty the registry (host shutdown).
    pub fn kill_all(&self) {
        let drained: Vec<_> = {
            let mut workers = self.workers.lock().unwrap();
            workers.drain().collect()
        };
        for (root, worker) in drained {
            info!("stopping analyzer for {}", root.display());
            worker.lock().unwrap().kill();
        }
    }
}

fn longest_prefix_root<'a>(
    roots: impl Iterator<Item = &'a PathBuf>,
    path: &Path,
) -> Option<&'a PathBuf> {
    roots
        .filter(|root| path.starts_with(root))
        .max_by_key(|root| root.components().count())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_longest_prefix_wins_over_nested_roots() {
        let roots = vec![
            PathBuf::from("/work/app"),
            PathBuf::from("/work/app/vendor/widget"),
            PathBuf::from("/other"),
        ];

        let owner = longest_prefix_root(roots.iter(), Path::new("/work/app/vendor/widget/w.html"));
        assert_eq!(owner, Some(&PathBuf::from("/work/app/vendor/widget")));

        let owner = longest_prefix_root(roots.iter(), Path::new("/work/app/src/a.html"));
        assert_eq!(owner, Some(&PathBuf::from("/work/app")));
    }

    #[test]
    fn test_prefix_matches_whole_components_only() {
        let roots = vec![PathBuf::from("/work/app")];
        // "/work/app2" starts with the string "/work/app" but is a sibling
        // directory, not a child.
        assert_eq!(
            longest_prefix_root(roots.iter(), Path::new("/work/app2/a.html")),
            None
        );
    }

    #[test]
    fn test_unowned_path_has_no_root() {
        let roots = vec![PathBuf::from("/work/app")];
        assert_eq!(
            longest_prefix_root(roots.iter(), Path::new("/elsewhere/a.html")),
            None
        );
    }
}
