//! Bridge configuration
//!
//! The bridge needs very little from its host: where the JavaScript
//! runtime lives on this platform, where the analyzer entry point is,
//! and whether raw outgoing messages should be logged. Configuration is
//! read from a JSON file with graceful fallback to defaults.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

/// Platform key used to pick the runtime executable, matching the
/// `node_path` table keys: `linux`, `osx`, or `windows`.
pub fn platform() -> &'static str {
    if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "macos") {
        "osx"
    } else {
        "linux"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Runtime executable per platform key.
    #[serde(default = "default_node_path")]
    pub node_path: HashMap<String, PathBuf>,
    /// Analyzer entry point passed as the runtime's first argument.
    #[serde(default = "default_analyzer_path")]
    pub analyzer_path: PathBuf,
    /// Delay the host should use when coalescing editor events. The
    /// bridge itself never schedules anything; this is carried for the
    /// host to consume.
    #[serde(default = "default_debounce_delay_ms")]
    pub debounce_delay_ms: u64,
    /// How long a request may wait for its response line before it is
    /// treated as a transport failure. `None` blocks indefinitely.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: Option<u64>,
    /// Log raw outgoing protocol lines.
    #[serde(default)]
    pub debugging: bool,
}

impl BridgeConfig {
    /// The command used to start one worker: `<runtime> <analyzer-entry>`.
    pub fn worker_command(&self) -> Result<(PathBuf, Vec<PathBuf>), BridgeError> {
        let runtime = self.node_path.get(platform()).ok_or_else(|| {
            BridgeError::Spawn(format!(
                "no runtime executable configured for platform `{}`",
                platform()
            ))
        })?;
        Ok((runtime.clone(), vec![self.analyzer_path.clone()]))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            node_path: default_node_path(),
            analyzer_path: default_analyzer_path(),
            debounce_delay_ms: default_debounce_delay_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            debugging: false,
        }
    }
}

fn default_node_path() -> HashMap<String, PathBuf> {
    let mut paths = HashMap::new();
    for key in ["linux", "osx", "windows"] {
        paths.insert(key.to_string(), PathBuf::from("node"));
    }
    paths
}

fn default_analyzer_path() -> PathBuf {
    PathBuf::from("node_modules/polymer-editor-service/lib/polymer-editor-server.js")
}

fn default_debounce_delay_ms() -> u64 {
    500
}

fn default_request_timeout_ms() -> Option<u64> {
    Some(10_000)
}

pub fn default_config_path() -> PathBuf {
    let Some(dirs) = ProjectDirs::from("io", "polymer", "polymer-bridge") else {
        return Path::new("polymer-bridge.json").to_path_buf();
    };
    dirs.config_dir().join("polymer-bridge.json")
}

/// Load configuration, falling back to defaults when the file is missing
/// or malformed.
pub fn load_config(path: &Path) -> BridgeConfig {
    let Ok(bytes) = fs::read(path) else {
        return BridgeConfig::default();
    };
    serde_json::from_slice::<BridgeConfig>(&bytes).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_covers_every_platform() {
        let config = BridgeConfig::default();
        let (runtime, args) = config.worker_command().unwrap();
        assert_eq!(runtime, PathBuf::from("node"));
        assert_eq!(args, vec![config.analyzer_path.clone()]);
    }

    #[test]
    fn test_missing_platform_is_a_spawn_failure() {
        let config = BridgeConfig {
            node_path: HashMap::new(),
            ..BridgeConfig::default()
        };
        let err = config.worker_command().unwrap_err();
        assert!(matches!(err, BridgeError::Spawn(_)));
    }

    #[test]
    fn test_load_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("does-not-exist.json"));
        assert!(!config.debugging);
        assert_eq!(config.request_timeout_ms, Some(10_000));
    }

    #[test]
    fn test_load_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("polymer-bridge.json");
        fs::write(&path, r#"{"debugging": true, "request_timeout_ms": null}"#).unwrap();
        let config = load_config(&path);
        assert!(config.debugging);
        assert_eq!(config.request_timeout_ms, None);
        assert!(config.node_path.contains_key("linux"));
    }
}
