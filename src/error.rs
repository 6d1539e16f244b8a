//! Error types for bridge operations.

use thiserror::Error;

/// Error types for analyzer bridge operations.
///
/// An unowned or missing file path is not an error: façade calls answer
/// those with `None`/`false` and never touch the wire.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The worker executable could not be started.
    #[error("failed to spawn analyzer worker: {0}")]
    Spawn(String),
    /// The worker answered `init` with a non-resolution kind.
    /// The spawned process is killed before this is returned.
    #[error("analyzer worker rejected init with kind `{kind}`")]
    InitRejected { kind: String },
    /// Broken pipe, worker EOF, stalled read, or a response id that does
    /// not match the outstanding request. The worker is unusable; callers
    /// may remove and respawn the project entry.
    #[error("analyzer transport failure: {0}")]
    Transport(String),
    /// The response line is not valid JSON or lacks required fields.
    /// A failure of this single request, not a reason to kill the worker.
    #[error("failed to decode analyzer response: {0}")]
    Decode(String),
}

impl From<std::io::Error> for BridgeError {
    fn from(err: std::io::Error) -> Self {
        BridgeError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::Decode(err.to_string())
    }
}
