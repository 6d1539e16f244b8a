//! Bridge between an editor host and the Polymer analyzer
//!
//! The analyzer is an external long-running Node process, one per open
//! project root, speaking newline-delimited JSON over its stdio pipes.
//! This crate owns everything between the editor glue and those pipes:
//! spawning and registering worker processes, the correlation-id-tagged
//! command protocol, strict request/response pairing with timeouts, and
//! the lifecycle policy that keeps live workers in step with the
//! editor's open folders.
//!
//! Editor UI concerns (overlays, popups, completion rendering) stay with
//! the host; it calls [`Bridge`] with a file path and gets plain data
//! back.

mod bridge;
mod config;
mod debounce;
mod error;
mod protocol;
mod registry;
mod transport;

pub use bridge::Bridge;
pub use config::{default_config_path, load_config, platform, BridgeConfig};
pub use debounce::Debouncer;
pub use error::BridgeError;
pub use protocol::{
    Command, CommandEnvelope, CommandIds, Outcome, Position, ResponseEnvelope, SourceRange,
    Warning, RESOLUTION_KIND,
};
pub use registry::ProcessRegistry;
pub use transport::Worker;
