//! Analyzer wire protocol
//!
//! The analyzer speaks newline-delimited JSON over its stdio pipes, one
//! message per line. Requests are command envelopes tagged with a
//! correlation id; responses carry the same id back together with an
//! outcome whose `kind` discriminates success (`"resolution"`) from
//! everything else.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::BridgeError;

/// The outcome kind that denotes success.
pub const RESOLUTION_KIND: &str = "resolution";

/// Zero-based line/column position, consumable directly as editor offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// Span of a warning within a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRange {
    pub start: Position,
    pub end: Position,
}

/// A single analyzer warning for a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Warning {
    pub message: String,
    pub source_range: SourceRange,
}

/// Commands understood by the analyzer worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Command {
    /// Bind a freshly spawned worker to a project root. Must be the first
    /// command on a new worker.
    Init { basedir: String },
    /// Fetch current warnings for a root-relative file path.
    GetWarningsFor { local_path: String },
    /// Tell the worker a file changed. Absent `contents` signals "use the
    /// on-disk contents" (the editor buffer is clean).
    FileChanged {
        local_path: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        contents: Option<String>,
    },
    /// Fetch typeahead completions / definition info at a position.
    GetTypeaheadCompletionsFor {
        local_path: String,
        position: Position,
    },
}

/// Request envelope: `{"id": <int>, "value": <Command>}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandEnvelope {
    pub id: u64,
    pub value: Command,
}

/// The `value` half of a response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct Outcome {
    pub kind: String,
    #[serde(default)]
    pub resolution: Option<Value>,
}

/// Response envelope: `{"id": <int>, "value": {"kind": …, "resolution"?: …}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseEnvelope {
    pub id: u64,
    pub value: Outcome,
}

impl ResponseEnvelope {
    /// True iff the worker resolved the request successfully.
    pub fn is_resolution(&self) -> bool {
        self.value.kind == RESOLUTION_KIND
    }

    /// The resolution payload, if the request resolved and carried one.
    pub fn into_resolution(self) -> Option<Value> {
        if self.value.kind == RESOLUTION_KIND {
            self.value.resolution
        } else {
            None
        }
    }
}

/// Correlation id source, shared across every project's worker.
///
/// Ids strictly increase for the lifetime of the host process and are
/// never reused; they are not contiguous per project.
#[derive(Debug)]
pub struct CommandIds {
    next: AtomicU64,
}

impl CommandIds {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Allocate the next correlation id.
    pub fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }
}

impl Default for CommandIds {
    fn default() -> Self {
        Self::new()
    }
}

/// Serialize a command under the given correlation id as one JSON line.
pub fn encode(id: u64, command: &Command) -> Result<String, BridgeError> {
    #[derive(Serialize)]
    struct Envelope<'a> {
        id: u64,
        value: &'a Command,
    }
    let line = serde_json::to_string(&Envelope { id, value: command })?;
    Ok(line)
}

/// Parse one response line from the worker.
pub fn decode(line: &str) -> Result<ResponseEnvelope, BridgeError> {
    serde_json::from_str(line).map_err(|err| BridgeError::Decode(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_strictly_increase() {
        let ids = CommandIds::new();
        // Shared across projects: interleaved allocations never repeat.
        assert_eq!(ids.next(), 1);
        assert_eq!(ids.next(), 2);
        assert_eq!(ids.next(), 3);
    }

    #[test]
    fn test_encode_init_wire_shape() {
        let line = encode(
            1,
            &Command::Init {
                basedir: "/proj".to_string(),
            },
        )
        .unwrap();
        assert_eq!(line, r#"{"id":1,"value":{"kind":"init","basedir":"/proj"}}"#);
        assert!(!line.contains('\n'));
    }

    #[test]
    fn test_encode_get_warnings_wire_shape() {
        let line = encode(
            2,
            &Command::GetWarningsFor {
                local_path: "src/a.html".to_string(),
            },
        )
        .unwrap();
        assert_eq!(
            line,
            r#"{"id":2,"value":{"kind":"getWarningsFor","localPath":"src/a.html"}}"#
        );
    }

    #[test]
    fn test_encode_decode_round_trips_local_path() {
        let command = Command::GetWarningsFor {
            local_path: "src/components/app-shell.html".to_string(),
        };
        let line = encode(7, &command).unwrap();
        let envelope: CommandEnvelope = serde_json::from_str(&line).unwrap();
        assert_eq!(envelope.id, 7);
        assert_eq!(envelope.value, command);
    }

    #[test]
    fn test_file_changed_clean_buffer_omits_contents() {
        let line = encode(
            3,
            &Command::FileChanged {
                local_path: "src/a.html".to_string(),
                contents: None,
            },
        )
        .unwrap();
        assert!(!line.contains("contents"));

        let line = encode(
            4,
            &Command::FileChanged {
                local_path: "src/a.html".to_string(),
                contents: Some("<dom-module>".to_string()),
            },
        )
        .unwrap();
        assert!(line.contains(r#""contents":"<dom-module>""#));
    }

    #[test]
    fn test_typeahead_position_wire_shape() {
        let line = encode(
            5,
            &Command::GetTypeaheadCompletionsFor {
                local_path: "index.html".to_string(),
                position: Position::new(12, 4),
            },
        )
        .unwrap();
        assert!(line.contains(r#""position":{"line":12,"column":4}"#));
    }

    #[test]
    fn test_decode_resolution() {
        let envelope =
            decode(r#"{"id":1,"value":{"kind":"resolution","resolution":true}}"#).unwrap();
        assert_eq!(envelope.id, 1);
        assert!(envelope.is_resolution());
        assert_eq!(envelope.into_resolution(), Some(Value::Bool(true)));
    }

    #[test]
    fn test_decode_rejection_carries_no_resolution() {
        let envelope = decode(r#"{"id":9,"value":{"kind":"error"}}"#).unwrap();
        assert!(!envelope.is_resolution());
        assert_eq!(envelope.into_resolution(), None);
    }

    #[test]
    fn test_decode_malformed_line() {
        let err = decode("not json at all").unwrap_err();
        assert!(matches!(err, BridgeError::Decode(_)));

        let err = decode(r#"{"value":{"kind":"resolution"}}"#).unwrap_err();
        assert!(matches!(err, BridgeError::Decode(_)));
    }

    #[test]
    fn test_warning_deserializes_camel_case() {
        let warning: Warning = serde_json::from_str(
            r#"{"message":"missing import","sourceRange":{"start":{"line":0,"column":2},"end":{"line":0,"column":9}}}"#,
        )
        .unwrap();
        assert_eq!(warning.message, "missing import");
        assert_eq!(warning.source_range.start, Position::new(0, 2));
        assert_eq!(warning.source_range.end, Position::new(0, 9));
    }
}
