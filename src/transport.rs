//! Worker process transport
//!
//! Spawns the analyzer worker and handles low-level line-framed
//! communication over its stdin/stdout pipes. The protocol is strictly
//! paired and sequential per worker: every request line written is
//! followed by exactly one response line read before anything else
//! touches the pipes. No pipelining, no interleaved requests.

use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command as ProcessCommand, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::BridgeError;
use crate::protocol::{self, Command, ResponseEnvelope};

/// Handle to one live analyzer process.
///
/// Owned exclusively by its project root's registry entry; killed when
/// the entry is removed or the handle is dropped.
#[derive(Debug)]
pub struct Worker {
    /// Worker process
    child: Child,
    /// Stdin for sending request lines
    stdin: ChildStdin,
    /// Response lines fed by the stdout reader thread
    lines: Receiver<std::io::Result<String>>,
    /// Converts a stalled read into a transport failure; `None` blocks
    /// indefinitely
    read_timeout: Option<Duration>,
    /// Log raw outgoing lines
    log_messages: bool,
}

impl Worker {
    /// Spawn an analyzer worker process.
    ///
    /// Stdout is consumed by a dedicated reader thread feeding a channel
    /// so reads can time out; stderr is drained to the log on its own
    /// thread so analyzer noise never lands in the response stream.
    pub fn spawn(
        program: &Path,
        args: &[PathBuf],
        read_timeout: Option<Duration>,
        log_messages: bool,
    ) -> Result<Self, BridgeError> {
        let mut child = ProcessCommand::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| BridgeError::Spawn(format!("{}: {}", program.display(), e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| BridgeError::Spawn("failed to open worker stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BridgeError::Spawn("failed to open worker stdout".to_string()))?;

        let (tx, lines) = mpsc::channel();
        thread::Builder::new()
            .name("analyzer-stdout".to_string())
            .spawn(move || {
                let mut reader = BufReader::new(stdout);
                loop {
                    let mut line = String::new();
                    match reader.read_line(&mut line) {
                        Ok(0) => break,
                        Ok(_) => {
                            while line.ends_with('\n') || line.ends_with('\r') {
                                line.pop();
                            }
                            if tx.send(Ok(line)).is_err() {
                                break;
                            }
                        }
                        Err(err) => {
                            let _ = tx.send(Err(err));
                            break;
                        }
                    }
                }
            })
            .map_err(|e| BridgeError::Spawn(format!("failed to start reader thread: {}", e)))?;

        if let Some(stderr) = child.stderr.take() {
            thread::Builder::new()
                .name("analyzer-stderr".to_string())
                .spawn(move || {
                    for line in BufReader::new(stderr).lines() {
                        match line {
                            Ok(line) => warn!(target: "polymer_bridge::worker", "{}", line),
                            Err(_) => break,
                        }
                    }
                })
                .map_err(|e| BridgeError::Spawn(format!("failed to start stderr thread: {}", e)))?;
        }

        Ok(Self {
            child,
            stdin,
            lines,
            read_timeout,
            log_messages,
        })
    }

    /// OS process id, mainly useful to observe respawns.
    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// Write one request line and block for the matching response line.
    ///
    /// A dead worker surfaces as a transport failure (broken pipe on
    /// write, end-of-stream on read), never as a decode error.
    pub fn send(&mut self, line: &str) -> Result<String, BridgeError> {
        if self.log_messages {
            debug!("send_message: {}", line);
        }
        self.stdin.write_all(line.as_bytes())?;
        self.stdin.write_all(b"\n")?;
        self.stdin.flush()?;
        self.read_line()
    }

    /// Round-trip one command: encode, send, decode, verify the
    /// correlation id.
    ///
    /// The worker answers strictly in FIFO order, but the id is checked
    /// anyway: a mismatch means the pairing invariant is broken and the
    /// worker can no longer be trusted.
    pub fn request(&mut self, id: u64, command: &Command) -> Result<ResponseEnvelope, BridgeError> {
        let line = protocol::encode(id, command)?;
        let reply = self.send(&line)?;
        let envelope = protocol::decode(&reply)?;
        if envelope.id != id {
            return Err(BridgeError::Transport(format!(
                "response id {} does not match request id {}",
                envelope.id, id
            )));
        }
        Ok(envelope)
    }

    fn read_line(&mut self) -> Result<String, BridgeError> {
        let received = match self.read_timeout {
            Some(timeout) => self.lines.recv_timeout(timeout).map_err(|err| match err {
                RecvTimeoutError::Timeout => BridgeError::Transport(format!(
                    "worker produced no response within {}ms",
                    timeout.as_millis()
                )),
                RecvTimeoutError::Disconnected => {
                    BridgeError::Transport("worker closed its output stream".to_string())
                }
            })?,
            None => self
                .lines
                .recv()
                .map_err(|_| BridgeError::Transport("worker closed its output stream".to_string()))?,
        };
        received.map_err(|err| BridgeError::Transport(err.to_string()))
    }

    /// Forcibly terminate the worker. No shutdown handshake: the analyzer
    /// holds no state worth flushing.
    pub fn kill(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.kill();
    }
}
