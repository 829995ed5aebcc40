// IPC client - communicates with the daemon via Unix socket

use crate::error::{HatcheryError, Result};
use crate::ipc::{Command, Request, Response};
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Default socket path for daemon communication
const DEFAULT_SOCKET_PATH: &str = "/tmp/hatchery.sock";

/// Maximum number of connection retry attempts
const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Delay between retry attempts
const RETRY_DELAY: Duration = Duration::from_millis(100);

/// IPC client for communicating with the daemon
pub struct IpcClient {
    socket_path: PathBuf,
    request_id: AtomicU64,
}

impl IpcClient {
    /// Create a new IPC client with the default socket path
    pub fn new() -> Self {
        Self::with_socket_path(DEFAULT_SOCKET_PATH)
    }

    /// Create a new IPC client with a custom socket path
    pub fn with_socket_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            socket_path: path.as_ref().to_path_buf(),
            request_id: AtomicU64::new(1),
        }
    }

    /// Send a command to the daemon and wait for a response
    ///
    /// Transient failures on a live socket are retried a few times. A
    /// missing socket or a refused connection means there is no daemon to
    /// answer, so those fail immediately instead of burning the retry
    /// budget.
    pub fn send_command(&self, command: Command) -> Result<Response> {
        let request_id = self.request_id.fetch_add(1, Ordering::SeqCst);
        let request = Request::new(request_id, command);

        let mut last_error = None;
        for attempt in 1..=MAX_RETRY_ATTEMPTS {
            match self.try_send_request(&request) {
                Ok(response) => {
                    if response.id != request_id {
                        return Err(HatcheryError::ProtocolError(format!(
                            "Response ID mismatch: expected {}, got {}",
                            request_id, response.id
                        )));
                    }
                    return Ok(response);
                }
                Err(HatcheryError::DaemonNotRunning) => {
                    return Err(HatcheryError::DaemonNotRunning);
                }
                Err(e) => {
                    last_error = Some(e);
                    if attempt < MAX_RETRY_ATTEMPTS {
                        std::thread::sleep(RETRY_DELAY);
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            HatcheryError::ConnectionError("Failed to connect after retries".to_string())
        }))
    }

    /// Attempt to send a request to the daemon (single attempt)
    fn try_send_request(&self, request: &Request) -> Result<Response> {
        let mut stream = self.connect()?;

        let request_json = serde_json::to_string(request).map_err(|e| {
            HatcheryError::SerializationError(format!("Failed to serialize request: {}", e))
        })?;

        writeln!(stream, "{}", request_json)
            .map_err(|e| HatcheryError::IpcError(format!("Failed to write request: {}", e)))?;
        stream
            .flush()
            .map_err(|e| HatcheryError::IpcError(format!("Failed to flush stream: {}", e)))?;

        let mut reader = BufReader::new(stream);
        let mut response_line = String::new();
        reader
            .read_line(&mut response_line)
            .map_err(|e| HatcheryError::IpcError(format!("Failed to read response: {}", e)))?;

        let response: Response = serde_json::from_str(&response_line).map_err(|e| {
            HatcheryError::DeserializationError(format!("Failed to deserialize response: {}", e))
        })?;

        Ok(response)
    }

    /// Establish a connection to the daemon's Unix socket
    fn connect(&self) -> Result<UnixStream> {
        if !self.socket_path.exists() {
            return Err(HatcheryError::DaemonNotRunning);
        }

        UnixStream::connect(&self.socket_path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::ConnectionRefused
                || e.kind() == std::io::ErrorKind::NotFound
            {
                HatcheryError::DaemonNotRunning
            } else {
                HatcheryError::ConnectionError(format!("Failed to connect to daemon: {}", e))
            }
        })
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

impl Default for IpcClient {
    fn default() -> Self {
        Self::new()
    }
}
