// IPC server - listens for client connections and handles requests

use crate::error::{HatcheryError, Result};
use crate::ipc::{Command, Request, Response};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};

/// IPC server for handling client connections
pub struct IpcServer {
    socket_path: PathBuf,
    listener: Option<UnixListener>,
}

impl IpcServer {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            socket_path: path.as_ref().to_path_buf(),
            listener: None,
        }
    }

    /// Bind the Unix socket, replacing a stale socket file if one exists
    pub fn start(&mut self) -> Result<()> {
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path).map_err(|e| {
                HatcheryError::IpcError(format!("Failed to remove existing socket: {}", e))
            })?;
        }

        let listener = UnixListener::bind(&self.socket_path)
            .map_err(|e| HatcheryError::IpcError(format!("Failed to bind to socket: {}", e)))?;

        // Socket is accessible only by the owner
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.socket_path, permissions).map_err(|e| {
                HatcheryError::IpcError(format!("Failed to set socket permissions: {}", e))
            })?;
        }

        self.listener = Some(listener);
        Ok(())
    }

    /// Run the accept loop, handling each connection in its own task
    pub async fn run<F, Fut>(&self, handler: F) -> Result<()>
    where
        F: Fn(Command) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<Response>> + Send,
    {
        let listener = self
            .listener
            .as_ref()
            .ok_or_else(|| HatcheryError::IpcError("Server not started".to_string()))?;

        let handler = Arc::new(handler);

        loop {
            let (stream, _addr) = match listener.accept().await {
                Ok(pair) => pair,
                Err(e) => {
                    tracing::error!("Failed to accept connection: {}", e);
                    continue;
                }
            };

            let handler = Arc::clone(&handler);
            tokio::spawn(async move {
                if let Err(e) = Self::serve_connection(stream, handler).await {
                    tracing::error!("Connection error: {}", e);
                }
            });
        }
    }

    /// Read one request, dispatch it and write one response
    async fn serve_connection<F, Fut>(stream: UnixStream, handler: Arc<F>) -> Result<()>
    where
        F: Fn(Command) -> Fut + Send + Sync,
        Fut: std::future::Future<Output = Result<Response>> + Send,
    {
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);
        let mut request_line = String::new();
        reader
            .read_line(&mut request_line)
            .await
            .map_err(|e| HatcheryError::IpcError(format!("Failed to read request: {}", e)))?;

        let request: Request = serde_json::from_str(&request_line).map_err(|e| {
            HatcheryError::DeserializationError(format!("Failed to deserialize request: {}", e))
        })?;

        // Response ID always matches the request ID, whatever the handler set
        let response = match handler(request.command).await {
            Ok(resp) => Response {
                id: request.id,
                result: resp.result,
            },
            Err(e) => Response::error(request.id, e.to_string()),
        };

        let mut response_json = serde_json::to_string(&response).map_err(|e| {
            HatcheryError::SerializationError(format!("Failed to serialize response: {}", e))
        })?;
        response_json.push('\n');

        write_half
            .write_all(response_json.as_bytes())
            .await
            .map_err(|e| HatcheryError::IpcError(format!("Failed to write response: {}", e)))?;
        write_half
            .flush()
            .await
            .map_err(|e| HatcheryError::IpcError(format!("Failed to flush stream: {}", e)))?;

        Ok(())
    }

    /// Stop the server and clean up the socket file
    pub fn stop(&mut self) -> Result<()> {
        self.listener = None;

        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path).map_err(|e| {
                HatcheryError::IpcError(format!("Failed to remove socket file: {}", e))
            })?;
        }

        Ok(())
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_server_creation() {
        let server = IpcServer::new("/tmp/hatchery_test.sock");
        assert_eq!(server.socket_path(), Path::new("/tmp/hatchery_test.sock"));
    }

    #[tokio::test]
    async fn test_server_start_stop() {
        let dir = TempDir::new().unwrap();
        let socket_path = dir.path().join("hatchery.sock");
        let mut server = IpcServer::new(&socket_path);

        server.start().unwrap();
        assert!(socket_path.exists());

        server.stop().unwrap();
        assert!(!socket_path.exists());
    }

    #[tokio::test]
    async fn test_server_replaces_stale_socket() {
        let dir = TempDir::new().unwrap();
        let socket_path = dir.path().join("hatchery.sock");
        std::fs::write(&socket_path, "").unwrap();

        let mut server = IpcServer::new(&socket_path);
        server.start().unwrap();
        assert!(socket_path.exists());
    }

    #[tokio::test]
    async fn test_server_cleanup_on_drop() {
        let dir = TempDir::new().unwrap();
        let socket_path = dir.path().join("hatchery.sock");
        {
            let mut server = IpcServer::new(&socket_path);
            server.start().unwrap();
            assert!(socket_path.exists());
        }
        assert!(!socket_path.exists());
    }
}
