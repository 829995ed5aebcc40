// Integration tests for IPC server and client

use hatchery::error::HatcheryError;
use hatchery::ipc::{Command, IpcClient, IpcServer, Response, ResponseData};
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;
use tokio::task::JoinHandle;

fn start_server<F, Fut>(socket_path: &PathBuf, handler: F) -> JoinHandle<()>
where
    F: Fn(Command) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = hatchery::error::Result<Response>> + Send,
{
    let mut server = IpcServer::new(socket_path);
    server.start().expect("Failed to start server");

    tokio::spawn(async move {
        let _ = server.run(handler).await;
    })
}

async fn send(socket_path: &PathBuf, command: Command) -> hatchery::error::Result<Response> {
    let socket_path = socket_path.clone();
    tokio::task::spawn_blocking(move || {
        let client = IpcClient::with_socket_path(&socket_path);
        client.send_command(command)
    })
    .await
    .expect("Client task panicked")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_server_client_communication() {
    let dir = TempDir::new().unwrap();
    let socket_path = dir.path().join("hatchery.sock");

    let server_task = start_server(&socket_path, |command| async move {
        match command {
            Command::Ping => Ok(Response::success(
                0,
                ResponseData::Pong {
                    uptime: Duration::from_secs(42),
                },
            )),
            _ => Ok(Response::error(0, "Unexpected command".to_string())),
        }
    });

    let response = send(&socket_path, Command::Ping).await.unwrap();

    match response.result.unwrap() {
        ResponseData::Pong { uptime } => assert_eq!(uptime, Duration::from_secs(42)),
        other => panic!("Expected Pong response, got: {:?}", other),
    }

    server_task.abort();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_server_error_handling() {
    let dir = TempDir::new().unwrap();
    let socket_path = dir.path().join("hatchery.sock");

    let server_task = start_server(&socket_path, |_command| async move {
        Err(HatcheryError::TenantNotFound("ghost".to_string()))
    });

    let response = send(&socket_path, Command::List).await.unwrap();

    let error_msg = response.result.unwrap_err();
    assert!(error_msg.contains("No deployment found for tenant: ghost"));

    server_task.abort();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_server_multiple_connections() {
    let dir = TempDir::new().unwrap();
    let socket_path = dir.path().join("hatchery.sock");

    let server_task = start_server(&socket_path, |command| async move {
        match command {
            Command::Remove { tenant } => {
                Ok(Response::success(0, ResponseData::Removed { tenant }))
            }
            _ => Ok(Response::error(0, "Unexpected command".to_string())),
        }
    });

    for name in ["first", "second", "third"] {
        let response = send(
            &socket_path,
            Command::Remove {
                tenant: name.to_string(),
            },
        )
        .await
        .unwrap();

        match response.result.unwrap() {
            ResponseData::Removed { tenant } => assert_eq!(tenant, name),
            other => panic!("Expected Removed response, got: {:?}", other),
        }
    }

    server_task.abort();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_client_without_daemon() {
    let dir = TempDir::new().unwrap();
    let socket_path = dir.path().join("missing.sock");

    let result = send(&socket_path, Command::Ping).await;

    assert!(matches!(result, Err(HatcheryError::DaemonNotRunning)));
}
