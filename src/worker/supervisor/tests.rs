use super::*;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use tempfile::TempDir;

fn tenant(raw: &str) -> TenantId {
    TenantId::parse(raw).unwrap()
}

fn write_entry(dir: &Path, body: &str) {
    let path = dir.join("run.sh");
    fs::write(&path, body).unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
}

fn sleeping_workdir() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_entry(dir.path(), "#!/bin/sh\nsleep 30\n");
    dir
}

#[tokio::test]
async fn test_supervisor_new() {
    let supervisor = WorkerSupervisor::new("run.sh");
    assert_eq!(supervisor.running_count(), 0);
}

#[tokio::test]
async fn test_spawn_and_probe() {
    let supervisor = WorkerSupervisor::new("run.sh");
    let dir = sleeping_workdir();
    let t = tenant("spawn-probe");

    let handle = supervisor.spawn(&t, dir.path(), 5001).await.unwrap();
    assert!(handle.pid > 0);
    assert_eq!(handle.port, 5001);

    assert!(supervisor.probe(&t));
    assert_eq!(supervisor.running_count(), 1);

    supervisor.kill(&t);
}

#[tokio::test]
async fn test_spawn_missing_entry_point() {
    let supervisor = WorkerSupervisor::new("run.sh");
    let dir = TempDir::new().unwrap();
    let t = tenant("no-entry");

    let result = supervisor.spawn(&t, dir.path(), 5001).await;
    assert!(matches!(result, Err(HatcheryError::SpawnFailed(_))));
    assert_eq!(supervisor.running_count(), 0);
}

#[tokio::test]
async fn test_spawn_duplicate_tenant() {
    let supervisor = WorkerSupervisor::new("run.sh");
    let dir = sleeping_workdir();
    let t = tenant("dup");

    supervisor.spawn(&t, dir.path(), 5001).await.unwrap();

    let result = supervisor.spawn(&t, dir.path(), 5002).await;
    assert!(matches!(
        result,
        Err(HatcheryError::WorkerAlreadyRunning(_))
    ));

    supervisor.kill(&t);
}

#[tokio::test]
async fn test_kill_removes_handle() {
    let supervisor = WorkerSupervisor::new("run.sh");
    let dir = sleeping_workdir();
    let t = tenant("kill-me");

    supervisor.spawn(&t, dir.path(), 5001).await.unwrap();
    assert!(supervisor.probe(&t));

    assert!(supervisor.kill(&t));
    assert!(!supervisor.probe(&t));
    assert!(supervisor.handle(&t).is_none());

    // Handle is already gone, so a second kill reports false
    assert!(!supervisor.kill(&t));
}

#[tokio::test]
async fn test_kill_without_handle() {
    let supervisor = WorkerSupervisor::new("run.sh");
    assert!(!supervisor.kill(&tenant("never-spawned")));
}

#[tokio::test]
async fn test_exited_worker_loses_its_handle() {
    let supervisor = WorkerSupervisor::new("run.sh");
    let dir = TempDir::new().unwrap();
    write_entry(dir.path(), "#!/bin/sh\nexit 0\n");
    let t = tenant("short-lived");

    supervisor.spawn(&t, dir.path(), 5001).await.unwrap();

    // Give the worker time to exit and the reaper time to observe it
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert!(!supervisor.probe(&t));
    assert_eq!(supervisor.running_count(), 0);
    assert_eq!(supervisor.uptime(&t), Duration::from_secs(0));
}

#[tokio::test]
async fn test_respawn_keeps_fresh_handle() {
    let supervisor = WorkerSupervisor::new("run.sh");
    let dir = sleeping_workdir();
    let t = tenant("respawn");

    let first = supervisor.spawn(&t, dir.path(), 5001).await.unwrap();
    assert!(supervisor.kill(&t));

    let second = supervisor.spawn(&t, dir.path(), 5001).await.unwrap();
    assert_ne!(first.pid, second.pid);

    // The old worker's reaper must not evict the replacement's handle
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(supervisor.probe(&t));
    assert_eq!(supervisor.handle(&t).map(|h| h.pid), Some(second.pid));

    supervisor.kill(&t);
}

#[tokio::test]
async fn test_uptime_while_running() {
    let supervisor = WorkerSupervisor::new("run.sh");
    let dir = sleeping_workdir();
    let t = tenant("uptime");

    supervisor.spawn(&t, dir.path(), 5001).await.unwrap();

    let uptime = supervisor.uptime(&t);
    assert!(uptime.as_secs() < 5);
    assert!(supervisor.probe(&t));

    supervisor.kill(&t);
    assert_eq!(supervisor.uptime(&t), Duration::from_secs(0));
}

#[tokio::test]
async fn test_supervisors_are_independent() {
    let left = WorkerSupervisor::new("run.sh");
    let right = WorkerSupervisor::new("run.sh");
    let dir = sleeping_workdir();
    let t = tenant("isolated");

    left.spawn(&t, dir.path(), 5001).await.unwrap();

    assert!(left.probe(&t));
    assert!(!right.probe(&t));
    assert_eq!(right.running_count(), 0);

    left.kill(&t);
}
