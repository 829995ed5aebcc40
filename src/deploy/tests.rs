use super::*;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use tempfile::TempDir;

fn tenant(raw: &str) -> TenantId {
    TenantId::parse(raw).unwrap()
}

fn test_config(root: &Path) -> DeployerConfig {
    DeployerConfig {
        data_dir: root.join("data"),
        template_dir: root.join("template"),
        socket_path: root.join("hatchery.sock"),
        ..DeployerConfig::default()
    }
}

fn seed_template(config: &DeployerConfig, entry_body: &str) {
    fs::create_dir_all(&config.template_dir).unwrap();
    let entry = config.template_dir.join(&config.entry_point);
    fs::write(&entry, entry_body).unwrap();
    let mut perms = fs::metadata(&entry).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&entry, perms).unwrap();
    fs::write(
        config.template_dir.join(&config.manifest),
        "{\"name\":\"worker\"}\n",
    )
    .unwrap();
}

fn sleeping_deployer(root: &Path) -> Deployer {
    let config = test_config(root);
    seed_template(&config, "#!/bin/sh\nsleep 30\n");
    Deployer::new(config).unwrap()
}

fn shutdown(deployer: &Deployer) {
    if let Ok(stats) = deployer.stats() {
        for view in stats.instances {
            deployer.supervisor().kill(&view.tenant_id);
        }
    }
}

#[tokio::test]
async fn test_deploy_starts_worker_and_persists_record() {
    let dir = TempDir::new().unwrap();
    let deployer = sleeping_deployer(dir.path());
    let t = tenant("alpha");

    let deployment = deployer.deploy(&t, "super-secret").await.unwrap();

    assert_eq!(deployment.port, 5001);
    assert_eq!(deployment.status, InstanceStatus::Online);
    assert!(deployer.supervisor().probe(&t));

    let view = deployer.status(&t).unwrap();
    assert_eq!(view.status, InstanceStatus::Online);
    assert_eq!(view.port, 5001);

    shutdown(&deployer);
}

#[tokio::test]
async fn test_deploy_writes_runtime_env() {
    let dir = TempDir::new().unwrap();
    let deployer = sleeping_deployer(dir.path());
    let t = tenant("env-check");

    deployer.deploy(&t, "super-secret").await.unwrap();

    let env_path = deployer
        .config()
        .workdir(&t)
        .join(workspace::RUNTIME_ENV_FILE);
    let env = fs::read_to_string(env_path).unwrap();
    assert!(env.contains("TENANT_ID=env-check"));
    assert!(env.contains("SESSION=super-secret"));
    assert!(env.contains("PORT=5001"));
    assert!(env.contains("RUN_MODE=production"));

    // The persisted record carries the fingerprint, not the secret
    let raw = fs::read_to_string(deployer.config().state_path()).unwrap();
    assert!(!raw.contains("super-secret"));

    shutdown(&deployer);
}

#[tokio::test]
async fn test_duplicate_deploy_is_conflict() {
    let dir = TempDir::new().unwrap();
    let deployer = sleeping_deployer(dir.path());
    let t = tenant("dup");

    deployer.deploy(&t, "secret-a").await.unwrap();
    let err = deployer.deploy(&t, "secret-b").await.unwrap_err();

    assert!(matches!(err, HatcheryError::TenantExists(_)));
    let stats = deployer.stats().unwrap();
    assert_eq!(stats.total_deployed, 1);
    assert_eq!(stats.current_instances, 1);

    shutdown(&deployer);
}

#[tokio::test]
async fn test_capacity_checked_after_conflict() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(dir.path());
    seed_template(&config, "#!/bin/sh\nsleep 30\n");
    config.max_instances = 1;
    let deployer = Deployer::new(config).unwrap();

    let t = tenant("only");
    deployer.deploy(&t, "secret").await.unwrap();

    // Same tenant again reports the conflict, not the full store
    let err = deployer.deploy(&t, "secret").await.unwrap_err();
    assert!(matches!(err, HatcheryError::TenantExists(_)));

    let err = deployer.deploy(&tenant("other"), "secret").await.unwrap_err();
    assert!(matches!(
        err,
        HatcheryError::CapacityExceeded {
            limit: 1,
            current: 1
        }
    ));

    shutdown(&deployer);
}

#[tokio::test]
async fn test_template_error_leaves_no_record() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    seed_template(&config, "#!/bin/sh\nsleep 30\n");
    let deployer = Deployer::new(config).unwrap();
    let t = tenant("broken");

    fs::remove_file(deployer.config().template_dir.join("run.sh")).unwrap();

    let err = deployer.deploy(&t, "secret").await.unwrap_err();
    assert!(matches!(err, HatcheryError::WorkspaceError(_)));

    // Nothing was recorded: the workspace failed before the store was touched
    assert_eq!(deployer.stats().unwrap().current_instances, 0);
}

#[tokio::test]
async fn test_entry_point_spawn_failure_keeps_failed_record() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    // Entry point exists in the template but is not executable
    fs::create_dir_all(&config.template_dir).unwrap();
    fs::write(config.template_dir.join(&config.entry_point), "not a script").unwrap();
    fs::write(config.template_dir.join(&config.manifest), "{}").unwrap();
    let deployer = Deployer::new(config).unwrap();
    let t = tenant("fails");

    let err = deployer.deploy(&t, "secret").await.unwrap_err();
    assert!(matches!(err, HatcheryError::SpawnFailed(_)));

    // The record survives the failure, marked failed
    let stats = deployer.stats().unwrap();
    assert_eq!(stats.total_deployed, 1);
    assert_eq!(stats.current_instances, 1);
    let view = deployer.status(&t).unwrap();
    assert_eq!(view.status, InstanceStatus::Offline);
    let raw = fs::read_to_string(deployer.config().state_path()).unwrap();
    assert!(raw.contains("failed"));
}

#[tokio::test]
async fn test_stop_marks_record_stopped() {
    let dir = TempDir::new().unwrap();
    let deployer = sleeping_deployer(dir.path());
    let t = tenant("stoppable");

    deployer.deploy(&t, "secret").await.unwrap();
    let status = deployer.stop(&t).unwrap();

    assert_eq!(status, InstanceStatus::Stopped);
    assert!(!deployer.supervisor().probe(&t));
    assert_eq!(deployer.status(&t).unwrap().status, InstanceStatus::Offline);
}

#[tokio::test]
async fn test_stop_unknown_tenant_is_not_found() {
    let dir = TempDir::new().unwrap();
    let deployer = sleeping_deployer(dir.path());

    let err = deployer.stop(&tenant("ghost")).unwrap_err();
    assert!(matches!(err, HatcheryError::TenantNotFound(_)));
}

#[tokio::test]
async fn test_stop_without_live_worker_fails() {
    let dir = TempDir::new().unwrap();
    let deployer = sleeping_deployer(dir.path());
    let t = tenant("twice");

    deployer.deploy(&t, "secret").await.unwrap();
    deployer.stop(&t).unwrap();

    let err = deployer.stop(&t).unwrap_err();
    assert!(matches!(err, HatcheryError::StopFailed(_, _)));
}

#[tokio::test]
async fn test_remove_kills_live_worker() {
    let dir = TempDir::new().unwrap();
    let deployer = sleeping_deployer(dir.path());
    let t = tenant("removable");

    deployer.deploy(&t, "secret").await.unwrap();
    deployer.remove(&t).unwrap();

    assert!(!deployer.supervisor().probe(&t));
    assert!(matches!(
        deployer.status(&t).unwrap_err(),
        HatcheryError::TenantNotFound(_)
    ));
    // The cumulative counter remembers the deployment
    assert_eq!(deployer.stats().unwrap().total_deployed, 1);
}

#[tokio::test]
async fn test_allocator_seeded_from_existing_records() {
    let dir = TempDir::new().unwrap();
    let deployer = sleeping_deployer(dir.path());

    deployer.deploy(&tenant("first"), "secret").await.unwrap();
    deployer.deploy(&tenant("second"), "secret").await.unwrap();
    shutdown(&deployer);

    // A fresh deployer over the same data dir continues past 5002
    let deployer = sleeping_deployer(dir.path());
    let deployment = deployer.deploy(&tenant("third"), "secret").await.unwrap();
    assert_eq!(deployment.port, 5003);

    shutdown(&deployer);
}
