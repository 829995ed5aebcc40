// Example demonstrating config-driven debounced restarts

use hatchery::restart::{ConfigWatcher, RestartController, RestartPlan};
use hatchery::worker::{TenantId, WorkerSupervisor};
use hatchery::workspace::RUNTIME_ENV_FILE;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    println!("=== Restart Controller Demo ===\n");

    let root = PathBuf::from("/tmp/hatchery-restart-demo");
    let _ = fs::remove_dir_all(&root);
    let workdir = root.join("work");
    fs::create_dir_all(&workdir)?;

    let entry = workdir.join("run.sh");
    fs::write(&entry, "#!/bin/sh\nsleep 120\n")?;
    let mut perms = fs::metadata(&entry)?.permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&entry, perms)?;

    let source = root.join("tenant.env");
    fs::write(&source, "PORT=5001\nRUN_MODE=production\n")?;

    let supervisor = WorkerSupervisor::new("run.sh");
    let tenant = TenantId::parse("demo")?;

    let handle = supervisor.spawn(&tenant, &workdir, 5001).await?;
    println!("Worker running with pid {}\n", handle.pid);

    let plan = RestartPlan {
        tenant: tenant.clone(),
        source: source.clone(),
        workdir: workdir.clone(),
        port: 5001,
        debounce: Duration::from_millis(500),
        grace: Duration::from_millis(200),
    };

    let (events, watcher_task) =
        ConfigWatcher::new(source.clone(), Duration::from_millis(100)).spawn();
    let controller = RestartController::new(plan, supervisor.clone());
    let restarts = controller.completed_restarts();
    let controller_task = tokio::spawn(controller.run(events));

    tokio::time::sleep(Duration::from_millis(300)).await;

    // A burst of changes collapses into one restart
    println!("Writing three config changes in quick succession...");
    for mode in ["staging", "canary", "maintenance"] {
        fs::write(&source, format!("PORT=5001\nRUN_MODE={}\n", mode))?;
        tokio::time::sleep(Duration::from_millis(150)).await;
    }

    println!("Waiting for the debounce window to settle...\n");
    tokio::time::sleep(Duration::from_secs(2)).await;

    let new_pid = supervisor.handle(&tenant).map(|h| h.pid);
    println!(
        "Restarts completed: {} (pid {} -> {:?})",
        restarts.load(Ordering::SeqCst),
        handle.pid,
        new_pid
    );
    println!(
        "Runtime env now: {:?}",
        fs::read_to_string(workdir.join(RUNTIME_ENV_FILE))?
    );

    // Cleanup
    println!("\nCleaning up...");
    watcher_task.abort();
    controller_task.abort();
    supervisor.kill(&tenant);

    println!("Demo complete!");
    Ok(())
}
