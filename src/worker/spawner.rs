use crate::error::{HatcheryError, Result};
use crate::worker::TenantId;
use std::path::Path;
use std::process::Stdio;
use tokio::process::{Child, Command};

/// Metadata returned when spawning a worker
#[derive(Debug)]
pub struct SpawnedWorker {
    /// The child process handle
    pub child: Child,

    /// Process ID assigned by the OS
    pub pid: u32,
}

/// Spawn a tenant's worker from its prepared workdir
///
/// The entry point must already be present in the workdir (the packaging
/// step puts it there along with the generated env file). The worker runs
/// with the workdir as its current directory, in its own process group so
/// the whole process tree can be signalled at once, with stdout and stderr
/// captured as pipes.
///
/// # Arguments
/// * `tenant` - Tenant the worker belongs to (used for error context)
/// * `workdir` - Prepared working directory containing the entry point
/// * `entry_point` - File name of the runnable entry point
///
/// # Returns
/// * `Ok(SpawnedWorker)` - Successfully spawned worker with its pid
/// * `Err(HatcheryError::SpawnFailed)` - Entry point missing or spawn failed
pub async fn spawn_worker(
    tenant: &TenantId,
    workdir: &Path,
    entry_point: &str,
) -> Result<SpawnedWorker> {
    let entry = workdir.join(entry_point);
    if !entry.exists() {
        return Err(HatcheryError::SpawnFailed(format!(
            "Entry point does not exist: {}",
            entry.display()
        )));
    }

    let mut command = Command::new(&entry);
    command.current_dir(workdir);

    // Capture stdout and stderr as pipes for the output forwarders
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());

    // Own process group: group signals reach the whole worker tree, and the
    // worker is detached from the daemon's lifetime
    command.process_group(0);

    let child = command.spawn().map_err(|e| {
        HatcheryError::SpawnFailed(format!(
            "Failed to spawn worker for tenant '{}': {}",
            tenant, e
        ))
    })?;

    let pid = child.id().ok_or_else(|| {
        HatcheryError::SpawnFailed(format!("Failed to get PID for tenant '{}'", tenant))
    })?;

    Ok(SpawnedWorker { child, pid })
}
