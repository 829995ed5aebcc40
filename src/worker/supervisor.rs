use crate::error::{HatcheryError, Result};
use crate::worker::liveness::LivenessProbe;
use crate::worker::output::{forward_stderr, forward_stdout};
use crate::worker::spawner::spawn_worker;
use crate::worker::types::{TenantId, WorkerHandle};
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime};
use tokio::process::Child;

/// Supervises the live worker process of every tenant
///
/// Cloning is cheap; all clones share one handle table. Handles are
/// in-memory only: after a daemon restart every previously spawned worker
/// is invisible to the supervisor until its tenant is deployed again, and
/// durable records read as offline in the meantime.
#[derive(Clone)]
pub struct WorkerSupervisor {
    entry_point: String,
    inner: Arc<Mutex<SupervisorInner>>,
}

struct SupervisorInner {
    handles: HashMap<TenantId, WorkerHandle>,
    probe: LivenessProbe,
}

impl WorkerSupervisor {
    /// Create a supervisor that spawns `entry_point` inside tenant workdirs
    pub fn new(entry_point: impl Into<String>) -> Self {
        Self {
            entry_point: entry_point.into(),
            inner: Arc::new(Mutex::new(SupervisorInner {
                handles: HashMap::new(),
                probe: LivenessProbe::new(),
            })),
        }
    }

    /// Spawn a worker for a tenant from its prepared workdir
    ///
    /// Fails with `SpawnFailed` when the entry point is missing and with
    /// `WorkerAlreadyRunning` when the tenant already has a live worker.
    /// A stale handle left by a dead worker does not block a new spawn;
    /// the duplicate check probes liveness first.
    pub async fn spawn(
        &self,
        tenant: &TenantId,
        workdir: &Path,
        port: u16,
    ) -> Result<WorkerHandle> {
        if self.probe(tenant) {
            return Err(HatcheryError::WorkerAlreadyRunning(tenant.to_string()));
        }

        let mut spawned = spawn_worker(tenant, workdir, &self.entry_point).await?;

        if let Some(stdout) = spawned.child.stdout.take() {
            forward_stdout(tenant.clone(), stdout);
        }
        if let Some(stderr) = spawned.child.stderr.take() {
            forward_stderr(tenant.clone(), stderr);
        }

        let handle = {
            let mut inner = self.lock_inner();
            let os_start_time = inner.probe.start_time(spawned.pid);
            let handle = WorkerHandle {
                tenant: tenant.clone(),
                pid: spawned.pid,
                port,
                spawned_at: SystemTime::now(),
                os_start_time,
            };
            inner.handles.insert(tenant.clone(), handle.clone());
            handle
        };

        self.reap_on_exit(tenant.clone(), spawned.child, spawned.pid);

        tracing::info!(
            tenant = %tenant,
            pid = handle.pid,
            port,
            "Worker spawned"
        );

        Ok(handle)
    }

    /// Terminate a tenant's worker
    ///
    /// Sends SIGTERM to the worker's process group, falling back to the
    /// direct pid when the group signal fails. The handle is removed no
    /// matter which path ran. Returns `false` when no handle exists or both
    /// signal paths failed; a failed kill is never retried.
    pub fn kill(&self, tenant: &TenantId) -> bool {
        let handle = {
            let mut inner = self.lock_inner();
            match inner.handles.remove(tenant) {
                Some(handle) => handle,
                None => return false,
            }
        };

        let pid = Pid::from_raw(handle.pid as i32);

        // The worker is its own group leader, so its pid doubles as the pgid
        match signal::killpg(pid, Signal::SIGTERM) {
            Ok(()) => {
                tracing::info!(tenant = %tenant, pid = handle.pid, "Worker process group terminated");
                true
            }
            Err(group_err) => {
                tracing::warn!(
                    tenant = %tenant,
                    pid = handle.pid,
                    "Group terminate failed ({}), signalling worker directly",
                    group_err
                );
                match signal::kill(pid, Signal::SIGTERM) {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::error!(
                            tenant = %tenant,
                            pid = handle.pid,
                            "Failed to terminate worker: {}",
                            e
                        );
                        false
                    }
                }
            }
        }
    }

    /// Check whether the tenant's worker is alive right now
    ///
    /// Non-destructive towards the process. A handle whose pid is gone or
    /// has been reused is cleared as a side effect, so a stale entry can
    /// never wedge a tenant.
    pub fn probe(&self, tenant: &TenantId) -> bool {
        let mut inner = self.lock_inner();

        let (pid, expected) = match inner.handles.get(tenant) {
            Some(handle) => (handle.pid, handle.os_start_time),
            None => return false,
        };

        if inner.probe.is_alive(pid, expected) {
            true
        } else {
            inner.handles.remove(tenant);
            false
        }
    }

    /// Wall-clock uptime of the tenant's worker; zero when not running
    pub fn uptime(&self, tenant: &TenantId) -> Duration {
        if !self.probe(tenant) {
            return Duration::from_secs(0);
        }
        self.lock_inner()
            .handles
            .get(tenant)
            .map(|h| h.uptime())
            .unwrap_or(Duration::from_secs(0))
    }

    /// Snapshot of the tenant's handle, if one exists
    pub fn handle(&self, tenant: &TenantId) -> Option<WorkerHandle> {
        self.lock_inner().handles.get(tenant).cloned()
    }

    /// Number of tenants with a live handle
    pub fn running_count(&self) -> usize {
        self.lock_inner().handles.len()
    }

    /// Observe the worker's exit and drop its handle exactly once
    ///
    /// The reaper owns the `Child`, which keeps the exited process from
    /// lingering as a zombie while the daemon runs.
    fn reap_on_exit(&self, tenant: TenantId, mut child: Child, pid: u32) {
        let supervisor = self.clone();
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) => {
                    tracing::info!(tenant = %tenant, pid, "Worker exited: {}", status);
                }
                Err(e) => {
                    tracing::warn!(tenant = %tenant, pid, "Failed to observe worker exit: {}", e);
                }
            }
            supervisor.remove_if_current(&tenant, pid);
        });
    }

    /// Remove the tenant's handle only if it still refers to the given pid
    ///
    /// A replacement worker spawned after a kill keeps its fresh handle even
    /// when the old worker's reaper fires afterwards.
    fn remove_if_current(&self, tenant: &TenantId, pid: u32) {
        let mut inner = self.lock_inner();
        if inner.handles.get(tenant).map(|h| h.pid) == Some(pid) {
            inner.handles.remove(tenant);
        }
    }

    fn lock_inner(&self) -> MutexGuard<'_, SupervisorInner> {
        // Handle-table updates never leave partial state, so a poisoned
        // lock is safe to re-enter
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests;
