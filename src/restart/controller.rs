use crate::error::Result;
use crate::restart::watcher::ConfigChanged;
use crate::worker::{TenantId, WorkerSupervisor};
use crate::workspace;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};

/// State of the restart machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ControllerState {
    Idle,
    Debouncing,
    Restarting,
}

/// Everything a controller needs to know about its tenant's deployment
#[derive(Debug, Clone)]
pub struct RestartPlan {
    pub tenant: TenantId,
    /// External config file whose changes trigger restarts
    pub source: PathBuf,
    /// Runtime directory the worker is spawned from
    pub workdir: PathBuf,
    pub port: u16,
    /// How long changes must settle before a restart begins
    pub debounce: Duration,
    /// Pause between killing the old worker and spawning the new one
    pub grace: Duration,
}

/// Per-tenant restart controller
///
/// Consumes change events from a single queue and drives an explicit
/// `Idle -> Debouncing -> Restarting -> Idle` machine: every event during
/// the debounce window pushes the deadline out, and events arriving while
/// the restart sequence runs are dropped, so one burst of changes produces
/// exactly one restart and at most one sequence is ever in flight.
pub struct RestartController {
    plan: RestartPlan,
    supervisor: WorkerSupervisor,
    restarts: Arc<AtomicUsize>,
}

impl RestartController {
    pub fn new(plan: RestartPlan, supervisor: WorkerSupervisor) -> Self {
        Self {
            plan,
            supervisor,
            restarts: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Counter of completed restart sequences
    pub fn completed_restarts(&self) -> Arc<AtomicUsize> {
        self.restarts.clone()
    }

    /// Drive the state machine until the event channel closes
    pub async fn run(self, mut events: mpsc::Receiver<ConfigChanged>) {
        let mut state = ControllerState::Idle;
        let mut deadline = Instant::now();

        loop {
            match state {
                ControllerState::Idle => match events.recv().await {
                    Some(ConfigChanged) => {
                        deadline = Instant::now() + self.plan.debounce;
                        state = ControllerState::Debouncing;
                    }
                    None => break,
                },
                ControllerState::Debouncing => {
                    tokio::select! {
                        _ = sleep_until(deadline) => {
                            state = ControllerState::Restarting;
                        }
                        event = events.recv() => match event {
                            // A new change restarts the settle window
                            Some(ConfigChanged) => {
                                deadline = Instant::now() + self.plan.debounce;
                            }
                            None => break,
                        },
                    }
                }
                ControllerState::Restarting => {
                    if let Err(e) = self.run_restart_sequence().await {
                        tracing::error!(
                            tenant = %self.plan.tenant,
                            "Restart sequence failed: {}",
                            e
                        );
                    }
                    // Changes observed while the sequence ran are dropped
                    while events.try_recv().is_ok() {}
                    state = ControllerState::Idle;
                }
            }
        }

        tracing::debug!(tenant = %self.plan.tenant, "Restart controller stopped");
    }

    /// Kill, wait out the grace period, reapply the snapshot, spawn
    async fn run_restart_sequence(&self) -> Result<()> {
        tracing::info!(
            tenant = %self.plan.tenant,
            "Configuration changed, restarting worker"
        );

        if !self.supervisor.kill(&self.plan.tenant) {
            tracing::warn!(
                tenant = %self.plan.tenant,
                "No live worker to terminate before restart"
            );
        }

        tokio::time::sleep(self.plan.grace).await;

        if !workspace::apply_config_snapshot(&self.plan.source, &self.plan.workdir)? {
            tracing::warn!(
                tenant = %self.plan.tenant,
                "Config source missing, runtime env left as is"
            );
        }

        self.supervisor
            .spawn(&self.plan.tenant, &self.plan.workdir, self.plan.port)
            .await?;
        self.restarts.fetch_add(1, Ordering::SeqCst);

        tracing::info!(tenant = %self.plan.tenant, "Worker restarted");
        Ok(())
    }
}
