// Deploy module - ties ports, workspace, store and supervisor together

use crate::config::DeployerConfig;
use crate::error::{HatcheryError, Result};
use crate::ports::PortAllocator;
use crate::store::{DeploymentStats, InstanceStatus, InstanceStore, InstanceView};
use crate::worker::{TenantId, WorkerSupervisor};
use crate::workspace;
use serde::{Deserialize, Serialize};

/// Outcome of a successful deploy call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deployment {
    pub tenant: TenantId,
    pub port: u16,
    pub status: InstanceStatus,
}

/// Composition root for the deployment lifecycle
///
/// Owns the port allocator, the instance store and the worker supervisor;
/// every public operation maps to one call of the deployer contract.
pub struct Deployer {
    config: DeployerConfig,
    supervisor: WorkerSupervisor,
    store: InstanceStore,
    ports: PortAllocator,
}

impl Deployer {
    /// Build a deployer from a validated configuration
    ///
    /// The port allocator is seeded past every port already recorded in the
    /// store, so deployments survive a daemon restart without collisions.
    pub fn new(config: DeployerConfig) -> Result<Self> {
        let supervisor = WorkerSupervisor::new(config.entry_point.clone());
        let store = InstanceStore::new(config.state_path(), supervisor.clone());
        let ports = PortAllocator::new(config.base_port);
        for port in store.assigned_ports()? {
            ports.observe(port);
        }

        Ok(Self {
            config,
            supervisor,
            store,
            ports,
        })
    }

    /// Deploy a worker for a tenant
    ///
    /// Conflict and capacity are checked before any side effect. The record
    /// is persisted before the spawn attempt: a spawn failure marks it
    /// `failed` instead of deleting it, so failed attempts stay visible.
    pub async fn deploy(&self, tenant: &TenantId, session_secret: &str) -> Result<Deployment> {
        if self.store.contains(tenant)? {
            return Err(HatcheryError::TenantExists(tenant.to_string()));
        }

        let current = self.store.count()?;
        if current >= self.config.max_instances {
            return Err(HatcheryError::CapacityExceeded {
                limit: self.config.max_instances,
                current,
            });
        }

        let port = self.ports.allocate();
        let workdir = self.config.workdir(tenant);
        workspace::prepare_workdir(
            &self.config.template_dir,
            &workdir,
            &self.config.entry_point,
            &self.config.manifest,
        )?;

        let source = self.config.config_source(tenant);
        let env = workspace::render_env(tenant, session_secret, port, &self.config.run_mode);
        workspace::write_env_file(&source, &env)?;
        workspace::apply_config_snapshot(&source, &workdir)?;

        self.store
            .add(tenant, port, &workspace::session_fingerprint(session_secret))?;

        match self.supervisor.spawn(tenant, &workdir, port).await {
            Ok(handle) => {
                self.store.update_status(tenant, InstanceStatus::Online)?;
                tracing::info!(tenant = %tenant, port, pid = handle.pid, "Worker deployed");
                Ok(Deployment {
                    tenant: tenant.clone(),
                    port,
                    status: InstanceStatus::Online,
                })
            }
            Err(e) => {
                if let Err(mark) = self.store.update_status(tenant, InstanceStatus::Failed) {
                    tracing::error!(
                        tenant = %tenant,
                        "Failed to mark instance as failed: {}",
                        mark
                    );
                }
                tracing::error!(tenant = %tenant, "Worker spawn failed: {}", e);
                Err(e)
            }
        }
    }

    /// Terminate a tenant's worker and mark its record stopped
    pub fn stop(&self, tenant: &TenantId) -> Result<InstanceStatus> {
        if !self.store.contains(tenant)? {
            return Err(HatcheryError::TenantNotFound(tenant.to_string()));
        }

        if !self.supervisor.kill(tenant) {
            return Err(HatcheryError::StopFailed(
                tenant.to_string(),
                "worker was not running".to_string(),
            ));
        }

        self.store.update_status(tenant, InstanceStatus::Stopped)?;
        tracing::info!(tenant = %tenant, "Worker stopped");
        Ok(InstanceStatus::Stopped)
    }

    /// Merged view of a single tenant
    pub fn status(&self, tenant: &TenantId) -> Result<InstanceView> {
        self.store.get(tenant)
    }

    /// Aggregate stats over every record
    pub fn stats(&self) -> Result<DeploymentStats> {
        self.store.stats()
    }

    /// Drop a tenant's record, terminating its worker first if one is live
    ///
    /// The cumulative deployment counter is left untouched.
    pub fn remove(&self, tenant: &TenantId) -> Result<()> {
        if self.supervisor.kill(tenant) {
            tracing::info!(tenant = %tenant, "Terminated worker before removing record");
        }
        self.store.remove(tenant)?;
        tracing::info!(tenant = %tenant, "Instance record removed");
        Ok(())
    }

    pub fn supervisor(&self) -> &WorkerSupervisor {
        &self.supervisor
    }

    pub fn config(&self) -> &DeployerConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests;
