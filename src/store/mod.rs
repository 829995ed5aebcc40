// Store module - durable per-tenant deployment records

use crate::error::{HatcheryError, Result};
use crate::worker::{TenantId, WorkerSupervisor};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Lifecycle status recorded for an instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceStatus {
    Starting,
    Online,
    Offline,
    Stopped,
    Failed,
}

impl std::fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstanceStatus::Starting => write!(f, "starting"),
            InstanceStatus::Online => write!(f, "online"),
            InstanceStatus::Offline => write!(f, "offline"),
            InstanceStatus::Stopped => write!(f, "stopped"),
            InstanceStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Durable record of one deployment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceRecord {
    pub tenant_id: TenantId,
    pub port: u16,
    /// Redacted fingerprint of the session secret, never the secret itself
    pub session_hash: String,
    pub status: InstanceStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_status_update: Option<DateTime<Utc>>,
}

/// The complete persisted document
///
/// Read in full on every access and rewritten in full on every mutation.
/// The layout carries no schema version field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceDocument {
    pub instances: Vec<InstanceRecord>,
    pub total_deployed: u64,
    pub created_at: DateTime<Utc>,
}

impl InstanceDocument {
    pub fn new() -> Self {
        Self {
            instances: Vec::new(),
            total_deployed: 0,
            created_at: Utc::now(),
        }
    }

    /// Validate the document structure
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for record in &self.instances {
            if !seen.insert(&record.tenant_id) {
                return Err(HatcheryError::StateCorruption(format!(
                    "Duplicate tenant found: {}",
                    record.tenant_id
                )));
            }
        }
        Ok(())
    }
}

impl Default for InstanceDocument {
    fn default() -> Self {
        Self::new()
    }
}

/// Live view of a record, with status and uptime merged from the supervisor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceView {
    pub tenant_id: TenantId,
    pub port: u16,
    pub status: InstanceStatus,
    pub uptime: Duration,
    pub created_at: DateTime<Utc>,
    pub last_status_update: Option<DateTime<Utc>>,
}

/// Aggregate statistics over every record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentStats {
    pub total_deployed: u64,
    pub current_instances: usize,
    pub online: usize,
    pub offline: usize,
    pub instances: Vec<InstanceView>,
}

/// Durable tenant-to-record mapping over one JSON document
///
/// Every operation runs a full load-mutate-save cycle; an internal lock
/// serializes those cycles within this process. Nothing guards the file
/// against concurrent writers in other processes.
pub struct InstanceStore {
    path: PathBuf,
    supervisor: WorkerSupervisor,
    lock: Mutex<()>,
}

impl InstanceStore {
    /// Create a store over the given document path
    ///
    /// Reads merge live status from the supervisor; a missing document
    /// reads as empty until the first mutation creates it.
    pub fn new<P: AsRef<Path>>(path: P, supervisor: WorkerSupervisor) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            supervisor,
            lock: Mutex::new(()),
        }
    }

    /// Record a new deployment for a tenant
    ///
    /// Fails with `TenantExists` when a record is already present. The
    /// lifetime deployment counter goes up exactly once per successful add.
    pub fn add(&self, tenant: &TenantId, port: u16, session_hash: &str) -> Result<InstanceRecord> {
        let _guard = self.lock();
        let mut doc = self.load()?;

        if doc.instances.iter().any(|r| r.tenant_id == *tenant) {
            return Err(HatcheryError::TenantExists(tenant.to_string()));
        }

        let record = InstanceRecord {
            tenant_id: tenant.clone(),
            port,
            session_hash: session_hash.to_string(),
            status: InstanceStatus::Starting,
            created_at: Utc::now(),
            last_status_update: None,
        };

        doc.instances.push(record.clone());
        doc.total_deployed += 1;
        self.save(&doc)?;

        Ok(record)
    }

    /// Set the persisted status of a tenant's record
    pub fn update_status(&self, tenant: &TenantId, status: InstanceStatus) -> Result<()> {
        let _guard = self.lock();
        let mut doc = self.load()?;

        let record = doc
            .instances
            .iter_mut()
            .find(|r| r.tenant_id == *tenant)
            .ok_or_else(|| HatcheryError::TenantNotFound(tenant.to_string()))?;

        record.status = status;
        record.last_status_update = Some(Utc::now());
        self.save(&doc)
    }

    /// Fetch a tenant's record merged with its live worker state
    pub fn get(&self, tenant: &TenantId) -> Result<InstanceView> {
        let _guard = self.lock();
        let doc = self.load()?;

        let record = doc
            .instances
            .iter()
            .find(|r| r.tenant_id == *tenant)
            .ok_or_else(|| HatcheryError::TenantNotFound(tenant.to_string()))?;

        Ok(self.merge(record))
    }

    /// Delete a tenant's record
    ///
    /// The lifetime deployment counter is left untouched: it counts
    /// deployments ever made, not records currently held.
    pub fn remove(&self, tenant: &TenantId) -> Result<()> {
        let _guard = self.lock();
        let mut doc = self.load()?;

        let before = doc.instances.len();
        doc.instances.retain(|r| r.tenant_id != *tenant);
        if doc.instances.len() == before {
            return Err(HatcheryError::TenantNotFound(tenant.to_string()));
        }

        self.save(&doc)
    }

    /// Aggregate statistics with one live probe per record
    pub fn stats(&self) -> Result<DeploymentStats> {
        let _guard = self.lock();
        let doc = self.load()?;

        let views: Vec<InstanceView> = doc.instances.iter().map(|r| self.merge(r)).collect();
        let online = views
            .iter()
            .filter(|v| v.status == InstanceStatus::Online)
            .count();

        Ok(DeploymentStats {
            total_deployed: doc.total_deployed,
            current_instances: views.len(),
            online,
            offline: views.len() - online,
            instances: views,
        })
    }

    /// Whether a record exists for the tenant
    pub fn contains(&self, tenant: &TenantId) -> Result<bool> {
        let _guard = self.lock();
        let doc = self.load()?;
        Ok(doc.instances.iter().any(|r| r.tenant_id == *tenant))
    }

    /// Number of records currently held
    pub fn count(&self) -> Result<usize> {
        let _guard = self.lock();
        Ok(self.load()?.instances.len())
    }

    /// Every port currently assigned to a record
    pub fn assigned_ports(&self) -> Result<Vec<u16>> {
        let _guard = self.lock();
        Ok(self.load()?.instances.iter().map(|r| r.port).collect())
    }

    /// Get the path to the document file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Merge one record with the supervisor's live view of its worker
    ///
    /// The merged status is online exactly when the probe says so; every
    /// other persisted status reads as offline. Uptime is zero for a
    /// worker that is not running.
    fn merge(&self, record: &InstanceRecord) -> InstanceView {
        let online = self.supervisor.probe(&record.tenant_id);
        let uptime = if online {
            self.supervisor
                .handle(&record.tenant_id)
                .map(|h| h.uptime())
                .unwrap_or(Duration::from_secs(0))
        } else {
            Duration::from_secs(0)
        };

        InstanceView {
            tenant_id: record.tenant_id.clone(),
            port: record.port,
            status: if online {
                InstanceStatus::Online
            } else {
                InstanceStatus::Offline
            },
            uptime,
            created_at: record.created_at,
            last_status_update: record.last_status_update,
        }
    }

    /// Load the document from disk
    fn load(&self) -> Result<InstanceDocument> {
        // A missing document reads as empty
        if !self.path.exists() {
            return Ok(InstanceDocument::new());
        }

        let file = File::open(&self.path).map_err(|e| {
            HatcheryError::StateLoadError(format!("Failed to open instance document: {}", e))
        })?;
        let reader = BufReader::new(file);

        let doc: InstanceDocument = serde_json::from_reader(reader).map_err(|e| {
            HatcheryError::StateLoadError(format!("Failed to parse instance document: {}", e))
        })?;

        doc.validate()?;

        Ok(doc)
    }

    /// Save the document to disk with an atomic write
    fn save(&self, doc: &InstanceDocument) -> Result<()> {
        doc.validate()?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                HatcheryError::StateSaveError(format!("Failed to create data directory: {}", e))
            })?;
        }

        // Write to a temporary file first, then rename over the document
        let temp_path = self.path.with_extension("tmp");

        {
            let file = File::create(&temp_path).map_err(|e| {
                HatcheryError::StateSaveError(format!("Failed to create temp document: {}", e))
            })?;
            let mut writer = BufWriter::new(file);

            serde_json::to_writer_pretty(&mut writer, doc).map_err(|e| {
                HatcheryError::StateSaveError(format!("Failed to serialize document: {}", e))
            })?;

            writer.flush().map_err(|e| {
                HatcheryError::StateSaveError(format!("Failed to flush document: {}", e))
            })?;
        }

        fs::rename(&temp_path, &self.path).map_err(|e| {
            HatcheryError::StateSaveError(format!("Failed to rename temp document: {}", e))
        })?;

        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        // The guard protects no data of its own, so poisoning carries no
        // meaning here
        self.lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
