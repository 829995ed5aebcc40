use crate::error::{HatcheryError, Result};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};

/// Unique identifier for a tenant
///
/// Tenant ids double as directory names under the data dir, so the
/// accepted alphabet is restricted at construction time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

const TENANT_ID_MAX_LEN: usize = 64;

impl TenantId {
    /// Validate and construct a tenant id
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.is_empty() {
            return Err(HatcheryError::InvalidTenantId(
                "tenant id is empty".to_string(),
            ));
        }
        if raw.len() > TENANT_ID_MAX_LEN {
            return Err(HatcheryError::InvalidTenantId(format!(
                "tenant id exceeds {} characters",
                TENANT_ID_MAX_LEN
            )));
        }
        if !raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        {
            return Err(HatcheryError::InvalidTenantId(format!(
                "tenant id contains invalid characters: {}",
                raw
            )));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// In-memory handle to one live worker process
///
/// Handles exist only while the supervisor believes the process is alive;
/// they are removed by kill, by the exit reaper, or by a probe that finds
/// the pid gone or reused.
#[derive(Debug, Clone)]
pub struct WorkerHandle {
    pub tenant: TenantId,
    pub pid: u32,
    pub port: u16,
    pub spawned_at: SystemTime,
    /// OS-reported start time of the pid (seconds since epoch), used to
    /// tell a reused pid apart from the worker we spawned
    pub os_start_time: Option<u64>,
}

impl WorkerHandle {
    pub fn uptime(&self) -> Duration {
        SystemTime::now()
            .duration_since(self.spawned_at)
            .unwrap_or(Duration::from_secs(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_tenant_ids() {
        for raw in ["t1", "tenant-42", "a.b_c", "491701234567"] {
            assert!(TenantId::parse(raw).is_ok(), "rejected {}", raw);
        }
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert!(matches!(
            TenantId::parse(""),
            Err(HatcheryError::InvalidTenantId(_))
        ));
    }

    #[test]
    fn test_parse_rejects_path_separators() {
        for raw in ["../evil", "a/b", "a\\b", "a b"] {
            assert!(
                matches!(TenantId::parse(raw), Err(HatcheryError::InvalidTenantId(_))),
                "accepted {}",
                raw
            );
        }
    }

    #[test]
    fn test_parse_rejects_overlong() {
        let raw = "x".repeat(TENANT_ID_MAX_LEN + 1);
        assert!(matches!(
            TenantId::parse(&raw),
            Err(HatcheryError::InvalidTenantId(_))
        ));
    }
}
