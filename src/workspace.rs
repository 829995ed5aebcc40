use crate::error::{HatcheryError, Result};
use crate::worker::TenantId;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

/// Name of the generated env file inside a workdir
pub const RUNTIME_ENV_FILE: &str = ".env";

/// Prepare a tenant workdir from the worker template
///
/// Copies the entry point and the dependency manifest into the workdir;
/// everything else in the template is ignored. The workdir is created if
/// missing and existing copies are overwritten. `fs::copy` carries file
/// permissions along, so the entry point stays executable.
pub fn prepare_workdir(
    template_dir: &Path,
    workdir: &Path,
    entry_point: &str,
    manifest: &str,
) -> Result<()> {
    if !template_dir.is_dir() {
        return Err(HatcheryError::WorkspaceError(format!(
            "Template directory not found: {}",
            template_dir.display()
        )));
    }

    fs::create_dir_all(workdir).map_err(|e| {
        HatcheryError::WorkspaceError(format!(
            "Failed to create workdir {}: {}",
            workdir.display(),
            e
        ))
    })?;

    for name in [entry_point, manifest] {
        let src = template_dir.join(name);
        if !src.is_file() {
            return Err(HatcheryError::WorkspaceError(format!(
                "Template file missing: {}",
                src.display()
            )));
        }
        fs::copy(&src, workdir.join(name)).map_err(|e| {
            HatcheryError::WorkspaceError(format!("Failed to copy {}: {}", src.display(), e))
        })?;
    }

    Ok(())
}

/// Render the generated worker configuration as plain key=value lines
pub fn render_env(tenant: &TenantId, session_secret: &str, port: u16, run_mode: &str) -> String {
    format!(
        "TENANT_ID={}\nSESSION={}\nPORT={}\nRUN_MODE={}\n",
        tenant, session_secret, port, run_mode
    )
}

/// Write an env file, creating parent directories as needed
pub fn write_env_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            HatcheryError::WorkspaceError(format!(
                "Failed to create {}: {}",
                parent.display(),
                e
            ))
        })?;
    }
    fs::write(path, contents).map_err(|e| {
        HatcheryError::WorkspaceError(format!("Failed to write {}: {}", path.display(), e))
    })
}

/// Copy the tenant's external config source into its runtime directory
///
/// Returns `Ok(false)` when the source does not exist; the previous runtime
/// env file, if any, is left untouched in that case.
pub fn apply_config_snapshot(source: &Path, workdir: &Path) -> Result<bool> {
    if !source.is_file() {
        return Ok(false);
    }

    let dest = workdir.join(RUNTIME_ENV_FILE);
    fs::copy(source, &dest).map_err(|e| {
        HatcheryError::WorkspaceError(format!(
            "Failed to apply config snapshot to {}: {}",
            dest.display(),
            e
        ))
    })?;

    Ok(true)
}

/// Short fingerprint of a session secret, safe to persist
///
/// The stored record must never contain the secret itself, so the
/// fingerprint is a truncated SHA-256 of it.
pub fn session_fingerprint(secret: &str) -> String {
    let digest = Sha256::digest(secret.as_bytes());
    digest.iter().take(8).map(|b| format!("{:02x}", b)).collect()
}
