use crate::error::Result;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};

/// Keeps the on-disk directory skeleton alive
///
/// `ensure_structure` is idempotent, so it can run at startup and again
/// every time the watch loop notices a root has gone missing.
pub struct StructureGuardian {
    roots: Vec<PathBuf>,
    interval: Duration,
}

impl StructureGuardian {
    pub fn new(roots: Vec<PathBuf>, interval: Duration) -> Self {
        Self { roots, interval }
    }

    /// Create every guarded root, including parents
    ///
    /// `create_dir_all` succeeds when the directory already exists, so
    /// concurrent callers cannot race each other into an error.
    pub fn ensure_structure(&self) -> Result<()> {
        for root in &self.roots {
            fs::create_dir_all(root)?;
        }
        Ok(())
    }

    /// Poll the guarded roots and recreate any that disappear
    pub async fn run(self) {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            if self.roots.iter().any(|root| !root.exists()) {
                tracing::warn!("Guarded directory missing, recreating structure");
                if let Err(e) = self.ensure_structure() {
                    tracing::error!("Failed to recreate directory structure: {}", e);
                }
            }
        }
    }
}
