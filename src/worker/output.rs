use crate::worker::TenantId;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{ChildStderr, ChildStdout};

/// Forward a worker's stdout to the log sink, one line at a time, tagged
/// with the owning tenant
pub(crate) fn forward_stdout(tenant: TenantId, stdout: ChildStdout) {
    tokio::spawn(async move {
        let mut reader = BufReader::new(stdout);
        let mut line = String::new();

        loop {
            match reader.read_line(&mut line).await {
                Ok(0) => {
                    // EOF - worker closed stdout
                    break;
                }
                Ok(_) => {
                    tracing::info!(tenant = %tenant, "{}", line.trim_end());
                    line.clear();
                }
                Err(_) => {
                    // Read error - worker may have exited
                    break;
                }
            }
        }
    });
}

/// Forward a worker's stderr to the log sink, tagged with the owning tenant
pub(crate) fn forward_stderr(tenant: TenantId, stderr: ChildStderr) {
    tokio::spawn(async move {
        let mut reader = BufReader::new(stderr);
        let mut line = String::new();

        loop {
            match reader.read_line(&mut line).await {
                Ok(0) => {
                    break;
                }
                Ok(_) => {
                    tracing::warn!(tenant = %tenant, "{}", line.trim_end());
                    line.clear();
                }
                Err(_) => {
                    break;
                }
            }
        }
    });
}
