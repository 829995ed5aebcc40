use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// A change observed on a watched config file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigChanged;

/// Cheap identity of a file, compared between polls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileIdentity {
    len: u64,
    modified: Option<SystemTime>,
    ino: u64,
}

impl FileIdentity {
    fn for_path(path: &Path) -> Option<Self> {
        let meta = std::fs::metadata(path).ok()?;
        Some(Self {
            len: meta.len(),
            modified: meta.modified().ok(),
            ino: meta.ino(),
        })
    }
}

/// Polling watcher for one external config file
///
/// Compares the file identity (length, mtime, inode) on every poll tick
/// and emits one event per observed transition. A file appearing counts as
/// a change; a file disappearing alone does not. The identity present when
/// the watcher starts is the baseline, so pre-existing content never
/// triggers an event.
pub struct ConfigWatcher {
    path: PathBuf,
    interval: Duration,
}

impl ConfigWatcher {
    pub fn new<P: AsRef<Path>>(path: P, interval: Duration) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            interval,
        }
    }

    /// Start the poll loop; change events arrive on the returned channel
    ///
    /// The loop ends when the receiving side is dropped.
    pub fn spawn(self) -> (mpsc::Receiver<ConfigChanged>, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(16);
        let handle = tokio::spawn(self.run(tx));
        (rx, handle)
    }

    async fn run(self, tx: mpsc::Sender<ConfigChanged>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut last = FileIdentity::for_path(&self.path);

        loop {
            ticker.tick().await;

            let current = FileIdentity::for_path(&self.path);
            let changed = match (last, current) {
                (Some(prev), Some(next)) => prev != next,
                (None, Some(_)) => true,
                _ => false,
            };
            last = current;

            if changed && tx.send(ConfigChanged).await.is_err() {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;
    use tokio::time::timeout;

    const POLL: Duration = Duration::from_millis(20);
    const WAIT: Duration = Duration::from_secs(2);

    #[tokio::test]
    async fn test_emits_on_content_change() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t1.env");
        fs::write(&path, "PORT=5001\n").unwrap();

        let (mut rx, handle) = ConfigWatcher::new(&path, POLL).spawn();

        // Let the watcher take its baseline before mutating
        tokio::time::sleep(Duration::from_millis(100)).await;
        fs::write(&path, "PORT=5001\nRUN_MODE=staging\n").unwrap();

        let event = timeout(WAIT, rx.recv()).await;
        assert!(matches!(event, Ok(Some(ConfigChanged))));

        drop(rx);
        let _ = handle.await;
    }

    #[tokio::test]
    async fn test_emits_on_appearance() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t1.env");

        let (mut rx, handle) = ConfigWatcher::new(&path, POLL).spawn();

        tokio::time::sleep(Duration::from_millis(100)).await;
        fs::write(&path, "PORT=5001\n").unwrap();

        let event = timeout(WAIT, rx.recv()).await;
        assert!(matches!(event, Ok(Some(ConfigChanged))));

        drop(rx);
        let _ = handle.await;
    }

    #[tokio::test]
    async fn test_silent_on_deletion() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t1.env");
        fs::write(&path, "PORT=5001\n").unwrap();

        let (mut rx, handle) = ConfigWatcher::new(&path, POLL).spawn();

        tokio::time::sleep(Duration::from_millis(100)).await;
        fs::remove_file(&path).unwrap();

        let event = timeout(Duration::from_millis(300), rx.recv()).await;
        assert!(event.is_err(), "deletion alone must not emit a change");

        drop(rx);
        let _ = handle.await;
    }

    #[tokio::test]
    async fn test_unchanged_file_stays_silent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t1.env");
        fs::write(&path, "PORT=5001\n").unwrap();

        let (mut rx, handle) = ConfigWatcher::new(&path, POLL).spawn();

        let event = timeout(Duration::from_millis(300), rx.recv()).await;
        assert!(event.is_err());

        drop(rx);
        let _ = handle.await;
    }
}
