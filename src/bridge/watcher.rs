// Nyseal — Trace watcher
//
// Polls a directory for new `trace_*.json` files and feeds each one, as a
// QueryPacket, to the shared Bridge. Files already present when the watcher
// starts are never processed. A file that cannot be read or parsed is left
// unseen and retried on the next poll.

use std::collections::HashSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use super::{Bridge, QueryPacket, QueryResponse};

pub const DEFAULT_TRACE_DIR: &str = "traces";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

const TRACE_PREFIX: &str = "trace_";
const TRACE_SUFFIX: &str = ".json";

#[derive(Debug, Clone)]
pub struct HandledTrace {
    pub file: String,
    pub response: QueryResponse,
}

pub struct TraceWatcher {
    dir: PathBuf,
    interval: Duration,
    bridge: Arc<Bridge>,
    seen: HashSet<String>,
}

impl TraceWatcher {
    pub fn new(dir: impl Into<PathBuf>, bridge: Arc<Bridge>) -> Self {
        Self {
            dir: dir.into(),
            interval: DEFAULT_POLL_INTERVAL,
            bridge,
            seen: HashSet::new(),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Creates the directory if needed and marks every existing entry as seen.
    pub async fn prime(&mut self) -> std::io::Result<()> {
        if !tokio::fs::try_exists(&self.dir).await? {
            tokio::fs::create_dir_all(&self.dir).await?;
            return Ok(());
        }
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if let Some(name) = entry.file_name().to_str() {
                self.seen.insert(name.to_string());
            }
        }
        tracing::debug!(dir = %self.dir.display(), existing = self.seen.len(), "Trace watcher primed");
        Ok(())
    }

    /// One scan: handles new trace files in name order.
    pub async fn poll_once(&mut self) -> std::io::Result<Vec<HandledTrace>> {
        let mut fresh = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if is_trace_file(&name) && !self.seen.contains(&name) {
                fresh.push(name);
            }
        }
        fresh.sort();

        let mut handled = Vec::with_capacity(fresh.len());
        for file in fresh {
            let path = self.dir.join(&file);
            match read_packet(&path).await {
                Ok(packet) => {
                    tracing::info!(file = %file, "New trace loaded");
                    let response = self.bridge.handle_packet(&packet);
                    self.seen.insert(file.clone());
                    handled.push(HandledTrace { file, response });
                }
                Err(e) => {
                    tracing::warn!(file = %file, "Error reading trace: {}", e);
                }
            }
        }
        Ok(handled)
    }

    /// Primes, then polls until `shutdown` resolves.
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) -> std::io::Result<()> {
        self.prime().await?;
        tracing::info!(
            dir = %self.dir.display(),
            interval_ms = self.interval.as_millis() as u64,
            "Monitoring trace directory"
        );

        let mut ticker = tokio::time::interval(self.interval);
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Trace watcher stopped");
                    return Ok(());
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.poll_once().await {
                        tracing::error!(dir = %self.dir.display(), "Directory scan failed: {}", e);
                    }
                }
            }
        }
    }
}

fn is_trace_file(name: &str) -> bool {
    name.starts_with(TRACE_PREFIX) && name.ends_with(TRACE_SUFFIX)
}

async fn read_packet(path: &Path) -> Result<QueryPacket, Box<dyn std::error::Error + Send + Sync>> {
    let text = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&text)?)
}
