use std::io;

use serde::Serialize;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::classify::Risk;
use crate::config::AuditConfig;
use crate::gate::{Decision, Outcome};

/// One line in the audit trail. Serialized as a single JSON object per
/// terminal outcome, whether or not the command ever ran.
#[derive(Debug, Serialize)]
pub struct AuditEntry {
    /// RFC 3339, UTC.
    pub timestamp: String,
    pub task: String,
    pub command: String,
    pub risk: Risk,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched: Option<String>,
    pub decision: Decision,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
}

enum AuditDestination {
    Stdout,
    File(Mutex<File>),
}

/// Appends audit entries as JSON lines, either to the `audit` tracing
/// target or to a file.
pub struct AuditLogger {
    destination: AuditDestination,
}

impl AuditLogger {
    /// # Errors
    ///
    /// Returns an error if the destination file cannot be opened.
    pub async fn from_config(config: &AuditConfig) -> io::Result<Self> {
        let destination = if config.destination == "stdout" {
            AuditDestination::Stdout
        } else {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&config.destination)
                .await?;
            AuditDestination::File(Mutex::new(file))
        };
        Ok(Self { destination })
    }

    /// Append one entry.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the file write fails. Callers
    /// decide whether that failure is fatal.
    pub async fn record(&self, entry: &AuditEntry) -> io::Result<()> {
        let json = serde_json::to_string(entry).map_err(io::Error::other)?;
        match &self.destination {
            AuditDestination::Stdout => {
                tracing::info!(target: "audit", "{json}");
            }
            AuditDestination::File(file) => {
                let mut file = file.lock().await;
                file.write_all(json.as_bytes()).await?;
                file.write_all(b"\n").await?;
                file.flush().await?;
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for AuditLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let dest = match &self.destination {
            AuditDestination::Stdout => "stdout",
            AuditDestination::File(_) => "file",
        };
        f.debug_struct("AuditLogger").field("destination", &dest).finish()
    }
}
