use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One transcribed chunk. Appended in dequeue order, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    /// When the chunk was captured
    pub timestamp: DateTime<Utc>,

    /// Name of the scratch audio file the text came from (audit trail;
    /// the file itself is deleted once the entry exists)
    pub filename: String,

    /// Concatenated transcript text for the chunk
    pub text: String,

    /// Error hit while reading the fragment stream, if any; the text above
    /// holds whatever was received before the failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The persisted record of one capture session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTranscript {
    pub session_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub transcriptions: Vec<TranscriptEntry>,
}

impl SessionTranscript {
    pub fn new() -> Self {
        Self {
            session_id: format!("session-{}", uuid::Uuid::new_v4()),
            start_time: Utc::now(),
            end_time: None,
            transcriptions: Vec::new(),
        }
    }

    /// Deterministic transcript filename derived from the start time.
    pub fn file_name(&self) -> String {
        format!(
            "transcript-{}.json",
            self.start_time.format("%Y%m%d-%H%M%S")
        )
    }

    /// Serialize to pretty JSON and write into `dir`, returning the path.
    pub async fn save_to(&self, dir: &Path) -> Result<PathBuf> {
        let data = serde_json::to_vec_pretty(self).context("failed to serialize session")?;

        let path = dir.join(self.file_name());
        tokio::fs::write(&path, data)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;

        Ok(path)
    }
}

impl Default for SessionTranscript {
    fn default() -> Self {
        Self::new()
    }
}
