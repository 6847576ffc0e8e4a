//! Daily usage ledger
//!
//! Appends one JSON line per completed request to
//! `cost_log_YYYY-MM-DD.jsonl` and can summarise a day by model.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

use crate::utils::error::Result;

/// One ledger line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub timestamp: DateTime<Utc>,
    pub request_id: String,
    pub kind: String,
    pub model_choice: String,
    pub provider: String,
    pub model: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub cost: f64,
    pub latency_ms: u64,
}

/// Per-model aggregate within a day
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelUsage {
    pub requests: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost: f64,
}

/// Summary of one day of the ledger
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
    pub date: String,
    pub total_requests: u64,
    pub total_cost: f64,
    pub by_model: HashMap<String, ModelUsage>,
}

/// Append-only JSONL ledger stored in a directory
#[derive(Debug)]
pub struct UsageLedger {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl UsageLedger {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_for(&self, date: NaiveDate) -> PathBuf {
        self.dir
            .join(format!("cost_log_{}.jsonl", date.format("%Y-%m-%d")))
    }

    /// Append an entry to the file of the entry's day
    pub async fn record(&self, entry: &LedgerEntry) -> Result<()> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        tokio::fs::create_dir_all(&self.dir).await?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.file_for(entry.timestamp.date_naive()))
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    /// Aggregate a day's entries by model choice
    pub async fn daily_summary(&self, date: NaiveDate) -> Result<DailySummary> {
        let mut summary = DailySummary {
            date: date.format("%Y-%m-%d").to_string(),
            ..Default::default()
        };

        let content = match tokio::fs::read_to_string(self.file_for(date)).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(summary),
            Err(e) => return Err(e.into()),
        };

        for line in content.lines().filter(|l| !l.trim().is_empty()) {
            let entry: LedgerEntry = match serde_json::from_str(line) {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping malformed ledger line: {}", e);
                    continue;
                }
            };
            let usage = summary.by_model.entry(entry.model_choice).or_default();
            usage.requests += 1;
            usage.input_tokens += u64::from(entry.input_tokens);
            usage.output_tokens += u64::from(entry.output_tokens);
            usage.cost += entry.cost;
            summary.total_requests += 1;
            summary.total_cost += entry.cost;
        }

        Ok(summary)
    }
}
