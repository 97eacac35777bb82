//! JSON output of a finished run.
//!
//! The document carries the run summary next to the records so downstream
//! tooling does not have to recount verdicts:
//!
//! ```text
//! {
//!   "generated_at": "2026-02-09T11:42:07+09:00",
//!   "summary": { "total": 20, "suitable": 7, ... },
//!   "records": [ { "record": {...}, "profile": {...}, "verdict": {...}, ... } ]
//! }
//! ```

use chrono::Local;
use serde::Serialize;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{error, info, instrument};

use crate::models::{EnrichedRecord, RunSummary};

#[derive(Debug, Serialize)]
struct RunReport<'a> {
    generated_at: String,
    summary: RunSummary,
    records: &'a [EnrichedRecord],
}

/// Serialize records (with their summary) to a pretty-printed JSON string.
pub fn to_json(records: &[EnrichedRecord]) -> Result<String, serde_json::Error> {
    let report = RunReport {
        generated_at: Local::now().to_rfc3339(),
        summary: RunSummary::from_records(records),
        records,
    };
    serde_json::to_string_pretty(&report)
}

/// Write the JSON report to `path`, creating parent directories as needed.
#[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
pub async fn write_json_file(
    path: impl AsRef<Path>,
    records: &[EnrichedRecord],
) -> Result<(), Box<dyn Error>> {
    let path = path.as_ref();
    let json = to_json(records)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = fs::create_dir_all(parent).await {
            error!(dir = %parent.display(), error = %e, "Failed to create JSON dir");
            return Err(e.into());
        }
    }

    fs::write(path, json).await?;
    info!(records = records.len(), "Wrote JSON report");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClassificationVerdict, UnclassifiedCause};
    use crate::test_support::candidate;
    use std::sync::Arc;

    fn records() -> Vec<EnrichedRecord> {
        vec![
            EnrichedRecord {
                record: Arc::new(candidate(1, "新商品発売")),
                profile: None,
                verdict: ClassificationVerdict::Suitable {
                    reason: "新商品".to_string(),
                },
                title_translated: None,
                company_name_translated: None,
                metadata_interpreted: None,
            },
            EnrichedRecord {
                record: Arc::new(candidate(2, "決算説明会")),
                profile: None,
                verdict: ClassificationVerdict::Unclassified {
                    cause: UnclassifiedCause::RateBudgetExhausted,
                },
                title_translated: None,
                company_name_translated: None,
                metadata_interpreted: None,
            },
        ]
    }

    #[test]
    fn test_report_shape() {
        let json = to_json(&records()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["summary"]["total"], 2);
        assert_eq!(value["summary"]["suitable"], 1);
        assert_eq!(value["summary"]["unclassified"], 1);
        assert_eq!(value["records"][0]["record"]["id"], "0001");
        assert_eq!(value["records"][0]["verdict"]["verdict"], "suitable");
        assert_eq!(value["records"][1]["verdict"]["verdict"], "unclassified");
        assert!(value["generated_at"].is_string());
    }

    #[tokio::test]
    async fn test_write_json_file_creates_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports/run.json");
        write_json_file(&path, &records()).await.unwrap();

        let text = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(text.contains("新商品発売"));
    }
}
