//! Raw CSV input.
//!
//! The input file is the crawler's raw export: one press release per row,
//! UTF-8 with an optional BOM. Each row yields a [`CandidateRecord`] and its
//! [`ArticleMetadata`]. The crawler's company-profile columns are ignored,
//! since profiles are fetched fresh.

use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument, warn};

use crate::models::{ArticleMetadata, CandidateRecord};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Read candidate records from a CSV file, in file order.
#[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
pub async fn read_candidates(path: impl AsRef<Path>) -> Result<Vec<CandidateRecord>, Box<dyn Error>> {
    let bytes = fs::read(path.as_ref()).await?;
    let records = parse_candidates(&bytes)?;
    info!(count = records.len(), "Loaded candidate records");
    Ok(records)
}

/// Parse CSV bytes. Rows without an id get their 1-based position, zero-padded.
/// Rows shorter than the header are padded with empty cells.
pub fn parse_candidates(bytes: &[u8]) -> Result<Vec<CandidateRecord>, csv::Error> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers = reader.headers()?.clone();
    let mut records = Vec::new();
    for (i, row) in reader.records().enumerate() {
        let mut row = row?;
        // Short rows read as if the missing trailing cells were empty.
        while row.len() < headers.len() {
            row.push_field("");
        }
        let mut record: CandidateRecord = row.deserialize(Some(&headers))?;
        record.metadata = row.deserialize::<ArticleMetadata>(Some(&headers))?;
        if record.id.is_empty() {
            record.id = format!("{:04}", i + 1);
        }
        if record.title.is_empty() {
            warn!(id = %record.id, "Row has an empty title");
        }
        records.push(record);
    }
    Ok(records)
}
