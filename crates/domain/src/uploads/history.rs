use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{PrescriptionRecord, Scalar, UploadRecord};

pub const EMPTY_HISTORY: &str = "No uploads yet.";
pub const UNKNOWN_TIME: &str = "Unknown time";

/// One line of the history list
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct HistoryEntry {
    pub index: usize,
    pub id: String,
    pub file_name: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub uploaded_at: String,
    pub diagnosis: Option<Scalar>,
}

/// Projection of an ordered history; selection hands out the stored record as is
#[derive(Clone, Copy, Debug)]
pub struct HistoryView<'a> {
    records: &'a [UploadRecord],
}

impl<'a> HistoryView<'a> {
    pub fn new(records: &'a [UploadRecord]) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.records
            .iter()
            .enumerate()
            .map(|(index, record)| HistoryEntry {
                index,
                id: record.id.clone(),
                file_name: record.file_name.clone(),
                timestamp: record.timestamp,
                uploaded_at: record
                    .timestamp
                    .map(|t| t.to_rfc2822())
                    .unwrap_or_else(|| UNKNOWN_TIME.to_string()),
                diagnosis: record.data.diagnosis.clone(),
            })
            .collect()
    }

    pub fn select(&self, index: usize) -> Option<&'a PrescriptionRecord> {
        self.records.get(index).map(|record| &record.data)
    }
}

impl fmt::Display for HistoryView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return writeln!(f, "{}", EMPTY_HISTORY);
        }
        for entry in self.entries() {
            write!(f, "[{}] File: {} ({})", entry.index, entry.file_name, entry.uploaded_at)?;
            if let Some(diagnosis) = &entry.diagnosis {
                write!(f, " - {}", diagnosis)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
