use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use derive_new::new;
use serde::{Deserialize, Serialize};

use crate::errors::Error;

use super::PrescriptionRecord;

/// Image selected by the user, validated before submission
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadFile {
    name: String,
    content_type: String,
    bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, Error> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::InvalidFile {
                reason: "No selected file".to_string(),
            });
        }
        if bytes.is_empty() {
            return Err(Error::InvalidFile {
                reason: format!("{} is empty", name),
            });
        }

        Ok(Self {
            name,
            content_type: "application/octet-stream".to_string(),
            bytes,
        })
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Record handed to the document store; id and timestamp are assigned there
#[derive(Clone, Debug, PartialEq, new)]
pub struct NewUpload {
    pub file_name: String,
    pub data: PrescriptionRecord,
}

/// One persisted upload
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UploadRecord {
    pub id: String,
    pub file_name: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub data: PrescriptionRecord,
}

/// Newest first. Records without a timestamp sort last; ties keep store order.
pub fn sort_newest_first(records: &mut [UploadRecord]) {
    records.sort_by(|a, b| match (&a.timestamp, &b.timestamp) {
        (Some(a), Some(b)) => b.cmp(a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn record(id: &str, secs: Option<i64>) -> UploadRecord {
        UploadRecord {
            id: id.to_string(),
            file_name: format!("{}.jpg", id),
            timestamp: secs.map(|s| Utc.timestamp_opt(s, 0).unwrap()),
            data: PrescriptionRecord::default(),
        }
    }

    #[test]
    fn rejects_empty_name() {
        let err = UploadFile::new("  ", vec![1, 2, 3]).unwrap_err();
        assert!(matches!(err, Error::InvalidFile { .. }));
    }

    #[test]
    fn rejects_empty_body() {
        let err = UploadFile::new("rx1.jpg", Vec::new()).unwrap_err();
        assert!(matches!(err, Error::InvalidFile { .. }));
    }

    #[test]
    fn sorts_descending_with_missing_timestamps_last() {
        let mut records = vec![
            record("a", Some(100)),
            record("b", None),
            record("c", Some(300)),
            record("d", Some(200)),
        ];

        sort_newest_first(&mut records);

        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "d", "a", "b"]);
        for pair in records.windows(2) {
            assert!(pair[0].timestamp >= pair[1].timestamp);
        }
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let json = serde_json::to_value(record("a", Some(1))).unwrap();
        assert_eq!(json["fileName"], "a.jpg");
        assert!(json.get("timestamp").is_some());
    }
}
