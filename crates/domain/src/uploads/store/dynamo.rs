use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::{error::DisplayErrorContext, types::AttributeValue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::errors::Error;
use crate::session::UserId;
use crate::uploads::{NewUpload, PrescriptionRecord, UploadRecord};

use super::{DocumentStore, StoreClock};

type Item = HashMap<String, AttributeValue>;

/// Table row. Partition key `user_id`, sort key `id`; the prescription is
/// kept as a JSON string so it round-trips exactly as the OCR service sent it.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
struct UploadItem {
    user_id: String,
    id: String,
    file_name: String,
    timestamp: Option<DateTime<Utc>>,
    data: String, // JSON
}

impl UploadItem {
    fn into_record(self) -> Result<UploadRecord, Error> {
        let data: PrescriptionRecord =
            serde_json::from_str(&self.data).map_err(|e| Error::StoreReadFailed {
                reason: format!("record {}: {}", self.id, e),
            })?;

        Ok(UploadRecord {
            id: self.id,
            file_name: self.file_name,
            timestamp: self.timestamp,
            data,
        })
    }
}

pub struct DynamoDocumentStore {
    client: aws_sdk_dynamodb::Client,
    table: String,
    clock: StoreClock,
}

impl DynamoDocumentStore {
    pub fn new(client: aws_sdk_dynamodb::Client, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
            clock: StoreClock::default(),
        }
    }
}

#[async_trait]
impl DocumentStore for DynamoDocumentStore {
    async fn append(&self, user_id: &UserId, upload: NewUpload) -> Result<UploadRecord, Error> {
        let row = UploadItem {
            user_id: user_id.to_string(),
            id: Ulid::new().to_string(),
            file_name: upload.file_name.clone(),
            timestamp: Some(self.clock.next()),
            data: serde_json::to_string(&upload.data).map_err(|e| Error::StoreWriteFailed {
                reason: e.to_string(),
            })?,
        };

        let item: Item = serde_dynamo::to_item(&row).map_err(|e| Error::StoreWriteFailed {
            reason: e.to_string(),
        })?;

        // Records are immutable: never overwrite an existing id.
        self.client
            .put_item()
            .table_name(&self.table)
            .set_item(Some(item))
            .condition_expression("attribute_not_exists(id)")
            .send()
            .await
            .map_err(|e| Error::StoreWriteFailed {
                reason: DisplayErrorContext(&e).to_string(),
            })?;

        Ok(UploadRecord {
            id: row.id,
            file_name: row.file_name,
            timestamp: row.timestamp,
            data: upload.data,
        })
    }

    async fn list(&self, user_id: &UserId) -> Result<Vec<UploadRecord>, Error> {
        let mut items: Vec<Item> = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let output = self
                .client
                .query()
                .table_name(&self.table)
                .key_condition_expression("user_id = :uid")
                .expression_attribute_values(":uid", AttributeValue::S(user_id.to_string()))
                .set_exclusive_start_key(start_key)
                .send()
                .await
                .map_err(|e| Error::StoreReadFailed {
                    reason: DisplayErrorContext(&e).to_string(),
                })?;

            items.extend(output.items.unwrap_or_default());

            match output.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        tracing::info!("Loaded {} upload items for {}", items.len(), user_id);

        rows_to_records(items)
    }
}

fn rows_to_records(items: Vec<Item>) -> Result<Vec<UploadRecord>, Error> {
    let rows: Vec<UploadItem> =
        serde_dynamo::from_items(items).map_err(|e| Error::StoreReadFailed {
            reason: e.to_string(),
        })?;

    rows.into_iter().map(UploadItem::into_record).collect()
}
