use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use ulid::Ulid;

use crate::errors::Error;
use crate::session::UserId;
use crate::uploads::{NewUpload, UploadRecord};

use super::{DocumentStore, StoreClock};

#[derive(Default)]
pub struct MemoryDocumentStore {
    partitions: Mutex<HashMap<UserId, Vec<UploadRecord>>>,
    clock: StoreClock,
    writes: AtomicUsize,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful appends across all users.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn append(&self, user_id: &UserId, upload: NewUpload) -> Result<UploadRecord, Error> {
        let mut partitions = self.partitions.lock().map_err(|e| Error::StoreWriteFailed {
            reason: e.to_string(),
        })?;

        let record = UploadRecord {
            id: Ulid::new().to_string(),
            file_name: upload.file_name,
            timestamp: Some(self.clock.next()),
            data: upload.data,
        };

        partitions
            .entry(user_id.clone())
            .or_default()
            .push(record.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);

        Ok(record)
    }

    async fn list(&self, user_id: &UserId) -> Result<Vec<UploadRecord>, Error> {
        let partitions = self.partitions.lock().map_err(|e| Error::StoreReadFailed {
            reason: e.to_string(),
        })?;

        Ok(partitions.get(user_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uploads::PrescriptionRecord;

    fn upload(name: &str) -> NewUpload {
        NewUpload::new(name.to_string(), PrescriptionRecord::default())
    }

    #[tokio::test]
    async fn partitions_are_isolated_per_user() {
        let store = MemoryDocumentStore::new();
        let alice = UserId::from("alice");
        let bob = UserId::from("bob");

        store.append(&alice, upload("a.jpg")).await.unwrap();
        store.append(&alice, upload("b.jpg")).await.unwrap();
        store.append(&bob, upload("c.jpg")).await.unwrap();

        assert_eq!(store.list(&alice).await.unwrap().len(), 2);
        assert_eq!(store.list(&bob).await.unwrap().len(), 1);
        assert!(store.list(&UserId::from("carol")).await.unwrap().is_empty());
        assert_eq!(store.write_count(), 3);
    }

    #[tokio::test]
    async fn assigns_unique_ids_and_increasing_timestamps() {
        let store = MemoryDocumentStore::new();
        let user = UserId::from("alice");

        let first = store.append(&user, upload("a.jpg")).await.unwrap();
        let second = store.append(&user, upload("b.jpg")).await.unwrap();

        assert_ne!(first.id, second.id);
        assert!(second.timestamp > first.timestamp);
    }
}
