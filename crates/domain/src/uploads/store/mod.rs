use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::errors::Error;
use crate::session::UserId;

use super::{NewUpload, UploadRecord};

/// DynamoDB-backed store
pub mod dynamo;

/// In-process store for local runs
pub mod memory;

pub use dynamo::DynamoDocumentStore;
pub use memory::MemoryDocumentStore;

/// Per-user collection of immutable upload records.
///
/// Writes append exactly one record and assign its id and timestamp. Reads
/// return every record in the user's partition in no particular order.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn append(&self, user_id: &UserId, upload: NewUpload) -> Result<UploadRecord, Error>;

    async fn list(&self, user_id: &UserId) -> Result<Vec<UploadRecord>, Error>;
}

/// Hands out strictly increasing timestamps, even when the wall clock stalls
/// or steps backwards.
#[derive(Default)]
pub struct StoreClock {
    last: Mutex<Option<DateTime<Utc>>>,
}

impl StoreClock {
    pub fn next(&self) -> DateTime<Utc> {
        let now = Utc::now();
        let mut last = match self.last.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let next = match *last {
            Some(prev) if now <= prev => prev + Duration::microseconds(1),
            _ => now,
        };
        *last = Some(next);
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_is_strictly_increasing() {
        let clock = StoreClock::default();
        let mut prev = clock.next();
        for _ in 0..1000 {
            let next = clock.next();
            assert!(next > prev);
            prev = next;
        }
    }
}
