use std::sync::Arc;

use crate::errors::Error;
use crate::session::{SessionContext, UserId};

use super::{
    sort_newest_first, DocumentStore, HistoryView, NewUpload, OcrService, PrescriptionRecord,
    UploadFile, UploadRecord,
};

/// Result of a successful upload
#[derive(Clone, Debug, PartialEq)]
pub struct UploadOutcome {
    /// Parsed prescription, ready for display.
    pub record: PrescriptionRecord,
    /// Set when the record was stored but the history could not be reloaded.
    /// The cached history is stale until the next successful load.
    pub refresh_error: Option<Error>,
}

/// All of a user's records, newest first. Reads only.
pub async fn load_history(
    store: &dyn DocumentStore,
    user_id: &UserId,
) -> Result<Vec<UploadRecord>, Error> {
    let mut records = store.list(user_id).await?;
    sort_newest_first(&mut records);
    Ok(records)
}

/// Owns one user's submit-and-record workflow together with the cached
/// history list and the record currently on display.
///
/// Operations take `&mut self`, so a second upload cannot start while one is
/// in flight.
pub struct UploadOrchestrator {
    ocr: Arc<dyn OcrService>,
    store: Arc<dyn DocumentStore>,
    history: Vec<UploadRecord>,
    displayed: Option<PrescriptionRecord>,
}

impl UploadOrchestrator {
    pub fn new(ocr: Arc<dyn OcrService>, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            ocr,
            store,
            history: Vec::new(),
            displayed: None,
        }
    }

    pub async fn process_upload(
        &mut self,
        file: &UploadFile,
        session: &SessionContext,
    ) -> Result<UploadOutcome, Error> {
        let payload = self.ocr.extract(file).await.map_err(|e| {
            tracing::error!("OCR submission of {} failed: {}", file.name(), e);
            e
        })?;

        let record = PrescriptionRecord::from_ocr_payload(&payload).map_err(|e| {
            tracing::error!("OCR payload for {} rejected: {}", file.name(), e);
            e
        })?;

        // The session may have ended while the OCR call was pending.
        let user_id = session.current_user().ok_or_else(|| {
            tracing::warn!("Session ended before {} could be stored", file.name());
            Error::Unauthenticated
        })?;

        let stored = self
            .store
            .append(&user_id, NewUpload::new(file.name().to_string(), record.clone()))
            .await
            .map_err(|e| {
                tracing::error!("Storing {} for {} failed: {}", file.name(), user_id, e);
                e
            })?;

        tracing::info!("Upload {} stored for {} as {}", file.name(), user_id, stored.id);

        let refresh_error = match load_history(self.store.as_ref(), &user_id).await {
            Ok(records) => {
                self.history = records;
                None
            }
            Err(e) => {
                tracing::warn!("History refresh for {} failed after write: {}", user_id, e);
                Some(e)
            }
        };

        self.displayed = Some(record.clone());

        Ok(UploadOutcome {
            record,
            refresh_error,
        })
    }

    /// Reloads the cached history from the store and returns it.
    pub async fn refresh_history(
        &mut self,
        session: &SessionContext,
    ) -> Result<&[UploadRecord], Error> {
        let user_id = session.current_user().ok_or(Error::Unauthenticated)?;

        self.history = load_history(self.store.as_ref(), &user_id).await?;

        tracing::info!("History for {} has {} uploads", user_id, self.history.len());

        Ok(&self.history)
    }

    pub fn history(&self) -> &[UploadRecord] {
        &self.history
    }

    pub fn history_view(&self) -> HistoryView<'_> {
        HistoryView::new(&self.history)
    }

    /// Puts history entry `index` on display without going back to the store.
    pub fn select(&mut self, index: usize) -> Option<&PrescriptionRecord> {
        let data = self.history.get(index)?.data.clone();
        self.displayed = Some(data);
        self.displayed.as_ref()
    }

    /// Puts the record with `id` on display. Reloads the history first when
    /// the cache does not know the id, so records written elsewhere resolve.
    pub async fn select_id(
        &mut self,
        id: &str,
        session: &SessionContext,
    ) -> Result<Option<&PrescriptionRecord>, Error> {
        if !self.history.iter().any(|record| record.id == id) {
            self.refresh_history(session).await?;
        }

        let data = match self.history.iter().find(|record| record.id == id) {
            Some(record) => record.data.clone(),
            None => return Ok(None),
        };
        self.displayed = Some(data);
        Ok(self.displayed.as_ref())
    }

    pub fn displayed(&self) -> Option<&PrescriptionRecord> {
        self.displayed.as_ref()
    }
}
