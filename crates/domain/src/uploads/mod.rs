/// OCR payload model
pub mod prescription;

/// Upload records and file input
pub mod record;

/// OCR service client
pub mod ocr;

/// Document store adapters
pub mod store;

/// Upload workflow
pub mod orchestrator;

/// History list projection
pub mod history;

/// Prescription rendering
pub mod detail;

/// Dose slots and reminder times
pub mod schedule;

pub use detail::DetailView;
pub use history::{HistoryEntry, HistoryView};
pub use ocr::{HttpOcrService, OcrService};
pub use orchestrator::{load_history, UploadOrchestrator, UploadOutcome};
pub use prescription::{DiseaseInfo, Medication, PrescriptionRecord, Reminders, Scalar};
pub use record::{sort_newest_first, NewUpload, UploadFile, UploadRecord};
pub use schedule::{dose_slots, DoseSlot, ReminderPlan};
pub use store::{DocumentStore, DynamoDocumentStore, MemoryDocumentStore};
