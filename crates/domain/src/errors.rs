use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid file: {reason}")]
    InvalidFile { reason: String },

    #[error("Upload failed: {reason}")]
    UploadFailed { reason: String },

    #[error("Malformed OCR payload: {reason}")]
    ParseFailed { reason: String },

    #[error("No authenticated session")]
    Unauthenticated,

    #[error("Document store write failed: {reason}")]
    StoreWriteFailed { reason: String },

    #[error("Document store read failed: {reason}")]
    StoreReadFailed { reason: String },
}

impl Error {
    /// Stable machine-readable code, one per variant.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidFile { .. } => "invalid_file",
            Error::UploadFailed { .. } => "upload_failed",
            Error::ParseFailed { .. } => "parse_failed",
            Error::Unauthenticated => "unauthenticated",
            Error::StoreWriteFailed { .. } => "store_write_failed",
            Error::StoreReadFailed { .. } => "store_read_failed",
        }
    }

    /// Message shown to the end user.
    pub fn user_message(&self) -> &'static str {
        match self {
            Error::InvalidFile { .. } => "Please upload an image first.",
            Error::UploadFailed { .. } => "Failed to upload and process the file.",
            Error::ParseFailed { .. } => "The prescription could not be read. Try a clearer image.",
            Error::Unauthenticated => "User not authenticated.",
            Error::StoreWriteFailed { .. } => "The prescription was processed but could not be saved.",
            Error::StoreReadFailed { .. } => "Upload history could not be loaded.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_variant_has_a_distinct_user_message() {
        let all = [
            Error::InvalidFile { reason: String::new() },
            Error::UploadFailed { reason: String::new() },
            Error::ParseFailed { reason: String::new() },
            Error::Unauthenticated,
            Error::StoreWriteFailed { reason: String::new() },
            Error::StoreReadFailed { reason: String::new() },
        ];

        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(a.user_message(), b.user_message());
                assert_ne!(a.code(), b.code());
            }
        }
    }
}
