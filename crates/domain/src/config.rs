use std::{env, time::Duration};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Dynamo,
    Memory,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    pub ocr_service_url: String,
    /// Whole-request timeout for the OCR call. Requests are never retried.
    pub ocr_timeout: Duration,
    pub store_backend: StoreBackend,
    pub uploads_table: String,
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let ocr_service_url =
            lookup("OCR_SERVICE_URL").unwrap_or("http://127.0.0.1:5000".to_string());

        let ocr_timeout_secs = lookup("OCR_TIMEOUT_SECS")
            .and_then(|value| value.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(60);

        let store_backend = match lookup("DOCUMENT_STORE").as_deref() {
            Some("memory") => StoreBackend::Memory,
            Some("dynamodb") | None => StoreBackend::Dynamo,
            Some(other) => {
                tracing::warn!("Unknown DOCUMENT_STORE {}, using dynamodb", other);
                StoreBackend::Dynamo
            }
        };

        let uploads_table =
            lookup("DYNAMODB_UPLOADS_TABLE").unwrap_or("care-share-uploads".to_string());

        Self {
            ocr_service_url,
            ocr_timeout: Duration::from_secs(ocr_timeout_secs),
            store_backend,
            uploads_table,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn settings(vars: &[(&str, &str)]) -> Settings {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let settings = settings(&[]);

        assert_eq!(settings.ocr_service_url, "http://127.0.0.1:5000");
        assert_eq!(settings.ocr_timeout, Duration::from_secs(60));
        assert_eq!(settings.store_backend, StoreBackend::Dynamo);
        assert_eq!(settings.uploads_table, "care-share-uploads");
    }

    #[test]
    fn overrides() {
        let settings = settings(&[
            ("OCR_SERVICE_URL", "https://ocr.internal"),
            ("OCR_TIMEOUT_SECS", "15"),
            ("DOCUMENT_STORE", "memory"),
            ("DYNAMODB_UPLOADS_TABLE", "uploads-dev"),
        ]);

        assert_eq!(settings.ocr_service_url, "https://ocr.internal");
        assert_eq!(settings.ocr_timeout, Duration::from_secs(15));
        assert_eq!(settings.store_backend, StoreBackend::Memory);
        assert_eq!(settings.uploads_table, "uploads-dev");
    }

    #[test]
    fn invalid_timeout_falls_back() {
        assert_eq!(
            settings(&[("OCR_TIMEOUT_SECS", "soon")]).ocr_timeout,
            Duration::from_secs(60)
        );
        assert_eq!(
            settings(&[("OCR_TIMEOUT_SECS", "0")]).ocr_timeout,
            Duration::from_secs(60)
        );
    }
}
