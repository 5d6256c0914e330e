use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, Client};
use serde::Deserialize;

use crate::errors::Error;

use super::UploadFile;

/// Remote service turning a prescription image into a string-encoded JSON document
#[async_trait]
pub trait OcrService: Send + Sync {
    /// Returns the raw `data` field of a successful response.
    async fn extract(&self, file: &UploadFile) -> Result<String, Error>;
}

#[derive(Deserialize)]
struct OcrResponse {
    data: String,
}

pub struct HttpOcrService {
    client: Client,
    base_url: String,
}

impl HttpOcrService {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, Error> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()
            .map_err(|e| Error::UploadFailed {
                reason: format!("HTTP client setup: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl OcrService for HttpOcrService {
    async fn extract(&self, file: &UploadFile) -> Result<String, Error> {
        let part = multipart::Part::bytes(file.bytes().to_vec())
            .file_name(file.name().to_string())
            .mime_str(file.content_type())
            .map_err(|e| Error::UploadFailed {
                reason: e.to_string(),
            })?;
        let form = multipart::Form::new().part("file", part);

        tracing::info!("Uploading {} to OCR service", file.name());

        let response = self
            .client
            .post(format!("{}/upload", self.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::UploadFailed {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("OCR service returned {}: {}", status, body);
            return Err(Error::UploadFailed {
                reason: format!("OCR service returned {}", status),
            });
        }

        // A body cut off mid-transfer is a failed upload, not bad data.
        let bytes = response.bytes().await.map_err(|e| Error::UploadFailed {
            reason: format!("OCR response body: {}", e),
        })?;

        let body: OcrResponse = serde_json::from_slice(&bytes).map_err(|e| Error::ParseFailed {
            reason: format!("OCR response: {}", e),
        })?;

        Ok(body.data)
    }
}

#[cfg(test)]
mod tests {
    use axum::{extract::Multipart, http::StatusCode, routing::post, Json, Router};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn file() -> UploadFile {
        UploadFile::new("rx1.jpg", vec![0xff, 0xd8, 0xff])
            .unwrap()
            .with_content_type("image/jpeg")
    }

    #[tokio::test]
    async fn posts_multipart_file_and_returns_data_field() {
        async fn upload(mut multipart: Multipart) -> Json<serde_json::Value> {
            let mut seen = String::new();
            while let Ok(Some(field)) = multipart.next_field().await {
                if field.name() == Some("file") {
                    let name = field.file_name().unwrap_or("").to_string();
                    let len = field.bytes().await.unwrap().len();
                    seen = format!("{}:{}", name, len);
                }
            }
            Json(serde_json::json!({
                "message": "File uploaded and processed successfully",
                "data": format!(r#"{{"diagnosis": "{}"}}"#, seen),
            }))
        }

        let base = serve(Router::new().route("/upload", post(upload))).await;
        let service = HttpOcrService::new(format!("{}/", base), Duration::from_secs(5)).unwrap();

        let data = service.extract(&file()).await.unwrap();
        assert_eq!(data, r#"{"diagnosis": "rx1.jpg:3"}"#);
    }

    #[tokio::test]
    async fn server_error_is_upload_failure() {
        async fn upload() -> (StatusCode, Json<serde_json::Value>) {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "tesseract crashed" })),
            )
        }

        let base = serve(Router::new().route("/upload", post(upload))).await;
        let service = HttpOcrService::new(base, Duration::from_secs(5)).unwrap();

        let err = service.extract(&file()).await.unwrap_err();
        assert!(matches!(err, Error::UploadFailed { .. }));
    }

    #[tokio::test]
    async fn response_without_data_field_is_parse_failure() {
        async fn upload() -> Json<serde_json::Value> {
            Json(serde_json::json!({ "message": "ok" }))
        }

        let base = serve(Router::new().route("/upload", post(upload))).await;
        let service = HttpOcrService::new(base, Duration::from_secs(5)).unwrap();

        let err = service.extract(&file()).await.unwrap_err();
        assert!(matches!(err, Error::ParseFailed { .. }));
    }

    #[tokio::test]
    async fn unreachable_service_is_upload_failure() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let service =
            HttpOcrService::new(format!("http://{}", addr), Duration::from_secs(5)).unwrap();

        let err = service.extract(&file()).await.unwrap_err();
        assert!(matches!(err, Error::UploadFailed { .. }));
    }

    #[tokio::test]
    async fn non_json_success_body_is_parse_failure() {
        async fn upload() -> &'static str {
            "<html>Processed</html>"
        }

        let base = serve(Router::new().route("/upload", post(upload))).await;
        let service = HttpOcrService::new(base, Duration::from_secs(5)).unwrap();

        let err = service.extract(&file()).await.unwrap_err();
        assert!(matches!(err, Error::ParseFailed { .. }));
    }

    #[tokio::test]
    async fn truncated_body_is_upload_failure() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 64 * 1024];
            let _ = socket.read(&mut buf).await;
            socket
                .write_all(
                    b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 100\r\n\r\n{\"data\": \"{",
                )
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let service =
            HttpOcrService::new(format!("http://{}", addr), Duration::from_millis(300)).unwrap();

        let err = service.extract(&file()).await.unwrap_err();
        assert!(matches!(err, Error::UploadFailed { .. }));
    }
}
