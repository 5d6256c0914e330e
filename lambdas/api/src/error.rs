use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug)]
pub enum ApiError {
    Domain(domain::Error),
    UploadInProgress,
    NotFound,
    BadRequest(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

impl From<&domain::Error> for ErrorBody {
    fn from(err: &domain::Error) -> Self {
        Self {
            error: err.code().to_string(),
            message: err.user_message().to_string(),
        }
    }
}

impl From<domain::Error> for ApiError {
    fn from(err: domain::Error) -> Self {
        ApiError::Domain(err)
    }
}

fn status_of(err: &domain::Error) -> StatusCode {
    use domain::Error::*;

    match err {
        InvalidFile { .. } => StatusCode::BAD_REQUEST,
        Unauthenticated => StatusCode::UNAUTHORIZED,
        UploadFailed { .. } | ParseFailed { .. } => StatusCode::BAD_GATEWAY,
        StoreWriteFailed { .. } | StoreReadFailed { .. } => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Domain(err) => (status_of(&err), ErrorBody::from(&err)),
            ApiError::UploadInProgress => (
                StatusCode::CONFLICT,
                ErrorBody {
                    error: "upload_in_progress".to_string(),
                    message: "An upload is already being processed.".to_string(),
                },
            ),
            ApiError::NotFound => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    error: "not_found".to_string(),
                    message: "Not found".to_string(),
                },
            ),
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: "bad_request".to_string(),
                    message,
                },
            ),
        };

        (status, Json(body)).into_response()
    }
}
