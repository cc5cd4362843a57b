//! HTTP error response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use duolight_domain::error::{DuolightError, ValidationError};

/// JSON error body returned by API endpoints.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Maps [`DuolightError`] to an HTTP response with appropriate status code.
pub struct ApiError(DuolightError);

impl From<DuolightError> for ApiError {
    fn from(err: DuolightError) -> Self {
        Self(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            DuolightError::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            DuolightError::NotFound(err) => (StatusCode::NOT_FOUND, err.to_string()),
            DuolightError::Connection(err) => {
                tracing::error!(error = %err, "lamp connection error");
                (StatusCode::BAD_GATEWAY, err.to_string())
            }
            DuolightError::Unavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, self.0.to_string())
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
