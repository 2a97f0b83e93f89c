use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use super::dto::{ErrorBody, ErrorDetail};
use crate::error::{ErrorCode, LangomineError};

pub fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
        ErrorCode::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        ErrorCode::TranscriptionFailed | ErrorCode::ScoringFailed => StatusCode::BAD_GATEWAY,
        ErrorCode::StorageFailed | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for LangomineError {
    fn into_response(self) -> Response {
        let code = self.code();
        let status = status_for(code);
        if status.is_server_error() {
            tracing::error!("Request failed ({}): {}", code, self);
        } else {
            tracing::debug!("Request rejected ({}): {}", code, self);
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code,
                message: self.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcription::TranscriptionError;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(ErrorCode::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            status_for(ErrorCode::ValidationError),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(ErrorCode::PayloadTooLarge),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            status_for(ErrorCode::TranscriptionFailed),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(status_for(ErrorCode::ScoringFailed), StatusCode::BAD_GATEWAY);
        assert_eq!(
            status_for(ErrorCode::Internal),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_into_response_status() {
        let response = LangomineError::voice_not_found("abc").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response =
            LangomineError::Transcription(TranscriptionError::NoSegments).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
