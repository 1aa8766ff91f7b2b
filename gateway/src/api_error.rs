use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::store::StoreError;

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn bad_gateway(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, detail)
    }

    pub fn gateway_timeout(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::GATEWAY_TIMEOUT, detail)
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, detail)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        let detail = err.to_string();
        match err {
            StoreError::Timeout => Self::gateway_timeout(detail),
            StoreError::Abandoned => Self::internal(detail),
            StoreError::Transport(_) | StoreError::Status { .. } | StoreError::Decode(_) => {
                Self::bad_gateway(detail)
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, detail = %self.detail, "request failed");
        }
        let body = Json(ErrorBody { detail: self.detail });
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_gateway_statuses() {
        let cases = [
            (StoreError::Transport("refused".to_string()), StatusCode::BAD_GATEWAY),
            (
                StoreError::Status {
                    status: 400,
                    body: "parsing_exception".to_string(),
                },
                StatusCode::BAD_GATEWAY,
            ),
            (StoreError::Decode("eof".to_string()), StatusCode::BAD_GATEWAY),
            (StoreError::Timeout, StatusCode::GATEWAY_TIMEOUT),
            (StoreError::Abandoned, StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), expected);
        }
    }
}
