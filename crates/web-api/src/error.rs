use application::ApplicationError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::DomainError;
use serde::Serialize;

const INTERNAL_ERROR_MESSAGE: &str = "Erro interno do servidor.";

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub error: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                code,
                error: message.into(),
            },
        }
    }

    /// 必填字段缺失
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "INVALID_ARGUMENT", message)
    }

    pub fn internal_server_error() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_ERROR",
            INTERNAL_ERROR_MESSAGE,
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<DomainError> for ApiError {
    fn from(error: DomainError) -> Self {
        let message = error.to_string();
        match error {
            DomainError::Validation { .. } => ApiError::bad_request(message),
            // 重复登录名按 400 返回
            DomainError::LoginTaken { .. } => {
                ApiError::new(StatusCode::BAD_REQUEST, "LOGIN_TAKEN", message)
            }
            DomainError::UserNotFound => {
                ApiError::new(StatusCode::NOT_FOUND, "USER_NOT_FOUND", message)
            }
            DomainError::RoomNotFound => {
                ApiError::new(StatusCode::NOT_FOUND, "ROOM_NOT_FOUND", message)
            }
            DomainError::SessionNotFound => {
                ApiError::new(StatusCode::NOT_FOUND, "SESSION_NOT_FOUND", message)
            }
        }
    }
}

impl From<ApplicationError> for ApiError {
    fn from(error: ApplicationError) -> Self {
        match error {
            ApplicationError::Domain(err) => err.into(),
            ApplicationError::Repository(err) => {
                tracing::error!(error = %err, "request failed on storage");
                ApiError::internal_server_error()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
