//! 请求提取器：解析失败统一转换为 `{code, error}` 格式的错误响应。

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
};
use domain::{DomainError, RoomId, UserId};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

const INVALID_BODY_MESSAGE: &str = "Corpo da requisição inválido.";

/// 宽松的 JSON 请求体。
///
/// 不要求 `Content-Type`；空请求体视为所有字段缺失，由处理函数给出具体的必填提示。
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned + Default,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state).await.map_err(|rejection| {
            tracing::debug!(error = %rejection, "failed to read request body");
            ApiError::bad_request(INVALID_BODY_MESSAGE)
        })?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self(T::default()));
        }

        serde_json::from_slice(&bytes).map(Self).map_err(|err| {
            tracing::debug!(error = %err, "rejected malformed request body");
            ApiError::bad_request(INVALID_BODY_MESSAGE)
        })
    }
}

/// 路径中的房间 ID；无法解析的 ID 不可能指向已存在的房间。
pub fn room_id(raw: &str) -> Result<RoomId, ApiError> {
    raw.parse().map_err(|_| ApiError::from(DomainError::RoomNotFound))
}

pub fn user_id(raw: &str) -> Result<UserId, ApiError> {
    raw.parse().map_err(|_| ApiError::from(DomainError::UserNotFound))
}
