//! 领域模型错误定义
//!
//! 对外展示的错误文本沿用产品的葡萄牙语措辞。

use thiserror::Error;

/// 错误分类，决定 HTTP 状态码和实时事件的错误归类。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
}

/// 领域模型错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// 必填字段缺失或为空
    #[error("{message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    /// 登录名已被占用
    #[error("Login já está em uso.")]
    LoginTaken { login: String },

    #[error("Usuário não encontrado.")]
    UserNotFound,

    #[error("Sala não encontrada.")]
    RoomNotFound,

    /// 实时连接已不存在（已断开或被回收）
    #[error("Sessão não encontrada.")]
    SessionNotFound,
}

impl DomainError {
    /// 创建验证错误
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::LoginTaken { .. } => ErrorKind::Conflict,
            Self::UserNotFound | Self::RoomNotFound | Self::SessionNotFound => {
                ErrorKind::NotFound
            }
        }
    }
}

/// 仓储层错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("resource not found")]
    NotFound,
    #[error("resource already exists")]
    Conflict,
    #[error("storage error: {message}")]
    Storage { message: String },
}

impl RepositoryError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }
}

/// 领域模型结果类型
pub type DomainResult<T> = Result<T, DomainError>;
