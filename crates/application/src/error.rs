use domain::{DomainError, ErrorKind, RepositoryError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("repository error: {0}")]
    Repository(RepositoryError),
}

impl ApplicationError {
    /// 业务错误的分类；存储故障返回 `None`。
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            ApplicationError::Domain(err) => Some(err.kind()),
            ApplicationError::Repository(_) => None,
        }
    }
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        ApplicationError::Repository(value)
    }
}
