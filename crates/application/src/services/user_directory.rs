use std::sync::Arc;

use domain::{DomainError, Login, NewUser, RepositoryError, User, UserId, UserRepository};

use crate::{clock::Clock, error::ApplicationError};

#[derive(Debug, Clone)]
pub struct RegisterUserRequest {
    pub login: String,
}

#[derive(Debug, Clone)]
pub struct AuthenticateUserRequest {
    pub login: String,
}

pub struct UserDirectory {
    users: Arc<dyn UserRepository>,
    clock: Arc<dyn Clock>,
}

impl UserDirectory {
    pub fn new(users: Arc<dyn UserRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { users, clock }
    }

    pub async fn register(&self, request: RegisterUserRequest) -> Result<User, ApplicationError> {
        let login = Login::parse(request.login)?;
        let taken = login.as_str().to_owned();

        let user = self
            .users
            .create(NewUser {
                login,
                created_at: self.clock.now(),
            })
            .await
            .map_err(|err| match err {
                RepositoryError::Conflict => {
                    ApplicationError::Domain(DomainError::LoginTaken { login: taken })
                }
                other => other.into(),
            })?;

        tracing::info!(user_id = %user.id, login = %user.login, "user registered");
        Ok(user)
    }

    /// 仅凭登录名认证，不校验凭据。
    pub async fn authenticate(
        &self,
        request: AuthenticateUserRequest,
    ) -> Result<User, ApplicationError> {
        let login = Login::parse(request.login)?;
        self.users
            .find_by_login(login.as_str())
            .await?
            .ok_or(DomainError::UserNotFound.into())
    }

    pub async fn get_by_id(&self, id: UserId) -> Result<User, ApplicationError> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or(DomainError::UserNotFound.into())
    }
}
