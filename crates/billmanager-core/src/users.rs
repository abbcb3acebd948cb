use std::sync::Arc;

use billmanager_repository::{NewUser, RepositoryError, Role, UserRecord, UserRepository};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{BillError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterUserRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: Role,
}

#[derive(Clone)]
pub struct UserService {
    repository: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(repository: Arc<dyn UserRepository>) -> Self {
        Self { repository }
    }

    pub async fn register(&self, request: &RegisterUserRequest) -> Result<UserRecord> {
        let email = request.email.trim();
        if email.is_empty() {
            return Err(BillError::Validation("The field 'email' is required".into()));
        }
        if self.exists(email).await? {
            return Err(BillError::UserAlreadyExists(email.to_string()));
        }

        let user = self
            .repository
            .insert_user(&NewUser {
                email: email.to_string(),
                role: request.role,
            })
            .await
            .map_err(|err| match err {
                RepositoryError::DuplicateEmail(email) => BillError::UserAlreadyExists(email),
                other => BillError::Repository(other),
            })?;

        info!(user_id = user.id, role = user.role.as_str(), "user registered");
        Ok(user)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<UserRecord> {
        self.repository
            .find_user_by_email(email)
            .await?
            .ok_or_else(|| BillError::user_email_not_found(email))
    }

    pub async fn find_by_id(&self, id: i64) -> Result<UserRecord> {
        self.repository
            .find_user_by_id(id)
            .await?
            .ok_or_else(|| BillError::user_id_not_found(id))
    }

    pub async fn exists(&self, email: &str) -> Result<bool> {
        Ok(self.repository.find_user_by_email(email).await?.is_some())
    }
}
