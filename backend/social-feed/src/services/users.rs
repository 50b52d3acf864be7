use std::sync::Arc;

use tracing::info;

use crate::domain::User;
use crate::error::{ServiceError, ServiceResult};
use crate::store::DocumentStore;

/// Profile documents for accounts created by the external auth provider.
pub struct UserService<S: DocumentStore + ?Sized> {
    store: Arc<S>,
}

impl<S: DocumentStore + ?Sized> UserService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Write a fresh profile for `uid`, replacing any existing document.
    pub async fn create_profile(&self, uid: &str, username: &str) -> ServiceResult<User> {
        if uid.trim().is_empty() {
            return Err(ServiceError::InvalidInput("uid must not be empty".to_string()));
        }
        if username.trim().is_empty() {
            return Err(ServiceError::InvalidInput(
                "username must not be empty".to_string(),
            ));
        }

        let user = User::new(uid, username.trim());
        self.store.put_user(user.clone()).await?;
        info!(uid = %uid, username = %user.username, "User profile created");
        Ok(user)
    }

    pub async fn fetch_user_by_id(&self, uid: &str) -> ServiceResult<User> {
        self.store
            .get_user(uid)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User not found: {}", uid)))
    }

    /// Change the username. Names already copied onto posts keep the old value.
    pub async fn rename(&self, uid: &str, username: &str) -> ServiceResult<User> {
        if username.trim().is_empty() {
            return Err(ServiceError::InvalidInput(
                "username must not be empty".to_string(),
            ));
        }

        let mut user = self.fetch_user_by_id(uid).await?;
        user.username = username.trim().to_string();
        self.store.put_user(user.clone()).await?;
        Ok(user)
    }
}
