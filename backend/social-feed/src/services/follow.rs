use std::sync::Arc;

use tracing::{debug, error};

use crate::error::{ServiceError, ServiceResult};
use crate::store::{ArrayOp, DocumentStore, StoreError, UserListField, UserUpdate};

/// Maintains the follower/following lists on both user documents.
///
/// The two document updates run concurrently and are not transactional: if
/// only one of them succeeds the error is surfaced as
/// [`ServiceError::PartialGraphFailure`] and the applied half stays in place.
pub struct FollowService<S: DocumentStore + ?Sized> {
    store: Arc<S>,
}

impl<S: DocumentStore + ?Sized> Clone for FollowService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: DocumentStore + ?Sized> FollowService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// `follower_id` starts following `followee_id`. Self-follows and empty
    /// ids are ignored.
    pub async fn follow(&self, follower_id: &str, followee_id: &str) -> ServiceResult<()> {
        self.apply(follower_id, followee_id, ArrayOp::Union).await
    }

    /// `follower_id` stops following `followee_id`. Self-unfollows and empty
    /// ids are ignored.
    pub async fn unfollow(&self, follower_id: &str, followee_id: &str) -> ServiceResult<()> {
        self.apply(follower_id, followee_id, ArrayOp::Remove).await
    }

    /// Whether `follower_id`'s following list contains `followee_id`.
    pub async fn is_following(&self, follower_id: &str, followee_id: &str) -> ServiceResult<bool> {
        let follower = self
            .store
            .get_user(follower_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User not found: {}", follower_id)))?;
        Ok(follower.following.iter().any(|id| id == followee_id))
    }

    async fn apply(&self, follower_id: &str, followee_id: &str, op: ArrayOp) -> ServiceResult<()> {
        if follower_id.is_empty() || followee_id.is_empty() || follower_id == followee_id {
            debug!(
                follower_id = %follower_id,
                followee_id = %followee_id,
                "Ignoring follow graph update"
            );
            return Ok(());
        }

        let following = UserUpdate {
            field: UserListField::Following,
            op,
            value: followee_id.to_string(),
        };
        let followers = UserUpdate {
            field: UserListField::Followers,
            op,
            value: follower_id.to_string(),
        };

        let (following_result, followers_result) = tokio::join!(
            self.store.update_user(follower_id, following),
            self.store.update_user(followee_id, followers),
        );

        match (following_result, followers_result) {
            (Ok(()), Ok(())) => {
                debug!(
                    follower_id = %follower_id,
                    followee_id = %followee_id,
                    op = ?op,
                    "Follow graph updated"
                );
                Ok(())
            }
            (Err(e), Err(_)) => {
                error!(
                    follower_id = %follower_id,
                    followee_id = %followee_id,
                    op = ?op,
                    error = %e,
                    "Follow graph update failed"
                );
                Err(e.into())
            }
            (Err(e), Ok(())) => Err(partial_failure(
                follower_id,
                followee_id,
                op,
                UserListField::Following,
                e,
            )),
            (Ok(()), Err(e)) => Err(partial_failure(
                followee_id,
                follower_id,
                op,
                UserListField::Followers,
                e,
            )),
        }
    }
}

fn partial_failure(
    user_id: &str,
    value: &str,
    op: ArrayOp,
    field: UserListField,
    cause: StoreError,
) -> ServiceError {
    error!(
        user_id = %user_id,
        field = field.as_str(),
        value = %value,
        op = ?op,
        error = %cause,
        "Follow graph left asymmetric"
    );
    ServiceError::PartialGraphFailure(format!(
        "{:?} of {} on {}.{} failed: {}",
        op,
        value,
        user_id,
        field.as_str(),
        cause
    ))
}
