use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::domain::NewPost;
use crate::error::{ServiceError, ServiceResult};
use crate::store::{DocumentStore, UserListField, UserUpdate};

pub struct PostService<S: DocumentStore + ?Sized> {
    store: Arc<S>,
}

impl<S: DocumentStore + ?Sized> PostService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Publish a post and return its id.
    ///
    /// The author's current username is copied onto the post. The id is then
    /// appended to the author's `posts` list and to the `feed` list of each
    /// follower, one follower at a time. A failure stops the fan-out without
    /// undoing earlier writes.
    pub async fn create_post(&self, author_id: &str, content: &str) -> ServiceResult<String> {
        if content.trim().is_empty() {
            return Err(ServiceError::InvalidInput(
                "post content must not be empty".to_string(),
            ));
        }

        let author = self
            .store
            .get_user(author_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User not found: {}", author_id)))?;

        let post = self
            .store
            .insert_post(NewPost {
                author_id: author.id.clone(),
                author_username: Some(author.username.clone()),
                content: content.to_string(),
                created_at: Utc::now(),
            })
            .await?;

        self.store
            .update_user(author_id, UserUpdate::union(UserListField::Posts, &post.id))
            .await?;

        for follower_id in &author.followers {
            self.store
                .update_user(follower_id, UserUpdate::union(UserListField::Feed, &post.id))
                .await?;
            debug!(post_id = %post.id, follower_id = %follower_id, "Post added to follower feed");
        }

        info!(
            post_id = %post.id,
            author_id = %author_id,
            followers = author.followers.len(),
            "Post created"
        );
        Ok(post.id)
    }
}
