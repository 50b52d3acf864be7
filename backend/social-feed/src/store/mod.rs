//! Document store seam.
//!
//! Everything in this crate talks to the hosted document database through
//! [`DocumentStore`]. The trait mirrors the capabilities the feed needs:
//! get-by-id, filtered/ordered/limited queries, live snapshots of a query,
//! array union/remove updates and size-capped atomic batch writes.

mod memory;

pub use memory::{MemoryStore, StoreLimits};

use futures::stream::BoxStream;
use thiserror::Error;

use crate::domain::{NewPost, Post, Repost, User};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("batch of {size} writes exceeds the store limit of {max}")]
    BatchTooLarge { size: usize, max: usize },

    #[error("invalid query: {0}")]
    InvalidQuery(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Live result sets of a post query. The first item is the current result
/// set; one further item follows every change to the collection.
pub type PostSnapshots = BoxStream<'static, StoreResult<Vec<Post>>>;

/// Query over the `posts` collection. Results are always ordered newest
/// first, ties broken by ascending identifier.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostQuery {
    /// Membership filter on the author identifier.
    pub author_in: Option<Vec<String>>,
    pub limit: Option<usize>,
}

impl PostQuery {
    pub fn recent(limit: usize) -> Self {
        Self {
            author_in: None,
            limit: Some(limit),
        }
    }

    pub fn by_authors(author_ids: Vec<String>) -> Self {
        Self {
            author_in: Some(author_ids),
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// List-valued fields of a user document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserListField {
    Followers,
    Following,
    Posts,
    Feed,
}

impl UserListField {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserListField::Followers => "followers",
            UserListField::Following => "following",
            UserListField::Posts => "posts",
            UserListField::Feed => "feed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayOp {
    /// Append the value unless already present.
    Union,
    /// Remove every occurrence of the value.
    Remove,
}

/// Single-field array update on a user document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserUpdate {
    pub field: UserListField,
    pub op: ArrayOp,
    pub value: String,
}

impl UserUpdate {
    pub fn union(field: UserListField, value: impl Into<String>) -> Self {
        Self {
            field,
            op: ArrayOp::Union,
            value: value.into(),
        }
    }

    pub fn remove(field: UserListField, value: impl Into<String>) -> Self {
        Self {
            field,
            op: ArrayOp::Remove,
            value: value.into(),
        }
    }

    /// Applies the update to an in-memory copy of the document.
    pub fn apply(&self, user: &mut User) {
        let list = match self.field {
            UserListField::Followers => &mut user.followers,
            UserListField::Following => &mut user.following,
            UserListField::Posts => &mut user.posts,
            UserListField::Feed => &mut user.feed,
        };
        match self.op {
            ArrayOp::Union => {
                if !list.contains(&self.value) {
                    list.push(self.value.clone());
                }
            }
            ArrayOp::Remove => list.retain(|v| v != &self.value),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    PutRepost(Repost),
    DeleteRepost(String),
}

/// Multi-document write applied atomically by [`DocumentStore::commit`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            ops: Vec::with_capacity(capacity),
        }
    }

    pub fn put_repost(&mut self, repost: Repost) {
        self.ops.push(WriteOp::PutRepost(repost));
    }

    pub fn delete_repost(&mut self, id: impl Into<String>) {
        self.ops.push(WriteOp::DeleteRepost(id.into()));
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}

/// Client of the hosted document database.
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Largest number of operations a single [`WriteBatch`] may carry.
    fn max_batch_size(&self) -> usize;

    /// Largest number of values accepted by a membership filter.
    fn max_membership_filter(&self) -> usize;

    /// Allocate a fresh document identifier.
    fn new_id(&self) -> String;

    async fn get_post(&self, id: &str) -> StoreResult<Option<Post>>;

    /// Insert a post under a store-assigned identifier.
    async fn insert_post(&self, post: NewPost) -> StoreResult<Post>;

    async fn query_posts(&self, query: &PostQuery) -> StoreResult<Vec<Post>>;

    /// Open a live subscription on a post query.
    async fn subscribe_posts(&self, query: PostQuery) -> StoreResult<PostSnapshots>;

    async fn get_user(&self, id: &str) -> StoreResult<Option<User>>;

    async fn list_users(&self) -> StoreResult<Vec<User>>;

    /// Create or overwrite a user document.
    async fn put_user(&self, user: User) -> StoreResult<()>;

    /// Apply an array update to an existing user document.
    /// Fails with [`StoreError::NotFound`] when the user does not exist.
    async fn update_user(&self, id: &str, update: UserUpdate) -> StoreResult<()>;

    /// All reposts referencing `original_post_id`.
    async fn query_reposts(&self, original_post_id: &str) -> StoreResult<Vec<Repost>>;

    /// Apply every operation in `batch` or none of them.
    async fn commit(&self, batch: WriteBatch) -> StoreResult<()>;
}
