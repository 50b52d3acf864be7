use std::collections::{BTreeMap, HashSet};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use futures::StreamExt;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tokio::sync::watch;
use tracing::debug;
use uuid::Uuid;

use super::{
    DocumentStore, PostQuery, PostSnapshots, StoreError, StoreResult, UserUpdate, WriteBatch,
    WriteOp,
};
use crate::domain::{NewPost, Post, Repost, User};

/// Capacity limits enforced by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreLimits {
    pub max_batch_size: usize,
    pub max_membership_filter: usize,
}

impl Default for StoreLimits {
    fn default() -> Self {
        Self {
            max_batch_size: 500,
            max_membership_filter: 10,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Collections {
    #[serde(default)]
    posts: BTreeMap<String, Post>,
    #[serde(default)]
    users: BTreeMap<String, User>,
    #[serde(default)]
    reposts: BTreeMap<String, Repost>,
}

#[derive(Debug, Default)]
struct Faults {
    failing_users: HashSet<String>,
    commits_remaining: Option<usize>,
}

struct Inner {
    data: RwLock<Collections>,
    /// Bumped on every write to `posts`; live subscriptions re-run on change.
    changes: watch::Sender<u64>,
    limits: StoreLimits,
    faults: Mutex<Faults>,
}

impl Inner {
    fn run_post_query(&self, query: &PostQuery) -> Vec<Post> {
        let data = self.data.read();
        let mut posts: Vec<Post> = data
            .posts
            .values()
            .filter(|post| match &query.author_in {
                Some(ids) => ids.iter().any(|id| id == &post.author_id),
                None => true,
            })
            .cloned()
            .collect();
        drop(data);

        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        if let Some(limit) = query.limit {
            posts.truncate(limit);
        }
        posts
    }

    fn notify_posts_changed(&self) {
        self.changes.send_modify(|version| *version = version.wrapping_add(1));
    }
}

/// In-process [`DocumentStore`].
///
/// Cloning is cheap and every clone shares the same documents. The whole
/// document set can be loaded from and persisted to a JSON snapshot file.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_limits(StoreLimits::default())
    }

    pub fn with_limits(limits: StoreLimits) -> Self {
        Self::from_collections(Collections::default(), limits)
    }

    fn from_collections(collections: Collections, limits: StoreLimits) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                data: RwLock::new(collections),
                changes,
                limits,
                faults: Mutex::new(Faults::default()),
            }),
        }
    }

    /// Load a snapshot file, starting empty when the file does not exist yet.
    pub fn open_snapshot(path: impl AsRef<Path>, limits: StoreLimits) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "Snapshot file missing, starting with an empty store");
            return Ok(Self::with_limits(limits));
        }

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
        let collections: Collections = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse snapshot {}", path.display()))?;
        Ok(Self::from_collections(collections, limits))
    }

    /// Write every document to `path` as pretty-printed JSON.
    ///
    /// The JSON goes to a temporary file in the same directory which is then
    /// renamed over `path`, so readers see either the old or the new snapshot.
    pub fn persist(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        let dir = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
                parent
            }
            None => Path::new("."),
        };

        let json = {
            let data = self.inner.data.read();
            serde_json::to_string_pretty(&*data).context("Failed to serialize snapshot")?
        };
        let mut staged = NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to stage snapshot in {}", dir.display()))?;
        staged
            .write_all(json.as_bytes())
            .and_then(|()| staged.as_file().sync_all())
            .with_context(|| format!("Failed to write snapshot {}", path.display()))?;
        staged
            .persist(path)
            .with_context(|| format!("Failed to replace snapshot {}", path.display()))?;
        Ok(())
    }

    /// Make every subsequent update of `user_id` fail as unavailable.
    pub fn fail_user_updates_for(&self, user_id: impl Into<String>) {
        self.inner.faults.lock().failing_users.insert(user_id.into());
    }

    /// Let `n` more commits succeed, then fail every later commit.
    pub fn fail_commits_after(&self, n: usize) {
        self.inner.faults.lock().commits_remaining = Some(n);
    }

    pub fn clear_faults(&self) {
        *self.inner.faults.lock() = Faults::default();
    }

    pub fn repost_count(&self) -> usize {
        self.inner.data.read().reposts.len()
    }

    fn take_commit_permit(&self) -> StoreResult<()> {
        let mut faults = self.inner.faults.lock();
        match faults.commits_remaining.as_mut() {
            Some(0) => Err(StoreError::Unavailable(
                "batch commit rejected: store unavailable".to_string(),
            )),
            Some(remaining) => {
                *remaining -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl DocumentStore for MemoryStore {
    fn max_batch_size(&self) -> usize {
        self.inner.limits.max_batch_size
    }

    fn max_membership_filter(&self) -> usize {
        self.inner.limits.max_membership_filter
    }

    fn new_id(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }

    async fn get_post(&self, id: &str) -> StoreResult<Option<Post>> {
        Ok(self.inner.data.read().posts.get(id).cloned())
    }

    async fn insert_post(&self, post: NewPost) -> StoreResult<Post> {
        let post = Post {
            id: self.new_id(),
            author_id: post.author_id,
            author_username: post.author_username,
            content: post.content,
            created_at: post.created_at,
        };
        self.inner
            .data
            .write()
            .posts
            .insert(post.id.clone(), post.clone());
        self.inner.notify_posts_changed();
        Ok(post)
    }

    async fn query_posts(&self, query: &PostQuery) -> StoreResult<Vec<Post>> {
        if let Some(ids) = &query.author_in {
            if ids.len() > self.inner.limits.max_membership_filter {
                return Err(StoreError::InvalidQuery(format!(
                    "membership filter has {} values, limit is {}",
                    ids.len(),
                    self.inner.limits.max_membership_filter
                )));
            }
        }
        Ok(self.inner.run_post_query(query))
    }

    async fn subscribe_posts(&self, query: PostQuery) -> StoreResult<PostSnapshots> {
        if let Some(ids) = &query.author_in {
            if ids.len() > self.inner.limits.max_membership_filter {
                return Err(StoreError::InvalidQuery(format!(
                    "membership filter has {} values, limit is {}",
                    ids.len(),
                    self.inner.limits.max_membership_filter
                )));
            }
        }

        let changes = self.inner.changes.subscribe();
        let inner = Arc::clone(&self.inner);
        let snapshots = futures::stream::unfold(
            (inner, changes, query, true),
            |(inner, mut changes, query, first)| async move {
                if !first && changes.changed().await.is_err() {
                    return None;
                }
                let posts = inner.run_post_query(&query);
                Some((Ok(posts), (inner, changes, query, false)))
            },
        );
        Ok(snapshots.boxed())
    }

    async fn get_user(&self, id: &str) -> StoreResult<Option<User>> {
        Ok(self.inner.data.read().users.get(id).cloned())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        Ok(self.inner.data.read().users.values().cloned().collect())
    }

    async fn put_user(&self, user: User) -> StoreResult<()> {
        self.inner.data.write().users.insert(user.id.clone(), user);
        Ok(())
    }

    async fn update_user(&self, id: &str, update: UserUpdate) -> StoreResult<()> {
        if self.inner.faults.lock().failing_users.contains(id) {
            return Err(StoreError::Unavailable(format!(
                "update of user {} rejected: store unavailable",
                id
            )));
        }

        let mut data = self.inner.data.write();
        let user = data
            .users
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("User not found: {}", id)))?;
        update.apply(user);
        Ok(())
    }

    async fn query_reposts(&self, original_post_id: &str) -> StoreResult<Vec<Repost>> {
        Ok(self
            .inner
            .data
            .read()
            .reposts
            .values()
            .filter(|repost| repost.original_post_id == original_post_id)
            .cloned()
            .collect())
    }

    async fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        let max = self.inner.limits.max_batch_size;
        if batch.len() > max {
            return Err(StoreError::BatchTooLarge {
                size: batch.len(),
                max,
            });
        }
        self.take_commit_permit()?;

        let mut data = self.inner.data.write();
        for op in batch.into_ops() {
            match op {
                WriteOp::PutRepost(repost) => {
                    data.reposts.insert(repost.id.clone(), repost);
                }
                WriteOp::DeleteRepost(id) => {
                    data.reposts.remove(&id);
                }
            }
        }
        Ok(())
    }
}
