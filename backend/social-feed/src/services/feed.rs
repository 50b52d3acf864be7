//! Feed assembly: one-shot fetches and live feed subscriptions.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::domain::{FeedEntry, Post};
use crate::error::{ServiceError, ServiceResult};
use crate::store::{DocumentStore, PostQuery};

pub struct FeedAssembler<S: DocumentStore + ?Sized> {
    store: Arc<S>,
    page_size: usize,
}

impl<S: DocumentStore + ?Sized> FeedAssembler<S> {
    pub fn new(store: Arc<S>, page_size: usize) -> Self {
        Self { store, page_size }
    }

    /// Subscribe to the posts of `author_ids`.
    ///
    /// `callback` receives the complete, newest-first feed once for the
    /// current data and again after every change. Only the first
    /// `max_membership_filter` identifiers are watched; the rest are dropped.
    /// An empty id set invokes `callback` once with an empty feed before
    /// returning an inert subscription.
    pub async fn watch<F>(
        &self,
        author_ids: &[String],
        mut callback: F,
    ) -> ServiceResult<FeedSubscription>
    where
        F: FnMut(Vec<FeedEntry>) + Send + 'static,
    {
        if author_ids.is_empty() {
            callback(Vec::new());
            return Ok(FeedSubscription::inert());
        }

        let watched = self.bounded_ids(author_ids);
        let mut snapshots = self
            .store
            .subscribe_posts(PostQuery::by_authors(watched.clone()))
            .await?;

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.changed() => break,
                    next = snapshots.next() => match next {
                        Some(Ok(posts)) => {
                            if *shutdown_rx.borrow() {
                                break;
                            }
                            callback(materialize(posts));
                        }
                        Some(Err(e)) => {
                            error!(error = %e, authors = watched.len(), "Feed subscription failed");
                            break;
                        }
                        None => {
                            warn!(authors = watched.len(), "Feed snapshot stream ended");
                            break;
                        }
                    },
                }
            }
            debug!("Feed subscription closed");
        });

        Ok(FeedSubscription {
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Newest posts for `viewer_id`'s home feed, at most one page.
    ///
    /// Without a viewer this is the most recent page of all posts. With a
    /// viewer it is the most recent page of posts by the users they follow,
    /// empty when they follow nobody.
    pub async fn fetch_once(&self, viewer_id: Option<&str>) -> ServiceResult<Vec<FeedEntry>> {
        let query = match viewer_id {
            None => PostQuery::recent(self.page_size),
            Some(viewer_id) => {
                let viewer = self.store.get_user(viewer_id).await?.ok_or_else(|| {
                    ServiceError::NotFound(format!("User not found: {}", viewer_id))
                })?;
                if viewer.following.is_empty() {
                    debug!(viewer_id = %viewer_id, "Viewer follows nobody, feed is empty");
                    return Ok(Vec::new());
                }
                PostQuery::by_authors(self.bounded_ids(&viewer.following))
                    .with_limit(self.page_size)
            }
        };

        let posts = self.store.query_posts(&query).await?;
        Ok(materialize(posts))
    }

    fn bounded_ids(&self, ids: &[String]) -> Vec<String> {
        let limit = self.store.max_membership_filter();
        if ids.len() > limit {
            debug!(
                requested = ids.len(),
                limit, "Truncating author ids to the membership filter limit"
            );
        }
        ids.iter().take(limit).cloned().collect()
    }
}

/// Resolve author names and order newest first, ties by id.
fn materialize(posts: Vec<Post>) -> Vec<FeedEntry> {
    let mut entries: Vec<FeedEntry> = posts.into_iter().map(FeedEntry::from).collect();
    entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
    entries
}

/// Handle of a live feed subscription.
///
/// [`unsubscribe`](Self::unsubscribe) may be called any number of times.
/// Dropping the handle unsubscribes as well.
#[derive(Debug)]
pub struct FeedSubscription {
    shutdown: Option<watch::Sender<bool>>,
    handle: Option<JoinHandle<()>>,
}

impl FeedSubscription {
    fn inert() -> Self {
        Self {
            shutdown: None,
            handle: None,
        }
    }

    pub fn unsubscribe(&self) {
        if let Some(shutdown) = &self.shutdown {
            let _ = shutdown.send(true);
        }
        if let Some(handle) = &self.handle {
            handle.abort();
        }
    }

    pub fn is_active(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for FeedSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn post(id: &str, offset: i64) -> Post {
        Post {
            id: id.to_string(),
            author_id: "a".to_string(),
            author_username: Some("alice".to_string()),
            content: id.to_string(),
            created_at: Utc::now() + Duration::seconds(offset),
        }
    }

    #[test]
    fn test_materialize_orders_newest_first() {
        let entries = materialize(vec![post("old", -10), post("new", 10), post("mid", 0)]);
        let ids: Vec<&str> = entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
    }

    #[test]
    fn test_materialize_ties_are_stable() {
        let at = Utc::now();
        let tied = |id: &str| Post {
            created_at: at,
            ..post(id, 0)
        };
        let forward = materialize(vec![tied("b"), tied("a"), tied("c")]);
        let backward = materialize(vec![tied("c"), tied("a"), tied("b")]);
        assert_eq!(forward, backward);
    }
}
