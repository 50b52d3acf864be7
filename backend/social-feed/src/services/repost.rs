//! Repost synthesizer
//!
//! Bulk-generates synthetic reposts of an existing post for demos and load
//! testing, and deletes them again. Writes go out in batches no larger than
//! the store's batch limit, one batch after another. A failure part-way
//! through leaves earlier batches committed; neither operation is safe to
//! retry blindly.

use std::sync::Arc;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::domain::{BoundingBox, Repost};
use crate::error::{ServiceError, ServiceResult};
use crate::services::geo::sample_coordinate;
use crate::services::snippet::{tokenize, SnippetGenerator};
use crate::store::{DocumentStore, WriteBatch};

/// Author and comment text for the `ordinal`-th synthetic repost (1-based).
pub trait RepostNaming: Send + Sync {
    fn author(&self, ordinal: usize) -> String;
    fn comment(&self, ordinal: usize) -> String;
}

/// `user{n}` / `Repost comment #{n}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultNaming;

impl RepostNaming for DefaultNaming {
    fn author(&self, ordinal: usize) -> String {
        format!("user{}", ordinal)
    }

    fn comment(&self, ordinal: usize) -> String {
        format!("Repost comment #{}", ordinal)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisReport {
    pub original_post_id: String,
    pub created: usize,
    pub batches: usize,
}

pub struct RepostSynthesizer<S: DocumentStore + ?Sized> {
    store: Arc<S>,
    snippets: SnippetGenerator,
    naming: Box<dyn RepostNaming>,
}

impl<S: DocumentStore + ?Sized> RepostSynthesizer<S> {
    pub fn new(store: Arc<S>, snippets: SnippetGenerator) -> Self {
        Self {
            store,
            snippets,
            naming: Box::new(DefaultNaming),
        }
    }

    pub fn with_naming(mut self, naming: impl RepostNaming + 'static) -> Self {
        self.naming = Box::new(naming);
        self
    }

    /// Generate `count` reposts of `original_post_id` located inside `bbox`.
    pub async fn synthesize(
        &self,
        original_post_id: &str,
        count: usize,
        bbox: &BoundingBox,
    ) -> ServiceResult<SynthesisReport> {
        let mut rng = StdRng::from_entropy();
        self.synthesize_with_rng(original_post_id, count, bbox, &mut rng)
            .await
    }

    pub async fn synthesize_with_rng<R: Rng + Send>(
        &self,
        original_post_id: &str,
        count: usize,
        bbox: &BoundingBox,
        rng: &mut R,
    ) -> ServiceResult<SynthesisReport> {
        if count == 0 {
            return Err(ServiceError::Config(
                "repost count must be positive".to_string(),
            ));
        }
        bbox.validate()?;
        let batch_size = self.batch_size()?;

        let original = self
            .store
            .get_post(original_post_id)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Original post not found: {}", original_post_id))
            })?;
        let words = tokenize(&original.content);

        let mut batches = 0;
        let mut created = 0;
        while created < count {
            let end = (created + batch_size).min(count);
            let mut batch = WriteBatch::with_capacity(end - created);
            for index in created..end {
                let ordinal = index + 1;
                let location = sample_coordinate(bbox, rng);
                batch.put_repost(Repost {
                    id: self.store.new_id(),
                    original_post_id: original_post_id.to_string(),
                    author_username: self.naming.author(ordinal),
                    highlighted_quote: self.snippets.generate_from_words(&words, ordinal, rng),
                    repost_comment: self.naming.comment(ordinal),
                    location,
                    created_at: Utc::now(),
                });
            }

            self.store.commit(batch).await?;
            batches += 1;
            created = end;
            debug!(
                post_id = %original_post_id,
                batch = batches,
                created,
                total = count,
                "Committed repost batch"
            );
        }

        info!(
            post_id = %original_post_id,
            count = created,
            batches,
            "Synthetic reposts created"
        );

        Ok(SynthesisReport {
            original_post_id: original_post_id.to_string(),
            created,
            batches,
        })
    }

    /// Delete every repost referencing `original_post_id`; returns how many
    /// were deleted (zero when there were none).
    pub async fn purge(&self, original_post_id: &str) -> ServiceResult<usize> {
        let batch_size = self.batch_size()?;
        let reposts = self.store.query_reposts(original_post_id).await?;
        if reposts.is_empty() {
            info!(post_id = %original_post_id, "No reposts found to delete");
            return Ok(0);
        }

        let mut deleted = 0;
        for chunk in reposts.chunks(batch_size) {
            let mut batch = WriteBatch::with_capacity(chunk.len());
            for repost in chunk {
                batch.delete_repost(repost.id.clone());
            }
            self.store.commit(batch).await?;
            deleted += chunk.len();
            debug!(
                post_id = %original_post_id,
                deleted,
                total = reposts.len(),
                "Committed repost delete batch"
            );
        }

        info!(post_id = %original_post_id, deleted, "Reposts deleted");
        Ok(deleted)
    }

    fn batch_size(&self) -> ServiceResult<usize> {
        match self.store.max_batch_size() {
            0 => Err(ServiceError::Config(
                "store reports a zero batch size".to_string(),
            )),
            size => Ok(size),
        }
    }
}
