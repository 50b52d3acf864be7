use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::domain::User;
use crate::error::ServiceResult;
use crate::store::DocumentStore;

pub const DEFAULT_SUGGESTION_COUNT: usize = 5;

/// Picks users to suggest following.
pub struct SuggestionService<S: DocumentStore + ?Sized> {
    store: Arc<S>,
    limit: usize,
}

impl<S: DocumentStore + ?Sized> SuggestionService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            limit: DEFAULT_SUGGESTION_COUNT,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Up to `limit` users drawn uniformly without replacement. With a
    /// current user, that user and everyone in `currently_following` are
    /// excluded.
    pub async fn suggest(
        &self,
        current_uid: Option<&str>,
        currently_following: &[String],
    ) -> ServiceResult<Vec<User>> {
        let mut rng = StdRng::from_entropy();
        self.suggest_with_rng(current_uid, currently_following, &mut rng)
            .await
    }

    pub async fn suggest_with_rng<R: Rng + Send>(
        &self,
        current_uid: Option<&str>,
        currently_following: &[String],
        rng: &mut R,
    ) -> ServiceResult<Vec<User>> {
        let users = self.store.list_users().await?;
        let candidates: Vec<User> = match current_uid {
            Some(uid) => users
                .into_iter()
                .filter(|user| user.id != uid && !currently_following.contains(&user.id))
                .collect(),
            None => users,
        };

        Ok(candidates
            .choose_multiple(rng, self.limit)
            .cloned()
            .collect())
    }
}
